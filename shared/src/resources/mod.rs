//! The API collections behind each list page.

mod categories;
mod content;
mod credits;
mod jantri;
mod money_requests;
mod open_numbers;
mod plays;
mod reports;
mod results;
mod users;
mod withdrawals;

use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::controller::{ListPage, ResourceListController};
use crate::event::MountId;
use crate::session::Session;

pub use self::categories::{Categories, Category, CategoryDraft};
pub use self::content::{Content, ContentDraft, HomeContent};
pub use self::credits::{CreditDraft, Credits, MoneyCredit};
pub use self::jantri::{HarupJantri, Jantri, NumberTotal, HARUP_SIDES};
pub use self::money_requests::{MoneyRequest, MoneyRequestDraft, MoneyRequests, RequestUser};
pub use self::open_numbers::{OpenNumber, OpenNumbers};
pub use self::plays::{GamePlay, GamePlays, OUTCOMES};
pub use self::reports::{AddMoneyReport, CategoryProfit, DayTotals, ProfitLoss};
pub use self::results::{ResultDraft, ResultSlot, Results};
pub use self::users::{User, UserDraft, Users, GAME_HISTORY, REFERRALS, STATEMENT, STATEMENT_TABS};
pub use self::withdrawals::{Withdrawal, WithdrawalDraft, Withdrawals};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PageId {
    Users,
    Categories,
    Results,
    OpenNumbers,
    HomeContent,
    MoneyRequests,
    MoneyCredits,
    Withdrawals,
    GamePlays,
    ProfitLoss,
    AddMoneyReport,
    Jantri,
    HarupJantri,
}

impl PageId {
    pub const ALL: [PageId; 13] = [
        PageId::Users,
        PageId::Categories,
        PageId::Results,
        PageId::OpenNumbers,
        PageId::HomeContent,
        PageId::MoneyRequests,
        PageId::MoneyCredits,
        PageId::Withdrawals,
        PageId::GamePlays,
        PageId::ProfitLoss,
        PageId::AddMoneyReport,
        PageId::Jantri,
        PageId::HarupJantri,
    ];

    pub const fn title(self) -> &'static str {
        match self {
            PageId::Users => "All Users List",
            PageId::Categories => "All Category List",
            PageId::Results => "Today Number",
            PageId::OpenNumbers => "Open Numbers",
            PageId::HomeContent => "Home Content",
            PageId::MoneyRequests => "Money Requests",
            PageId::MoneyCredits => "Add Money",
            PageId::Withdrawals => "Withdrawal Requests",
            PageId::GamePlays => "Games List",
            PageId::ProfitLoss => "Profit & Loss Report",
            PageId::AddMoneyReport => "Add & Withdrawal Report",
            PageId::Jantri => "Game Numbers",
            PageId::HarupJantri => "Harup Game Numbers",
        }
    }
}

/// Builds the controller for `page`. The caller runs
/// [`ListPage::mount`] to start loading.
pub fn controller_for(
    page: PageId,
    session: Session,
    settings: &Settings,
    mount: MountId,
) -> Box<dyn ListPage> {
    match page {
        PageId::Users => Box::new(ResourceListController::<Users>::new(session, settings, mount)),
        PageId::Categories => Box::new(ResourceListController::<Categories>::new(
            session, settings, mount,
        )),
        PageId::Results => Box::new(ResourceListController::<Results>::new(session, settings, mount)),
        PageId::OpenNumbers => Box::new(ResourceListController::<OpenNumbers>::new(
            session, settings, mount,
        )),
        PageId::HomeContent => Box::new(ResourceListController::<Content>::new(session, settings, mount)),
        PageId::MoneyRequests => Box::new(ResourceListController::<MoneyRequests>::new(
            session, settings, mount,
        )),
        PageId::MoneyCredits => Box::new(ResourceListController::<Credits>::new(session, settings, mount)),
        PageId::Withdrawals => Box::new(ResourceListController::<Withdrawals>::new(
            session, settings, mount,
        )),
        PageId::GamePlays => Box::new(ResourceListController::<GamePlays>::new(session, settings, mount)),
        PageId::ProfitLoss => Box::new(ResourceListController::<ProfitLoss>::new(session, settings, mount)),
        PageId::AddMoneyReport => Box::new(ResourceListController::<AddMoneyReport>::new(
            session, settings, mount,
        )),
        PageId::Jantri => Box::new(ResourceListController::<Jantri>::new(session, settings, mount)),
        PageId::HarupJantri => Box::new(ResourceListController::<HarupJantri>::new(
            session, settings, mount,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConsoleConfig;

    #[test]
    fn every_page_builds_a_controller_for_itself() {
        let settings = ConsoleConfig::default().validate().unwrap();
        let session = Session::new(&settings, "tok").unwrap();
        for (n, page) in PageId::ALL.into_iter().enumerate() {
            let mount = MountId(n as u64 + 1);
            let controller = controller_for(page, session.clone(), &settings, mount);
            assert_eq!(controller.page(), page);
            assert_eq!(controller.mount_id(), mount);
            assert_eq!(controller.view().title, page.title());
        }
    }

    #[test]
    fn dated_reports_mount_without_fetching() {
        let settings = ConsoleConfig::default().validate().unwrap();
        let session = Session::new(&settings, "tok").unwrap();
        for page in [PageId::ProfitLoss, PageId::AddMoneyReport] {
            let mut controller = controller_for(page, session.clone(), &settings, MountId(1));
            assert!(controller.mount().is_empty(), "{page:?} fetched without a date");
            let view = controller.view();
            assert_eq!(view.phase, crate::model::LoadPhase::Idle);
            assert_eq!(view.filters[0].kind, crate::model::FilterKind::Date);
        }
    }
}
