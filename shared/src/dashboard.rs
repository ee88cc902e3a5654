//! Summary cards on the landing page.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::{self, lenient::scalar_text};
use crate::capabilities::http::{HttpError, HttpMethod, HttpRequest, HttpResult};
use crate::controller::Followup;
use crate::event::MountId;
use crate::model::LoadPhase;
use crate::session::Session;

pub const DASHBOARD_PATH: &str = "admin/admin-dashboard";

struct Card {
    title: &'static str,
    value: &'static str,
    count: Option<&'static str>,
    count_prefix: &'static str,
}

const CARDS: &[Card] = &[
    Card {
        title: "Today Request Money",
        value: "today_request_money",
        count: Some("today_transaction_count"),
        count_prefix: "No: ",
    },
    Card {
        title: "Today Add Money",
        value: "today_credit_money",
        count: Some("today_count_credit_transaction"),
        count_prefix: "No: ",
    },
    Card {
        title: "Today Total Loss",
        value: "today_total_loss_amount",
        count: Some("today_total_loss_count"),
        count_prefix: "",
    },
    Card {
        title: "Total Users",
        value: "total_user",
        count: None,
        count_prefix: "",
    },
    Card {
        title: "Today Users",
        value: "total_user_today",
        count: None,
        count_prefix: "",
    },
    Card {
        title: "Today Play Games",
        value: "play_today_game",
        count: Some("play_today_count"),
        count_prefix: "",
    },
    Card {
        title: "Bonus Amount Today",
        value: "total_bonus_amount",
        count: Some("total_bonus_count"),
        count_prefix: "",
    },
    Card {
        title: "Amount Total",
        value: "total_amount_transaction",
        count: Some("total_count_transaction"),
        count_prefix: "",
    },
];

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SummaryCard {
    pub title: String,
    pub value: String,
    pub detail: Option<String>,
}

/// Builds the cards from the `data` object of the dashboard response.
/// Figures are shown as sent; a missing figure reads as `0`.
#[must_use]
pub fn read_cards(data: &Value) -> Vec<SummaryCard> {
    let figure = |key: &str| data.get(key).and_then(scalar_text);
    CARDS
        .iter()
        .map(|card| SummaryCard {
            title: card.title.to_string(),
            value: figure(card.value).unwrap_or_else(|| "0".to_string()),
            detail: card.count.map(|key| {
                format!(
                    "{}{}",
                    card.count_prefix,
                    figure(key).unwrap_or_else(|| "0".to_string())
                )
            }),
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    mount: Option<MountId>,
    cards: Vec<SummaryCard>,
    is_loading: bool,
    error: Option<String>,
    phase: LoadPhase,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DashboardView {
    pub cards: Vec<SummaryCard>,
    pub is_loading: bool,
    pub phase: LoadPhase,
    pub error: Option<String>,
}

impl DashboardState {
    pub fn mount_id(&self) -> Option<MountId> {
        self.mount
    }

    pub fn cards(&self) -> &[SummaryCard] {
        &self.cards
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Starts a fetch for `mount`. Answers for an earlier mount are
    /// ignored by [`DashboardState::on_response`].
    pub fn request(&mut self, session: &Session, mount: MountId) -> Result<HttpRequest, HttpError> {
        let request = session.request(HttpMethod::Get, DASHBOARD_PATH);
        self.mount = Some(mount);
        match &request {
            Ok(_) => {
                self.is_loading = true;
                self.phase = LoadPhase::Loading;
            }
            Err(e) => {
                self.error = Some(api::from_http_error(e, "fetch card data").user_facing_message());
                self.phase = LoadPhase::Failed;
            }
        }
        request
    }

    pub fn on_response(&mut self, mount: MountId, result: HttpResult) -> Vec<Followup> {
        if self.mount != Some(mount) {
            debug!(%mount, "dropping dashboard response for a previous visit");
            return Vec::new();
        }
        self.is_loading = false;

        match api::accept(result, "fetch card data") {
            Ok(body) => {
                let data = body.get("data").unwrap_or(&body);
                self.cards = read_cards(data);
                self.error = None;
                self.phase = LoadPhase::Loaded;
                Vec::new()
            }
            Err(err) if err.is_session_expired() => {
                self.phase = LoadPhase::Failed;
                vec![Followup::SessionExpired]
            }
            Err(err) => {
                warn!(error = %err, "dashboard fetch failed");
                self.error = Some(err.user_facing_message());
                self.phase = LoadPhase::Failed;
                Vec::new()
            }
        }
    }

    /// Forgets the visit so late answers are dropped.
    pub fn leave(&mut self) {
        self.mount = None;
        self.is_loading = false;
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn view(&self) -> DashboardView {
        DashboardView {
            cards: self.cards.clone(),
            is_loading: self.is_loading,
            phase: self.phase,
            error: self.error.clone(),
        }
    }
}
