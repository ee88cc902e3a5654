use serde::{Deserialize, Serialize};

use super::PageId;
use crate::api::lenient;
use crate::event::RecordId;
use crate::resource::{contains_ci, Filter, NoDraft, Operations, Paging, Resource, Target};

pub const OUTCOMES: &[&str] = &["all", "waiting", "won", "lost"];

/// One bet placed by a user.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GamePlay {
    pub id: RecordId,
    #[serde(default)]
    pub user_id: Option<RecordId>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub user_name: String,
    #[serde(default)]
    pub category_id: Option<RecordId>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub category_name: String,
    #[serde(rename = "Playing_Name", default, deserialize_with = "lenient::text")]
    pub playing_name: String,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub play_type: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub entered_number: String,
    #[serde(default, deserialize_with = "lenient::opt_amount")]
    pub entered_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_amount")]
    pub loss_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_amount")]
    pub won_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub status: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub created_at: String,
}

pub struct GamePlays;

impl Resource for GamePlays {
    type Record = GamePlay;
    type Draft = NoDraft;

    const PAGE: PageId = PageId::GamePlays;
    const NOUN: &'static str = "game";
    const PLURAL: &'static str = "games";
    const OPERATIONS: Operations = Operations::READ_ONLY;

    fn list() -> Target {
        Target::get("admin/all-play-games")
    }

    fn paging(_page_size: u32) -> Paging {
        Paging::Server { per_page: None }
    }

    fn filters() -> &'static [Filter] {
        const FILTERS: &[Filter] = &[Filter::choice("plan_game", "Status", OUTCOMES, "all")];
        FILTERS
    }

    fn id(record: &GamePlay) -> RecordId {
        record.id
    }

    fn matches(record: &GamePlay, needle: &str) -> bool {
        contains_ci(&record.user_name, needle) || contains_ci(&record.category_name, needle)
    }

    fn draft_from(_record: &GamePlay) -> NoDraft {
        NoDraft {}
    }
}
