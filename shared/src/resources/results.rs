use serde::{Deserialize, Serialize};
use serde_json::json;

use super::PageId;
use crate::api::lenient;
use crate::event::{RecordId, ValidationError};
use crate::resource::{contains_ci, is_clock_time, require, ModalMode, Operations, Resource, Target};

pub const OPENED: &str = "opened";
pub const NOT_OPENED: &str = "not_opened";

/// A category as seen from the day's result board.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ResultSlot {
    pub id: RecordId,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub open_time: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub last_time: String,
    #[serde(default, deserialize_with = "lenient::int")]
    pub no_open: i64,
    #[serde(default, deserialize_with = "lenient::text")]
    pub status: String,
}

impl ResultSlot {
    pub fn is_opened(&self) -> bool {
        self.status == OPENED
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ResultDraft {
    #[serde(deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(deserialize_with = "lenient::text")]
    pub open_time: String,
    #[serde(deserialize_with = "lenient::int")]
    pub no_open: i64,
}

pub struct Results;

impl Resource for Results {
    type Record = ResultSlot;
    type Draft = ResultDraft;

    const PAGE: PageId = PageId::Results;
    const NOUN: &'static str = "result";
    const PLURAL: &'static str = "results";
    const OPERATIONS: Operations = Operations {
        create: false,
        edit: true,
        delete: false,
        toggles: &["status"],
        actions: &["open"],
    };

    fn list() -> Target {
        Target::get("admin/get-all-category-list")
    }

    fn id(record: &ResultSlot) -> RecordId {
        record.id
    }

    fn matches(record: &ResultSlot, needle: &str) -> bool {
        contains_ci(&record.name, needle)
    }

    fn detail(id: RecordId) -> Option<Target> {
        Some(Target::get(format!("admin/get-category_details/{id}")))
    }

    fn draft_from(record: &ResultSlot) -> ResultDraft {
        ResultDraft {
            name: record.name.clone(),
            open_time: record.open_time.clone(),
            no_open: record.no_open,
        }
    }

    fn validate(draft: &ResultDraft, _mode: ModalMode) -> Result<(), ValidationError> {
        require(&draft.name, "Name")?;
        if !draft.open_time.trim().is_empty() && !is_clock_time(&draft.open_time) {
            return Err(ValidationError::TimeFormat { label: "Open Time" });
        }
        if draft.no_open < 0 {
            return Err(ValidationError::Negative { label: "No Open" });
        }
        Ok(())
    }

    /// Declaring a result always reopens the slot as `not_opened`.
    fn update(id: RecordId, draft: &ResultDraft) -> Option<Target> {
        Some(Target::put("admin/result_today").json(json!({
            "id": id,
            "open_time": draft.open_time.trim(),
            "no_open": draft.no_open,
            "status": NOT_OPENED,
        })))
    }

    fn toggle(record: &ResultSlot, field: &str) -> Option<Target> {
        (field == "status").then(|| {
            let next = if record.is_opened() { NOT_OPENED } else { OPENED };
            Target::put("admin/update-status").json(json!({ "id": record.id, "status": next }))
        })
    }

    fn action(record: &ResultSlot, action: &str) -> Option<Target> {
        (action == "open").then(|| {
            Target::post("admin/open-current-number").json(json!({ "category_id": record.id }))
        })
    }
}
