use serde::{Deserialize, Serialize};
use serde_json::json;

use super::PageId;
use crate::api::lenient;
use crate::event::RecordId;
use crate::resource::{contains_ci, NoDraft, Operations, Resource, Target};

/// A number declared for a category.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct OpenNumber {
    pub id: RecordId,
    #[serde(default)]
    pub category_id: Option<RecordId>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub category_name: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub open_number: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub open_time: String,
}

pub struct OpenNumbers;

impl Resource for OpenNumbers {
    type Record = OpenNumber;
    type Draft = NoDraft;

    const PAGE: PageId = PageId::OpenNumbers;
    const NOUN: &'static str = "number";
    const PLURAL: &'static str = "open numbers";
    const OPERATIONS: Operations = Operations {
        delete: true,
        ..Operations::READ_ONLY
    };

    fn list() -> Target {
        Target::get("admin/all-open-number")
    }

    fn id(record: &OpenNumber) -> RecordId {
        record.id
    }

    fn matches(record: &OpenNumber, needle: &str) -> bool {
        contains_ci(&record.category_name, needle)
    }

    fn draft_from(_record: &OpenNumber) -> NoDraft {
        NoDraft {}
    }

    fn delete(id: RecordId) -> Option<Target> {
        Some(Target::delete("admin/delete-number").json(json!({ "id": id })))
    }
}
