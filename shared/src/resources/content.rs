use serde::{Deserialize, Serialize};
use serde_json::json;

use super::PageId;
use crate::api::lenient;
use crate::event::{RecordId, ValidationError};
use crate::resource::{contains_ci, require, ModalMode, Operations, Resource, Target};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct HomeContent {
    pub id: RecordId,
    #[serde(default, deserialize_with = "lenient::text")]
    pub content_name: String,
    #[serde(default, deserialize_with = "lenient::int")]
    pub serial_number: i64,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub status: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ContentDraft {
    #[serde(deserialize_with = "lenient::text")]
    pub content_name: String,
    #[serde(deserialize_with = "lenient::int")]
    pub serial_number: i64,
    #[serde(deserialize_with = "lenient::flag")]
    pub status: bool,
}

impl ContentDraft {
    fn body(&self) -> serde_json::Value {
        json!({
            "content_name": self.content_name.trim(),
            "serial_number": self.serial_number,
            "status": self.status,
        })
    }
}

pub struct Content;

impl Resource for Content {
    type Record = HomeContent;
    type Draft = ContentDraft;

    const PAGE: PageId = PageId::HomeContent;
    const NOUN: &'static str = "content";
    const PLURAL: &'static str = "contents";
    const OPERATIONS: Operations = Operations {
        create: true,
        edit: true,
        delete: true,
        toggles: &["status"],
        actions: &[],
    };

    fn list() -> Target {
        Target::get("admin/home-content-list")
    }

    fn id(record: &HomeContent) -> RecordId {
        record.id
    }

    fn matches(record: &HomeContent, needle: &str) -> bool {
        contains_ci(&record.content_name, needle)
    }

    fn detail(id: RecordId) -> Option<Target> {
        Some(Target::get(format!("admin/home-content-details/{id}")))
    }

    fn draft_from(record: &HomeContent) -> ContentDraft {
        ContentDraft {
            content_name: record.content_name.clone(),
            serial_number: record.serial_number,
            status: record.status,
        }
    }

    fn validate(draft: &ContentDraft, _mode: ModalMode) -> Result<(), ValidationError> {
        require(&draft.content_name, "Content name")?;
        if draft.serial_number < 0 {
            return Err(ValidationError::Negative {
                label: "Serial number",
            });
        }
        Ok(())
    }

    fn create(draft: &ContentDraft) -> Option<Target> {
        Some(Target::post("admin/home-content-add").json(draft.body()))
    }

    fn update(id: RecordId, draft: &ContentDraft) -> Option<Target> {
        Some(Target::put(format!("admin/home-content-update/{id}")).json(draft.body()))
    }

    fn delete(id: RecordId) -> Option<Target> {
        Some(Target::delete(format!("admin/home-content-delete/{id}")))
    }

    /// Visibility goes through the regular update endpoint with only the
    /// flag in the body.
    fn toggle(record: &HomeContent, field: &str) -> Option<Target> {
        (field == "status").then(|| {
            Target::put(format!("admin/home-content-update/{}", record.id))
                .json(json!({ "status": !record.status }))
        })
    }
}
