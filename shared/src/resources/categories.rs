use serde::{Deserialize, Serialize};
use serde_json::json;

use super::PageId;
use crate::api::lenient;
use crate::event::{RecordId, ValidationError};
use crate::resource::{contains_ci, is_clock_time, require, ModalMode, Operations, Resource, Target};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Category {
    pub id: RecordId,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub open_time: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub last_time: String,
    #[serde(default, deserialize_with = "lenient::int")]
    pub no_open: i64,
    #[serde(default, deserialize_with = "lenient::int")]
    pub active: i64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct CategoryDraft {
    #[serde(deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(deserialize_with = "lenient::text")]
    pub open_time: String,
    #[serde(deserialize_with = "lenient::text")]
    pub last_time: String,
    #[serde(deserialize_with = "lenient::int")]
    pub no_open: i64,
    #[serde(deserialize_with = "lenient::int")]
    pub active: i64,
}

impl Default for CategoryDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            open_time: String::new(),
            last_time: String::new(),
            no_open: 0,
            active: 1,
        }
    }
}

impl CategoryDraft {
    fn body(&self) -> serde_json::Value {
        json!({
            "name": self.name.trim(),
            "open_time": self.open_time.trim(),
            "last_time": self.last_time.trim(),
            "no_open": self.no_open,
            "active": self.active,
        })
    }
}

pub struct Categories;

impl Resource for Categories {
    type Record = Category;
    type Draft = CategoryDraft;

    const PAGE: PageId = PageId::Categories;
    const NOUN: &'static str = "category";
    const PLURAL: &'static str = "categories";
    const OPERATIONS: Operations = Operations {
        create: true,
        edit: true,
        delete: true,
        toggles: &["active"],
        actions: &[],
    };

    fn list() -> Target {
        Target::get("admin/get-all-category-list")
    }

    fn id(record: &Category) -> RecordId {
        record.id
    }

    fn matches(record: &Category, needle: &str) -> bool {
        contains_ci(&record.name, needle)
    }

    fn detail(id: RecordId) -> Option<Target> {
        Some(Target::get(format!("admin/get-category_details/{id}")))
    }

    fn draft_from(record: &Category) -> CategoryDraft {
        CategoryDraft {
            name: record.name.clone(),
            open_time: record.open_time.clone(),
            last_time: record.last_time.clone(),
            no_open: record.no_open,
            active: record.active,
        }
    }

    fn validate(draft: &CategoryDraft, _mode: ModalMode) -> Result<(), ValidationError> {
        require(&draft.name, "Name")?;
        if !is_clock_time(&draft.open_time) {
            return Err(ValidationError::TimeFormat { label: "Open Time" });
        }
        if !is_clock_time(&draft.last_time) {
            return Err(ValidationError::TimeFormat { label: "Last Time" });
        }
        if draft.no_open < 0 {
            return Err(ValidationError::Negative { label: "No Open" });
        }
        Ok(())
    }

    fn create(draft: &CategoryDraft) -> Option<Target> {
        Some(Target::post("admin/add-category").json(draft.body()))
    }

    fn update(id: RecordId, draft: &CategoryDraft) -> Option<Target> {
        Some(Target::put(format!("admin/update-category/{id}")).json(draft.body()))
    }

    fn delete(id: RecordId) -> Option<Target> {
        Some(Target::delete(format!("admin/delete-category/{id}")))
    }

    fn toggle(record: &Category, field: &str) -> Option<Target> {
        (field == "active").then(|| {
            let next = if record.active == 1 { 0 } else { 1 };
            Target::put(format!("admin/update-active/{}", record.id)).json(json!({ "active": next }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Payload;

    fn draft() -> CategoryDraft {
        CategoryDraft {
            name: "Gali".into(),
            open_time: "09:00".into(),
            last_time: "23:30".into(),
            no_open: 2,
            active: 1,
        }
    }

    #[test]
    fn times_must_be_clock_times() {
        assert_eq!(Categories::validate(&draft(), ModalMode::Create), Ok(()));

        let bad = CategoryDraft {
            open_time: "9am".into(),
            ..draft()
        };
        assert_eq!(
            Categories::validate(&bad, ModalMode::Create).unwrap_err().to_string(),
            "Open Time must be in the format HH:MM"
        );

        let bad = CategoryDraft {
            last_time: "24:10".into(),
            ..draft()
        };
        assert_eq!(
            Categories::validate(&bad, ModalMode::Edit),
            Err(ValidationError::TimeFormat { label: "Last Time" })
        );

        let bad = CategoryDraft {
            no_open: -1,
            ..draft()
        };
        assert_eq!(
            Categories::validate(&bad, ModalMode::Edit).unwrap_err().to_string(),
            "No Open must be a positive integer"
        );
    }

    #[test]
    fn form_numbers_may_arrive_as_text() {
        let d: CategoryDraft = serde_json::from_value(json!({
            "name": "Gali", "open_time": "09:00", "last_time": "10:00", "no_open": "3"
        }))
        .unwrap();
        assert_eq!(d.no_open, 3);
        assert_eq!(d.active, 1);
    }

    #[test]
    fn active_flag_flips_both_ways() {
        let mut record: Category = serde_json::from_value(json!({
            "id": 5, "name": "Gali", "open_time": "09:00", "last_time": "10:00",
            "no_open": 0, "active": 1
        }))
        .unwrap();
        let off = Categories::toggle(&record, "active").unwrap();
        assert_eq!(off.path(), "admin/update-active/5");
        assert_eq!(off.payload(), &Payload::Json(json!({"active": 0})));

        record.active = 0;
        let on = Categories::toggle(&record, "active").unwrap();
        assert_eq!(on.payload(), &Payload::Json(json!({"active": 1})));
    }

    #[test]
    fn endpoints_are_path_addressed() {
        assert_eq!(
            Categories::detail(RecordId(4)).unwrap().path(),
            "admin/get-category_details/4"
        );
        assert_eq!(
            Categories::update(RecordId(4), &draft()).unwrap().path(),
            "admin/update-category/4"
        );
        assert_eq!(
            Categories::delete(RecordId(4)).unwrap().path(),
            "admin/delete-category/4"
        );
    }
}
