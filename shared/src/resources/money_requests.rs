use serde::{Deserialize, Serialize};
use serde_json::json;

use super::PageId;
use crate::api::lenient;
use crate::event::{RecordId, ValidationError};
use crate::resource::{contains_ci, positive_amount, ModalMode, Operations, Resource, Target};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RequestUser {
    pub id: RecordId,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub mobile: String,
}

/// A user's request to have money added to their wallet.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MoneyRequest {
    pub id: RecordId,
    #[serde(default)]
    pub user_id: Option<RecordId>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub transaction_type: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub amount: String,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub transaction_date: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub available_balance: String,
    #[serde(default)]
    pub user: Option<RequestUser>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub confirm_payment: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct MoneyRequestDraft {
    #[serde(deserialize_with = "lenient::text")]
    pub amount: String,
}

pub struct MoneyRequests;

impl Resource for MoneyRequests {
    type Record = MoneyRequest;
    type Draft = MoneyRequestDraft;

    const PAGE: PageId = PageId::MoneyRequests;
    const NOUN: &'static str = "amount";
    const PLURAL: &'static str = "money requests";
    const OPERATIONS: Operations = Operations {
        edit: true,
        ..Operations::READ_ONLY
    };

    fn list() -> Target {
        Target::get("admin/all-money-added-request")
    }

    fn search_param() -> Option<&'static str> {
        Some("search")
    }

    fn id(record: &MoneyRequest) -> RecordId {
        record.id
    }

    fn matches(record: &MoneyRequest, needle: &str) -> bool {
        record
            .user
            .as_ref()
            .is_some_and(|u| contains_ci(&u.name, needle) || contains_ci(&u.mobile, needle))
    }

    fn detail(id: RecordId) -> Option<Target> {
        Some(Target::get(format!("admin/all-transaction/{id}")))
    }

    fn draft_from(record: &MoneyRequest) -> MoneyRequestDraft {
        MoneyRequestDraft {
            amount: record.amount.clone(),
        }
    }

    fn validate(draft: &MoneyRequestDraft, _mode: ModalMode) -> Result<(), ValidationError> {
        positive_amount(&draft.amount).map(|_| ())
    }

    /// Only the amount can be changed; the transaction is addressed in the
    /// body.
    fn update(id: RecordId, draft: &MoneyRequestDraft) -> Option<Target> {
        Some(Target::put("admin/transaction-update-id").json(json!({
            "transaction_id": id,
            "amount": draft.amount.trim(),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Payload;

    #[test]
    fn decodes_nested_user() {
        let r: MoneyRequest = serde_json::from_value(json!({
            "id": 11, "user_id": 4, "transaction_type": "credit", "amount": "500.00",
            "description": null, "transaction_date": "2024-09-01",
            "available_balance": "1500.00",
            "user": {"id": 4, "name": "Rahul", "mobile": "9000000001"},
            "confirm_payment": "0"
        }))
        .unwrap();
        assert_eq!(r.user.as_ref().unwrap().name, "Rahul");
        assert!(MoneyRequests::matches(&r, "rahul"));
        assert_eq!(MoneyRequests::search_param(), Some("search"));
    }

    #[test]
    fn amount_update_is_body_addressed() {
        let draft = MoneyRequestDraft {
            amount: "750".into(),
        };
        assert_eq!(MoneyRequests::validate(&draft, ModalMode::Edit), Ok(()));
        let t = MoneyRequests::update(RecordId(11), &draft).unwrap();
        assert_eq!(t.path(), "admin/transaction-update-id");
        assert_eq!(
            t.payload(),
            &Payload::Json(json!({"transaction_id": 11, "amount": "750"}))
        );
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        let draft = MoneyRequestDraft { amount: "0".into() };
        assert_eq!(
            MoneyRequests::validate(&draft, ModalMode::Edit),
            Err(ValidationError::InvalidAmount)
        );
    }
}
