use serde::{Deserialize, Serialize};
use serde_json::json;

use super::PageId;
use crate::api::lenient;
use crate::event::{RecordId, ValidationError};
use crate::resource::{contains_ci, positive_amount, ModalMode, Operations, Paging, Resource, Target};

/// Money the admin added to a user's wallet.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct MoneyCredit {
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
    #[serde(default, deserialize_with = "lenient::text")]
    pub user_name: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub user_mobile: String,
}

/// The add-money form: the selected user's mobile and an amount.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct CreditDraft {
    #[serde(deserialize_with = "lenient::text")]
    pub mobile: String,
    #[serde(deserialize_with = "lenient::text")]
    pub amount: String,
}

pub struct Credits;

impl Resource for Credits {
    type Record = MoneyCredit;
    type Draft = CreditDraft;

    const PAGE: PageId = PageId::MoneyCredits;
    const NOUN: &'static str = "transaction";
    const PLURAL: &'static str = "transactions";
    const OPERATIONS: Operations = Operations {
        create: true,
        delete: true,
        ..Operations::READ_ONLY
    };

    fn list() -> Target {
        Target::get("admin/all-money-added-list")
    }

    fn paging(page_size: u32) -> Paging {
        Paging::Server {
            per_page: Some(page_size),
        }
    }

    fn id(record: &MoneyCredit) -> RecordId {
        record.id
    }

    fn matches(record: &MoneyCredit, needle: &str) -> bool {
        contains_ci(&record.user_name, needle) || contains_ci(&record.user_mobile, needle)
    }

    fn draft_from(record: &MoneyCredit) -> CreditDraft {
        CreditDraft {
            mobile: record.user_mobile.clone(),
            amount: record.amount.clone(),
        }
    }

    fn validate(draft: &CreditDraft, _mode: ModalMode) -> Result<(), ValidationError> {
        if draft.mobile.trim().is_empty() {
            return Err(ValidationError::MissingUser);
        }
        positive_amount(&draft.amount).map(|_| ())
    }

    fn create(draft: &CreditDraft) -> Option<Target> {
        let amount = positive_amount(&draft.amount).ok()?;
        Some(Target::post("admin/add-money-to-users").json(json!({
            "mobile": draft.mobile.trim(),
            "amount": amount,
        })))
    }

    fn delete(id: RecordId) -> Option<Target> {
        Some(Target::delete("admin/delete-add-money").query("id", id))
    }
}
