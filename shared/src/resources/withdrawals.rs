use serde::{Deserialize, Serialize};
use serde_json::json;

use super::PageId;
use crate::api::lenient;
use crate::event::{RecordId, ValidationError};
use crate::resource::{contains_ci, ModalMode, Operations, Paging, Resource, Target};

pub const PAYMENT_STATUSES: &[&str] = &["approved", "rejected"];

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Withdrawal {
    pub id: RecordId,
    #[serde(default)]
    pub user_id: Option<RecordId>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub user_name: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub user_mobile: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub request_money: String,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub mobile_no: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub upi_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub acount_holder_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub account_number: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub ifsc_code: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub bank_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub branch_name: Option<String>,
    /// Path under the API's public storage.
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub qr_code_image: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub withdrawal_money_status: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct WithdrawalDraft {
    #[serde(deserialize_with = "lenient::text")]
    pub payment_status: String,
}

fn status_update(id: RecordId, status: &str) -> Target {
    Target::put("admin/update-withdrawal-status").json(json!({
        "id": id,
        "payment_status": status,
    }))
}

pub struct Withdrawals;

impl Resource for Withdrawals {
    type Record = Withdrawal;
    type Draft = WithdrawalDraft;

    const PAGE: PageId = PageId::Withdrawals;
    const NOUN: &'static str = "withdrawal";
    const PLURAL: &'static str = "withdrawal requests";
    const OPERATIONS: Operations = Operations {
        create: false,
        edit: true,
        delete: false,
        toggles: &[],
        actions: &["approve", "reject"],
    };

    fn list() -> Target {
        Target::get("admin/all-withdrawal-list")
    }

    fn paging(_page_size: u32) -> Paging {
        Paging::Server { per_page: None }
    }

    fn search_param() -> Option<&'static str> {
        Some("search")
    }

    fn id(record: &Withdrawal) -> RecordId {
        record.id
    }

    fn matches(record: &Withdrawal, needle: &str) -> bool {
        contains_ci(&record.user_name, needle) || contains_ci(&record.user_mobile, needle)
    }

    fn draft_from(record: &Withdrawal) -> WithdrawalDraft {
        WithdrawalDraft {
            payment_status: record.withdrawal_money_status.clone(),
        }
    }

    fn validate(draft: &WithdrawalDraft, _mode: ModalMode) -> Result<(), ValidationError> {
        if PAYMENT_STATUSES.contains(&draft.payment_status.trim()) {
            Ok(())
        } else {
            Err(ValidationError::NotAllowed {
                label: "Payment status",
                allowed: PAYMENT_STATUSES.join(", "),
            })
        }
    }

    fn update(id: RecordId, draft: &WithdrawalDraft) -> Option<Target> {
        Some(status_update(id, draft.payment_status.trim()))
    }

    fn action(record: &Withdrawal, action: &str) -> Option<Target> {
        match action {
            "approve" => Some(status_update(record.id, "approved")),
            "reject" => Some(status_update(record.id, "rejected")),
            _ => None,
        }
    }
}
