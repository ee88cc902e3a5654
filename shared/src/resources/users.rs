use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::PageId;
use crate::api::lenient;
use crate::event::{RecordId, ValidationError};
use crate::resource::{
    contains_ci, require, rows_of, ModalMode, Operations, Panel, Resource, Target,
};

pub const GAME_HISTORY: &str = "game_history";
pub const STATEMENT: &str = "statement";
pub const REFERRALS: &str = "referrals";

/// Statement tabs. `All` and the transaction types view
/// `all_transaction`; the last tab lists referral bonuses instead.
pub const STATEMENT_TABS: &[&str] = &[
    "All",
    "credit",
    "debit",
    "bonus",
    "won",
    "loss",
    "withdrawal",
    REFERRAL_TAB,
];
const REFERRAL_TAB: &str = "All Referall Join";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct User {
    pub id: RecordId,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub mobile: String,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub referral_code: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_amount")]
    pub earnings: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_amount")]
    pub balance: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_text")]
    pub role: Option<String>,
    /// `"1"` or `"0"`.
    #[serde(default, deserialize_with = "lenient::text")]
    pub status: String,
}

impl User {
    pub fn is_flagged(&self) -> bool {
        self.status.trim() == "1"
    }
}

/// The add-user form; in edit mode only the password pair is used.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct UserDraft {
    #[serde(deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(deserialize_with = "lenient::text")]
    pub email: String,
    #[serde(deserialize_with = "lenient::text")]
    pub mobile: String,
    #[serde(deserialize_with = "lenient::text")]
    pub password: String,
    #[serde(deserialize_with = "lenient::text")]
    pub confirm_password: String,
}

pub struct Users;

impl Resource for Users {
    type Record = User;
    type Draft = UserDraft;

    const PAGE: PageId = PageId::Users;
    const NOUN: &'static str = "user";
    const PLURAL: &'static str = "users";
    const OPERATIONS: Operations = Operations {
        create: true,
        edit: true,
        delete: true,
        toggles: &["status"],
        actions: &["logout"],
    };
    const PANELS: &'static [Panel] = &[
        Panel {
            name: GAME_HISTORY,
            title: "Game History",
            noun: "game",
            tabs: &[],
            removable: true,
        },
        Panel {
            name: STATEMENT,
            title: "User Details",
            noun: "transaction",
            tabs: STATEMENT_TABS,
            removable: false,
        },
        Panel {
            name: REFERRALS,
            title: "Referral Details",
            noun: "referral",
            tabs: &[],
            removable: false,
        },
    ];

    fn list() -> Target {
        Target::get("admin/all-users-list")
    }

    fn id(record: &User) -> RecordId {
        record.id
    }

    fn matches(record: &User, needle: &str) -> bool {
        contains_ci(&record.name, needle) || contains_ci(&record.mobile, needle)
    }

    fn detail(id: RecordId) -> Option<Target> {
        Some(Target::get("admin/user-details").query("id", id))
    }

    fn draft_from(record: &User) -> UserDraft {
        UserDraft {
            name: record.name.clone(),
            email: record.email.clone().unwrap_or_default(),
            mobile: record.mobile.clone(),
            ..UserDraft::default()
        }
    }

    fn validate(draft: &UserDraft, mode: ModalMode) -> Result<(), ValidationError> {
        if mode == ModalMode::Create {
            require(&draft.name, "Name")?;
            require(&draft.mobile, "Mobile")?;
        }
        require(&draft.password, "Password")?;
        if draft.password != draft.confirm_password {
            return Err(ValidationError::PasswordMismatch);
        }
        Ok(())
    }

    fn create(draft: &UserDraft) -> Option<Target> {
        Some(Target::post("admin/add-new-users").json(json!({
            "name": draft.name.trim(),
            "email": draft.email.trim(),
            "mobile": draft.mobile.trim(),
            "password": draft.password,
            "confirm_password": draft.confirm_password,
        })))
    }

    fn update(id: RecordId, draft: &UserDraft) -> Option<Target> {
        Some(Target::put("admin/change-password-admin").json(json!({
            "id": id,
            "password": draft.password,
            "password_confirmation": draft.confirm_password,
        })))
    }

    fn delete(id: RecordId) -> Option<Target> {
        Some(Target::delete("admin/delete-users").json(json!({ "id": id })))
    }

    fn toggle(record: &User, field: &str) -> Option<Target> {
        (field == "status").then(|| {
            let next = if record.is_flagged() { 0 } else { 1 };
            Target::put("admin/user-status").form([
                ("user_id", record.id.get()),
                ("user_status", next),
            ])
        })
    }

    fn action(record: &User, action: &str) -> Option<Target> {
        (action == "logout")
            .then(|| Target::post("admin/update-token").json(json!({ "user_id": record.id })))
    }

    fn panel(record: &User, panel: &str) -> Option<Target> {
        match panel {
            GAME_HISTORY => Some(Target::get(format!(
                "admin/play-game-history-user/{}",
                record.id
            ))),
            STATEMENT => Some(Target::get("admin/get-user-statement").query("user_id", record.id)),
            REFERRALS => Some(Target::get("admin/get-referal_code").query("user_id", record.id)),
            _ => None,
        }
    }

    fn panel_rows(panel: &str, tab: &str, body: &Value) -> Vec<Value> {
        let data = body.get("data");
        match panel {
            GAME_HISTORY => rows_of(data),
            STATEMENT if tab == REFERRAL_TAB => rows_of(data.and_then(|d| d.get("All_bonus"))),
            STATEMENT => rows_of(data.and_then(|d| d.get("all_transaction")))
                .into_iter()
                .filter(|row| {
                    tab == "All"
                        || row.get("transaction_type").and_then(Value::as_str) == Some(tab)
                })
                .collect(),
            REFERRALS => rows_of(data.and_then(|d| d.get("All_bonus"))),
            _ => Vec::new(),
        }
    }

    fn remove_panel_row(panel: &str, row: RecordId) -> Option<Target> {
        (panel == GAME_HISTORY).then(|| Target::delete(format!("admin/game-delete-by-admin/{row}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::http::HttpMethod;
    use crate::resource::Payload;

    fn user(id: u64, name: &str, mobile: &str, status: &str) -> User {
        serde_json::from_value(json!({
            "id": id, "name": name, "mobile": mobile, "status": status,
            "balance": "120.50", "email": null
        }))
        .unwrap()
    }

    #[test]
    fn decodes_loose_api_fields() {
        let u: User = serde_json::from_value(json!({
            "id": "12", "name": "Rahul", "mobile": 9876543210_u64, "status": 1
        }))
        .unwrap();
        assert_eq!(u.id, RecordId(12));
        assert_eq!(u.mobile, "9876543210");
        assert!(u.is_flagged());
        assert_eq!(u.balance, None);
    }

    #[test]
    fn search_covers_name_and_mobile() {
        let rahul = user(1, "Rahul Sharma", "9000000001", "0");
        let amit = user(2, "Amit", "9000000002", "0");
        assert!(Users::matches(&rahul, "rahul"));
        assert!(!Users::matches(&amit, "rahul"));
        assert!(Users::matches(&amit, "0002"));
    }

    #[test]
    fn create_needs_matching_passwords() {
        let mut draft = UserDraft {
            name: "Rahul".into(),
            mobile: "9000000001".into(),
            password: "secret".into(),
            confirm_password: "secrets".into(),
            ..UserDraft::default()
        };
        assert_eq!(
            Users::validate(&draft, ModalMode::Create),
            Err(ValidationError::PasswordMismatch)
        );
        draft.confirm_password = "secret".into();
        assert_eq!(Users::validate(&draft, ModalMode::Create), Ok(()));

        let draft = UserDraft::default();
        assert_eq!(
            Users::validate(&draft, ModalMode::Create),
            Err(ValidationError::Required { label: "Name" })
        );
        assert_eq!(
            Users::validate(&draft, ModalMode::Edit),
            Err(ValidationError::Required { label: "Password" })
        );
    }

    #[test]
    fn status_toggle_is_form_encoded() {
        let target = Users::toggle(&user(7, "A", "1", "1"), "status").unwrap();
        assert_eq!(target.method(), HttpMethod::Put);
        assert_eq!(target.path(), "admin/user-status");
        assert_eq!(
            target.payload(),
            &Payload::Form(vec![
                ("user_id".into(), "7".into()),
                ("user_status".into(), "0".into())
            ])
        );
        assert!(Users::toggle(&user(7, "A", "1", "1"), "active").is_none());
    }

    #[test]
    fn password_change_is_body_addressed() {
        let draft = UserDraft {
            password: "pw".into(),
            confirm_password: "pw".into(),
            ..UserDraft::default()
        };
        let target = Users::update(RecordId(3), &draft).unwrap();
        assert_eq!(target.path(), "admin/change-password-admin");
        assert_eq!(
            target.payload(),
            &Payload::Json(json!({"id": 3, "password": "pw", "password_confirmation": "pw"}))
        );
        assert_eq!(
            Users::delete(RecordId(3)).unwrap().payload(),
            &Payload::Json(json!({"id": 3}))
        );
    }

    fn statement() -> Value {
        json!({"status": "success", "data": {
            "all_transaction": [
                {"id": 1, "transaction_type": "credit", "amount": "100"},
                {"id": 2, "transaction_type": "won", "amount": "450"},
                {"id": 3, "transaction_type": "credit", "amount": "50"}
            ],
            "All_bonus": [{"id": 8, "name": "Amit", "referral_code": "AB12"}]
        }})
    }

    #[test]
    fn statement_tabs_slice_one_response() {
        let body = statement();
        assert_eq!(Users::panel_rows(STATEMENT, "All", &body).len(), 3);
        let credits = Users::panel_rows(STATEMENT, "credit", &body);
        assert_eq!(credits.len(), 2);
        assert!(credits.iter().all(|r| r["transaction_type"] == "credit"));
        assert!(Users::panel_rows(STATEMENT, "withdrawal", &body).is_empty());
        let joins = Users::panel_rows(STATEMENT, "All Referall Join", &body);
        assert_eq!(joins, vec![json!({"id": 8, "name": "Amit", "referral_code": "AB12"})]);
    }

    #[test]
    fn panels_fetch_per_user() {
        let rahul = user(5, "Rahul", "9000000001", "0");
        let history = Users::panel(&rahul, GAME_HISTORY).unwrap();
        assert_eq!(history.path(), "admin/play-game-history-user/5");
        assert_eq!(
            Users::panel(&rahul, REFERRALS).unwrap().path(),
            "admin/get-referal_code"
        );
        assert!(Users::panel(&rahul, "wallet").is_none());

        let body = json!({"data": [{"id": 90, "Playing_Name": "Jodi"}]});
        assert_eq!(Users::panel_rows(GAME_HISTORY, "", &body).len(), 1);
        assert!(Users::panel_rows(REFERRALS, "", &json!({"data": null})).is_empty());
    }

    #[test]
    fn only_played_games_can_be_removed() {
        let target = Users::remove_panel_row(GAME_HISTORY, RecordId(90)).unwrap();
        assert_eq!(target.method(), HttpMethod::Delete);
        assert_eq!(target.path(), "admin/game-delete-by-admin/90");
        assert!(Users::remove_panel_row(STATEMENT, RecordId(90)).is_none());
    }

    #[test]
    fn force_logout_posts_user_id() {
        let target = Users::action(&user(9, "A", "1", "0"), "logout").unwrap();
        assert_eq!(target.method(), HttpMethod::Post);
        assert_eq!(target.payload(), &Payload::Json(json!({"user_id": 9})));
        assert!(Users::action(&user(9, "A", "1", "0"), "approve").is_none());
    }
}
