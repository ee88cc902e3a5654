use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use crate::capabilities::http::HttpResult;
use crate::capabilities::kv::KvResult;
use crate::capabilities::timer::TimerOutput;
use crate::config::ConsoleConfig;
use crate::controller::CallPurpose;
use crate::resources::PageId;
use crate::session::LoginForm;

// --- Typed IDs ---

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub const fn new(n: u64) -> Self {
                Self(n)
            }
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        // The API sends ids both as numbers and as numeric strings.
        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
                let value = Value::deserialize(d)?;
                crate::api::lenient_u64(&value).map(Self).ok_or_else(|| {
                    serde::de::Error::custom(format!(
                        concat!("invalid ", stringify!($name), ": {}"),
                        value
                    ))
                })
            }
        }
    };
}

typed_id!(RecordId);
typed_id!(MountId);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{label} is required")]
    Required { label: &'static str },
    #[error("{label} must be in the format HH:MM")]
    TimeFormat { label: &'static str },
    #[error("{label} must be a positive integer")]
    Negative { label: &'static str },
    #[error("{label} must be one of: {allowed}")]
    NotAllowed {
        label: &'static str,
        allowed: String,
    },
    #[error("Passwords do not match.")]
    PasswordMismatch,
    #[error("Please select a valid user.")]
    MissingUser,
    #[error("Please enter a valid amount.")]
    InvalidAmount,
    #[error("Invalid form data: {0}")]
    Malformed(String),
}

/// Where the console is. Exactly one list page is mounted at a time.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Route {
    #[default]
    Login,
    Dashboard,
    List(PageId),
}

/// Input aimed at the mounted list page.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum PageEvent {
    Search(String),
    Filter { name: String, value: Option<String> },
    ChangePage(u32),
    Refresh,
    OpenCreate,
    OpenEdit(RecordId),
    EditDraft { field: String, value: Value },
    CloseModal,
    Submit,
    Remove(RecordId),
    Toggle { id: RecordId, field: String },
    Action { id: RecordId, action: String },
    OpenPanel { id: RecordId, panel: String },
    PanelTab(String),
    ClosePanel,
    RemovePanelRow(RecordId),
}

impl PageEvent {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Search(_) => "search",
            Self::Filter { .. } => "filter",
            Self::ChangePage(_) => "change_page",
            Self::Refresh => "refresh",
            Self::OpenCreate => "open_create",
            Self::OpenEdit(_) => "open_edit",
            Self::EditDraft { .. } => "edit_draft",
            Self::CloseModal => "close_modal",
            Self::Submit => "submit",
            Self::Remove(_) => "remove",
            Self::Toggle { .. } => "toggle",
            Self::Action { .. } => "action",
            Self::OpenPanel { .. } => "open_panel",
            Self::PanelTab(_) => "panel_tab",
            Self::ClosePanel => "close_panel",
            Self::RemovePanelRow(_) => "remove_panel_row",
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Event {
    // Shell input
    Startup(ConsoleConfig),
    LoginSubmitted(LoginForm),
    Logout,
    Navigate(Route),
    Page(PageEvent),
    RefreshDashboard,
    DismissError,

    // Capability answers
    #[serde(skip)]
    TokenLoaded(Box<KvResult>),
    #[serde(skip)]
    TokenStored(Box<KvResult>),
    #[serde(skip)]
    TokenForgotten(Box<KvResult>),
    #[serde(skip)]
    LoginResponse(Box<HttpResult>),
    #[serde(skip)]
    ProfileResponse(Box<HttpResult>),
    #[serde(skip)]
    LogoutResponse(Box<HttpResult>),
    #[serde(skip)]
    DashboardResponse {
        mount: MountId,
        result: Box<HttpResult>,
    },
    #[serde(skip)]
    PageResponse {
        mount: MountId,
        purpose: CallPurpose,
        result: Box<HttpResult>,
    },
    #[serde(skip)]
    PollFired(TimerOutput),
}

impl Event {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Startup(_) => "startup",
            Self::LoginSubmitted(_) => "login_submitted",
            Self::Logout => "logout",
            Self::Navigate(_) => "navigate",
            Self::Page(page) => page.name(),
            Self::RefreshDashboard => "refresh_dashboard",
            Self::DismissError => "dismiss_error",
            Self::TokenLoaded(_) => "token_loaded",
            Self::TokenStored(_) => "token_stored",
            Self::TokenForgotten(_) => "token_forgotten",
            Self::LoginResponse(_) => "login_response",
            Self::ProfileResponse(_) => "profile_response",
            Self::LogoutResponse(_) => "logout_response",
            Self::DashboardResponse { .. } => "dashboard_response",
            Self::PageResponse { .. } => "page_response",
            Self::PollFired(_) => "poll_fired",
        }
    }

    pub const fn is_user_initiated(&self) -> bool {
        matches!(
            self,
            Self::LoginSubmitted(_)
                | Self::Logout
                | Self::Navigate(_)
                | Self::Page(_)
                | Self::RefreshDashboard
                | Self::DismissError
        )
    }
}
