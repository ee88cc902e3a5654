use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::config::Settings;
use crate::controller::ListPage;
use crate::dashboard::{DashboardState, DashboardView};
use crate::event::{MountId, RecordId, Route};
use crate::resource::ModalMode;
use crate::resources::PageId;
use crate::session::{Session, DEFAULT_ADMIN_NAME};
use crate::{AppError, ErrorSeverity};

/// Where a list stands: `Idle → Loading → {Loaded, Failed}`, back to
/// `Loading` on every trigger.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LoadPhase {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed,
}

#[derive(Default)]
pub struct Model {
    pub settings: Option<Settings>,
    pub session: Option<Session>,
    pub route: Route,
    pub page: Option<Box<dyn ListPage>>,
    pub dashboard: DashboardState,
    pub next_mount: u64,
    pub admin_name: Option<String>,
    pub login_error: Option<String>,
    pub logging_in: bool,
    pub restoring: bool,
    pub active_error: Option<AppError>,
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("route", &self.route)
            .field("signed_in", &self.session.is_some())
            .field("page", &self.page.as_ref().map(|p| (p.page(), p.mount_id())))
            .field("next_mount", &self.next_mount)
            .field("active_error", &self.active_error)
            .finish_non_exhaustive()
    }
}

impl Model {
    pub fn set_error(&mut self, error: AppError) {
        self.active_error = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.active_error = None;
    }

    pub fn is_signed_in(&self) -> bool {
        self.session.is_some()
    }

    /// A fresh id for the next page lifetime.
    pub fn next_mount_id(&mut self) -> MountId {
        self.next_mount += 1;
        MountId(self.next_mount)
    }

    /// Whether `mount` is the list page currently on screen.
    pub fn is_mounted(&self, mount: MountId) -> bool {
        self.page.as_ref().is_some_and(|p| p.mount_id() == mount)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserFacingError {
    pub message: String,
    pub is_transient: bool,
    pub error_code: String,
}

impl From<&AppError> for UserFacingError {
    fn from(e: &AppError) -> Self {
        Self {
            message: e.user_facing_message(),
            is_transient: e.severity == ErrorSeverity::Transient,
            error_code: e.code().to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterKind {
    Choice,
    Date,
    Category,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
}

/// A filter control. Date filters have no options; category options
/// appear once the category list has loaded.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilterView {
    pub name: String,
    pub label: String,
    pub kind: FilterKind,
    pub value: String,
    pub required: bool,
    pub options: Vec<FilterOption>,
}

/// A headline number shown above a table, e.g. the day's total stake.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Figure {
    pub label: String,
    pub value: String,
}

impl Figure {
    pub fn amount(label: &str, value: f64) -> Self {
        Self {
            label: label.to_string(),
            value: format!("{value:.2}"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PanelLink {
    pub name: String,
    pub title: String,
}

/// An opened drill-down for one record.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PanelView {
    pub name: String,
    pub title: String,
    pub record: RecordId,
    pub tabs: Vec<String>,
    pub tab: String,
    pub rows: Vec<Value>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub can_remove: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ModalView {
    pub mode: ModalMode,
    pub editing: Option<RecordId>,
    pub draft: Map<String, Value>,
    pub validation_error: Option<String>,
    pub submitting: bool,
    pub loading: bool,
}

/// One list page as the shell draws it. `rows` are the records of the
/// current page, serialised as the API sent them.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PageView {
    pub page: PageId,
    pub title: String,
    pub rows: Vec<Value>,
    pub current_page: u32,
    pub total_pages: u32,
    pub total_count: u64,
    pub search_query: String,
    pub filters: Vec<FilterView>,
    pub summary: Option<Figure>,
    pub is_loading: bool,
    pub phase: LoadPhase,
    pub error: Option<String>,
    pub notice: Option<String>,
    pub modal: Option<ModalView>,
    pub can_create: bool,
    pub can_edit: bool,
    pub can_delete: bool,
    pub toggles: Vec<String>,
    pub actions: Vec<String>,
    pub panels: Vec<PanelLink>,
    pub panel: Option<PanelView>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ViewModel {
    pub route: Route,
    pub is_authenticated: bool,
    pub is_restoring: bool,
    pub admin_name: String,
    pub login_error: Option<String>,
    pub logging_in: bool,
    pub error: Option<UserFacingError>,
    pub dashboard: Option<DashboardView>,
    pub page: Option<PageView>,
}

impl ViewModel {
    pub fn from_model(model: &Model) -> Self {
        Self {
            route: model.route,
            is_authenticated: model.is_signed_in(),
            is_restoring: model.restoring,
            admin_name: model
                .admin_name
                .clone()
                .unwrap_or_else(|| DEFAULT_ADMIN_NAME.to_string()),
            login_error: model.login_error.clone(),
            logging_in: model.logging_in,
            error: model.active_error.as_ref().map(UserFacingError::from),
            dashboard: (model.route == Route::Dashboard).then(|| model.dashboard.view()),
            page: match model.route {
                Route::List(_) => model.page.as_ref().map(|p| p.view()),
                _ => None,
            },
        }
    }
}
