//! The generic polling list with a create/edit dialog.
//!
//! [`ResourceListController`] is a pure state machine: every operation
//! mutates local state and returns the [`Followup`]s (HTTP calls, timer
//! starts and cancels, session expiry) the app has to carry out. Results
//! come back through [`ResourceListController::on_response`] and
//! [`ResourceListController::on_tick`].

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::api::{self, total_pages_for};
use crate::capabilities::http::{HttpError, HttpRequest, HttpResult};
use crate::capabilities::timer::{TimerId, TimerOperation};
use crate::config::Settings;
use crate::event::{MountId, PageEvent, RecordId, ValidationError};
use crate::model::{
    Figure, FilterKind, FilterOption, FilterView, LoadPhase, ModalView, PageView, PanelLink,
    PanelView,
};
use crate::resource::{draft_to_map, FilterInput, ModalMode, Panel, Paging, Resource, Target};
use crate::resources::{Categories, Category, PageId};
use crate::session::Session;
use crate::{AppError, ErrorKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("page {page} is outside 1..={total_pages}")]
    PageOutOfRange { page: u32, total_pages: u32 },

    #[error("no dialog is open")]
    ModalClosed,

    #[error("{operation} is not available for {resource}")]
    Unsupported {
        operation: &'static str,
        resource: &'static str,
    },

    #[error("record {0} is not in the current list")]
    UnknownRecord(RecordId),

    #[error("unknown filter '{0}'")]
    UnknownFilter(String),

    #[error("'{value}' is not a valid value for filter '{name}'")]
    InvalidFilterValue { name: String, value: String },

    #[error("editing requires a selected record")]
    MissingEditTarget,

    #[error("poll interval {millis}ms is out of range")]
    InvalidPollInterval { millis: u64 },

    #[error("the page has been closed")]
    TornDown,

    #[error("unknown panel '{0}'")]
    UnknownPanel(String),

    #[error("no panel is open")]
    PanelClosed,

    #[error("unknown tab '{0}'")]
    UnknownTab(String),
}

impl From<ControllerError> for AppError {
    fn from(err: ControllerError) -> Self {
        let kind = match err {
            ControllerError::PageOutOfRange { .. }
            | ControllerError::InvalidFilterValue { .. }
            | ControllerError::UnknownFilter(_)
            | ControllerError::UnknownTab(_) => ErrorKind::Validation,
            ControllerError::UnknownRecord(_) => ErrorKind::NotFound,
            _ => ErrorKind::Internal,
        };
        AppError::new(kind, err.to_string())
    }
}

/// State of the list shown on a page.
///
/// `items` always holds the result of the latest successful fetch, and
/// `current_page`/`search_query` are the ones that fetch asked for. A
/// failed fetch only touches `error`, `is_loading` and `phase`.
#[derive(Debug, Clone, PartialEq)]
pub struct ListState<T> {
    pub items: Vec<T>,
    pub current_page: u32,
    pub total_pages: u32,
    pub total_count: u64,
    pub search_query: String,
    pub filters: BTreeMap<String, String>,
    pub summary: Option<Figure>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub notice: Option<String>,
    pub phase: LoadPhase,
}

impl<T> Default for ListState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            current_page: 1,
            total_pages: 1,
            total_count: 0,
            search_query: String::new(),
            filters: BTreeMap::new(),
            summary: None,
            is_loading: false,
            error: None,
            notice: None,
            phase: LoadPhase::Idle,
        }
    }
}

/// The open create/edit dialog. Dropping it clears the draft.
#[derive(Debug, Clone, PartialEq)]
pub struct ModalState {
    pub mode: ModalMode,
    pub editing: Option<RecordId>,
    pub draft: Map<String, Value>,
    pub validation_error: Option<String>,
    pub submitting: bool,
    pub loading_detail: bool,
}

impl ModalState {
    fn new(mode: ModalMode, editing: Option<RecordId>, draft: Map<String, Value>) -> Self {
        Self {
            mode,
            editing,
            draft,
            validation_error: None,
            submitting: false,
            loading_detail: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Update(RecordId),
    Delete(RecordId),
    Toggle { id: RecordId, field: String },
    Action { id: RecordId, action: String },
    /// Deletes a row shown in an opened panel.
    PanelRow { panel: String, row: RecordId },
}

impl MutationKind {
    /// Phrase for "Failed to ... Please try again."
    pub fn describe(&self, noun: &str) -> String {
        match self {
            Self::Create => format!("add {noun}"),
            Self::Update(_) => format!("save {noun}"),
            Self::Delete(_) => format!("delete {noun}"),
            Self::Toggle { .. } => format!("update {noun} status"),
            Self::Action { action, .. } => format!("{action} {noun}"),
            Self::PanelRow { .. } => format!("delete {noun}"),
        }
    }

    pub fn success_notice(&self, noun: &str) -> String {
        let noun = capitalize(noun);
        match self {
            Self::Create => format!("{noun} added successfully."),
            Self::Update(_) => format!("{noun} updated successfully."),
            Self::Delete(_) => format!("{noun} deleted successfully."),
            Self::Toggle { .. } => format!("{noun} status updated successfully."),
            Self::Action { action, .. } => format!("{noun} {action} completed successfully."),
            Self::PanelRow { .. } => format!("{noun} deleted successfully."),
        }
    }

    fn is_dialog(&self) -> bool {
        matches!(self, Self::Create | Self::Update(_))
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallPurpose {
    List { generation: u64 },
    Detail { id: RecordId },
    Mutation(MutationKind),
    /// The category list behind category filters.
    FilterOptions,
    Panel { generation: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCall {
    pub request: HttpRequest,
    pub purpose: CallPurpose,
}

/// Side effect requested by a controller operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Followup {
    Call(ApiCall),
    StartTimer { id: TimerId, after: Duration },
    CancelTimer(TimerId),
    SessionExpired,
}

/// The armed refresh timer. Each tick re-arms under a new [`TimerId`], so
/// a tick is honoured only if it matches the handle currently held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollHandle {
    timer: TimerId,
    interval: Duration,
}

impl PollHandle {
    pub fn timer(&self) -> TimerId {
        self.timer
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn cancel(self) -> Followup {
        Followup::CancelTimer(self.timer)
    }
}

/// Object-safe face of a mounted list page, whatever its resource.
pub trait ListPage: Send {
    fn page(&self) -> PageId;
    fn mount_id(&self) -> MountId;
    fn mount(&mut self) -> Vec<Followup>;
    fn handle(&mut self, event: PageEvent) -> Result<Vec<Followup>, ControllerError>;
    fn on_response(&mut self, purpose: CallPurpose, result: HttpResult) -> Vec<Followup>;
    fn on_tick(&mut self, timer: TimerId) -> Vec<Followup>;
    fn teardown(&mut self) -> Vec<Followup>;
    fn dismiss_messages(&mut self);
    fn view(&self) -> PageView;
}

/// A list fetch in flight. Its page and query replace the committed ones
/// only when the answer succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingLoad {
    generation: u64,
    page: u32,
    query: String,
}

/// An opened drill-down. The fetched body is kept whole so switching tabs
/// needs no new request.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelState {
    pub panel: Panel,
    pub record: RecordId,
    pub tab: String,
    pub body: Option<Value>,
    pub is_loading: bool,
    pub error: Option<String>,
    generation: u64,
    target: Target,
}

pub struct ResourceListController<R: Resource> {
    session: Session,
    mount: MountId,
    paging: Paging,
    poll_interval: Duration,
    state: ListState<R::Record>,
    modal: Option<ModalState>,
    generation: u64,
    pending: Option<PendingLoad>,
    category_options: Vec<FilterOption>,
    panel: Option<PanelState>,
    panel_generation: u64,
    timer_seq: u64,
    poll: Option<PollHandle>,
    torn_down: bool,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> ResourceListController<R> {
    pub fn new(session: Session, settings: &Settings, mount: MountId) -> Self {
        let mut state = ListState::default();
        for filter in R::filters() {
            state
                .filters
                .insert(filter.name.to_string(), filter.default.to_string());
        }
        Self {
            session,
            mount,
            paging: R::paging(settings.page_size),
            poll_interval: settings.poll_interval,
            state,
            modal: None,
            generation: 0,
            pending: None,
            category_options: Vec::new(),
            panel: None,
            panel_generation: 0,
            timer_seq: 0,
            poll: None,
            torn_down: false,
            _resource: PhantomData,
        }
    }

    pub fn state(&self) -> &ListState<R::Record> {
        &self.state
    }

    pub fn modal(&self) -> Option<&ModalState> {
        self.modal.as_ref()
    }

    pub fn panel(&self) -> Option<&PanelState> {
        self.panel.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.modal.is_some()
    }

    pub fn poll_handle(&self) -> Option<&PollHandle> {
        self.poll.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    fn list_action() -> String {
        format!("fetch {}", R::PLURAL)
    }

    fn find(&self, id: RecordId) -> Option<&R::Record> {
        self.state.items.iter().find(|r| R::id(r) == id)
    }

    /// What rows touched by `kind` are called.
    fn noun_of(kind: &MutationKind) -> &'static str {
        match kind {
            MutationKind::PanelRow { panel, .. } => R::PANELS
                .iter()
                .find(|p| p.name == panel)
                .map_or(R::NOUN, |p| p.noun),
            _ => R::NOUN,
        }
    }

    fn unsupported(operation: &'static str) -> ControllerError {
        ControllerError::Unsupported {
            operation,
            resource: R::PLURAL,
        }
    }

    fn next_timer(&mut self) -> TimerId {
        self.timer_seq += 1;
        TimerId {
            mount: self.mount.get(),
            seq: self.timer_seq,
        }
    }

    /// First page, no search, polling on for resources that poll. Pages
    /// with a category filter also fetch the category list.
    pub fn mount(&mut self) -> Vec<Followup> {
        info!(resource = R::PLURAL, mount = %self.mount, "mounting list page");
        let mut followups = self.load(1, "");
        if R::filters().iter().any(|f| f.input == FilterInput::Category) {
            match Categories::list().build(&self.session) {
                Ok(request) => followups.push(Followup::Call(ApiCall {
                    request,
                    purpose: CallPurpose::FilterOptions,
                })),
                Err(e) => warn!(resource = R::PLURAL, error = %e, "category list not requested"),
            }
        }
        if R::POLLS {
            match self.start_polling(self.poll_interval) {
                Ok(more) => followups.extend(more),
                Err(e) => warn!(resource = R::PLURAL, error = %e, "polling not started"),
            }
        }
        followups
    }

    /// The first required filter still waiting for a value.
    fn missing_filter(&self) -> Option<&'static str> {
        R::filters()
            .iter()
            .find(|f| {
                f.required
                    && self
                        .state
                        .filters
                        .get(f.name)
                        .map_or(true, |v| v.trim().is_empty())
            })
            .map(|f| f.name)
    }

    /// Fetches `page` filtered by `query` and the active filters. Every
    /// call takes a new generation; only the newest answer is applied.
    #[instrument(skip_all, fields(resource = R::PLURAL, page = page, generation = tracing::field::Empty))]
    pub fn load(&mut self, page: u32, query: &str) -> Vec<Followup> {
        if self.torn_down {
            return Vec::new();
        }
        self.generation += 1;
        let generation = self.generation;
        tracing::Span::current().record("generation", generation);
        let pending = PendingLoad {
            generation,
            page: page.max(1),
            query: query.to_string(),
        };

        if let Some(filter) = self.missing_filter() {
            debug!(filter, "waiting for a required filter");
            self.pending = None;
            self.state.current_page = pending.page;
            self.state.search_query = pending.query;
            self.state.items.clear();
            self.state.summary = None;
            self.state.total_pages = 1;
            self.state.total_count = 0;
            self.state.is_loading = false;
            self.state.phase = LoadPhase::Idle;
            return Vec::new();
        }

        match self.list_request(&pending) {
            Ok(request) => {
                self.pending = Some(pending);
                self.state.is_loading = true;
                self.state.phase = LoadPhase::Loading;
                vec![Followup::Call(ApiCall {
                    request,
                    purpose: CallPurpose::List { generation },
                })]
            }
            Err(e) => {
                warn!(error = %e, "could not build list request");
                self.pending = None;
                self.fail_load(&api::from_http_error(&e, &Self::list_action()));
                Vec::new()
            }
        }
    }

    fn list_request(&self, pending: &PendingLoad) -> Result<HttpRequest, HttpError> {
        let mut target = R::list();
        if let Paging::Server { per_page } = self.paging {
            target = target.query("page", pending.page);
            if let Some(per_page) = per_page {
                target = target.query("per_page", per_page);
            }
        }
        if let Some(param) = R::search_param() {
            let query = pending.query.trim();
            if !query.is_empty() {
                target = target.query(param, query);
            }
        }
        for (name, value) in &self.state.filters {
            if !value.is_empty() {
                target = target.param(name, value);
            }
        }
        target.build(&self.session)
    }

    fn fail_load(&mut self, error: &AppError) {
        self.state.is_loading = false;
        self.state.phase = LoadPhase::Failed;
        self.state.error = Some(error.user_facing_message());
    }

    /// The page and query most recently asked for: the fetch in flight if
    /// there is one, else the committed pair.
    fn requested(&self) -> (u32, String) {
        match &self.pending {
            Some(pending) => (pending.page, pending.query.clone()),
            None => (self.state.current_page, self.state.search_query.clone()),
        }
    }

    pub fn refresh(&mut self) -> Vec<Followup> {
        let (page, query) = self.requested();
        self.load(page, &query)
    }

    /// Arms the refresh timer, replacing any previous one.
    pub fn start_polling(&mut self, interval: Duration) -> Result<Vec<Followup>, ControllerError> {
        if self.torn_down {
            return Err(ControllerError::TornDown);
        }
        let timer = self.next_timer();
        TimerOperation::start(timer, interval).map_err(|_| ControllerError::InvalidPollInterval {
            millis: u64::try_from(interval.as_millis()).unwrap_or(u64::MAX),
        })?;

        let mut followups = self.stop_polling();
        self.poll = Some(PollHandle { timer, interval });
        followups.push(Followup::StartTimer {
            id: timer,
            after: interval,
        });
        Ok(followups)
    }

    pub fn stop_polling(&mut self) -> Vec<Followup> {
        self.poll.take().map(PollHandle::cancel).into_iter().collect()
    }

    /// A refresh timer fired. Ticks for a handle that is no longer held
    /// (replaced, stopped or torn down) are ignored.
    pub fn on_tick(&mut self, timer: TimerId) -> Vec<Followup> {
        let handle = match self.poll {
            Some(handle) if handle.timer == timer && !self.torn_down => handle,
            _ => {
                debug!(resource = R::PLURAL, %timer, "ignoring stale poll tick");
                return Vec::new();
            }
        };
        let next = self.next_timer();
        self.poll = Some(PollHandle {
            timer: next,
            interval: handle.interval,
        });
        let mut followups = self.refresh();
        followups.push(Followup::StartTimer {
            id: next,
            after: handle.interval,
        });
        followups
    }

    pub fn search(&mut self, query: &str) -> Vec<Followup> {
        self.load(1, query)
    }

    pub fn set_filter(
        &mut self,
        name: &str,
        value: Option<&str>,
    ) -> Result<Vec<Followup>, ControllerError> {
        let filter = R::filters()
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| ControllerError::UnknownFilter(name.to_string()))?;
        let value = value.unwrap_or(filter.default);
        if !filter.accepts(value) {
            return Err(ControllerError::InvalidFilterValue {
                name: name.to_string(),
                value: value.to_string(),
            });
        }
        self.state
            .filters
            .insert(filter.name.to_string(), value.to_string());
        let (_, query) = self.requested();
        Ok(self.load(1, &query))
    }

    /// Client-paged lists only move the slice over rows already held;
    /// server-paged ones fetch the page.
    pub fn change_page(&mut self, page: u32) -> Result<Vec<Followup>, ControllerError> {
        if page < 1 || page > self.state.total_pages {
            return Err(ControllerError::PageOutOfRange {
                page,
                total_pages: self.state.total_pages,
            });
        }
        match self.paging {
            Paging::Client { .. } => {
                self.state.current_page = page;
                Ok(Vec::new())
            }
            Paging::Server { .. } => {
                let (_, query) = self.requested();
                Ok(self.load(page, &query))
            }
        }
    }

    pub fn open_create(&mut self) -> Result<Vec<Followup>, ControllerError> {
        if !R::OPERATIONS.create {
            return Err(Self::unsupported("create"));
        }
        let draft = draft_to_map(&R::Draft::default()).unwrap_or_else(|e| {
            warn!(resource = R::PLURAL, error = %e, "empty draft did not serialise");
            Map::new()
        });
        self.modal = Some(ModalState::new(ModalMode::Create, None, draft));
        Ok(Vec::new())
    }

    /// Opens the edit dialog for `id`, fetching the record's detail when
    /// the resource has a detail endpoint.
    #[instrument(skip_all, fields(resource = R::PLURAL, id = %id))]
    pub fn open_edit(&mut self, id: RecordId) -> Result<Vec<Followup>, ControllerError> {
        if !R::OPERATIONS.edit {
            return Err(Self::unsupported("edit"));
        }
        let local = self.find(id).map(|r| R::draft_from(r));

        match R::detail(id) {
            Some(target) => {
                let draft = local
                    .as_ref()
                    .and_then(|d| draft_to_map(d).ok())
                    .unwrap_or_default();
                match target.build(&self.session) {
                    Ok(request) => {
                        let mut modal = ModalState::new(ModalMode::Edit, Some(id), draft);
                        modal.loading_detail = true;
                        self.modal = Some(modal);
                        Ok(vec![Followup::Call(ApiCall {
                            request,
                            purpose: CallPurpose::Detail { id },
                        })])
                    }
                    Err(e) => {
                        warn!(error = %e, "could not build detail request");
                        let action = format!("fetch {} details", R::NOUN);
                        self.state.error =
                            Some(api::from_http_error(&e, &action).user_facing_message());
                        Ok(Vec::new())
                    }
                }
            }
            None => {
                let draft = local.ok_or(ControllerError::UnknownRecord(id))?;
                let draft = draft_to_map(&draft).unwrap_or_default();
                self.modal = Some(ModalState::new(ModalMode::Edit, Some(id), draft));
                Ok(Vec::new())
            }
        }
    }

    pub fn edit_draft(&mut self, field: &str, value: Value) -> Result<Vec<Followup>, ControllerError> {
        let modal = self.modal.as_mut().ok_or(ControllerError::ModalClosed)?;
        modal.draft.insert(field.to_string(), value);
        Ok(Vec::new())
    }

    pub fn close_modal(&mut self) -> Vec<Followup> {
        self.modal = None;
        Vec::new()
    }

    /// Submits the open dialog in its current mode. A second submit while
    /// the first is in flight is ignored.
    pub fn submit(&mut self) -> Result<Vec<Followup>, ControllerError> {
        let modal = self.modal.as_ref().ok_or(ControllerError::ModalClosed)?;
        if modal.submitting {
            return Ok(Vec::new());
        }
        let draft = modal.draft.clone();
        match modal.mode {
            ModalMode::Create => self.submit_create(draft),
            ModalMode::Edit => {
                let id = modal.editing.ok_or(ControllerError::MissingEditTarget)?;
                self.submit_edit(id, draft)
            }
        }
    }

    pub fn submit_create(
        &mut self,
        draft: Map<String, Value>,
    ) -> Result<Vec<Followup>, ControllerError> {
        if !R::OPERATIONS.create {
            return Err(Self::unsupported("create"));
        }
        self.submit_draft(draft, ModalMode::Create, MutationKind::Create)
    }

    pub fn submit_edit(
        &mut self,
        id: RecordId,
        draft: Map<String, Value>,
    ) -> Result<Vec<Followup>, ControllerError> {
        if !R::OPERATIONS.edit {
            return Err(Self::unsupported("edit"));
        }
        self.submit_draft(draft, ModalMode::Edit, MutationKind::Update(id))
    }

    #[instrument(skip_all, fields(resource = R::PLURAL, mode = ?mode))]
    fn submit_draft(
        &mut self,
        draft: Map<String, Value>,
        mode: ModalMode,
        kind: MutationKind,
    ) -> Result<Vec<Followup>, ControllerError> {
        let modal = self.modal.as_mut().ok_or(ControllerError::ModalClosed)?;

        let parsed: R::Draft = match serde_json::from_value(Value::Object(draft.clone())) {
            Ok(parsed) => parsed,
            Err(e) => {
                let message = ValidationError::Malformed(e.to_string()).to_string();
                debug!(%message, "draft rejected");
                modal.validation_error = Some(message);
                return Ok(Vec::new());
            }
        };
        if let Err(e) = R::validate(&parsed, mode) {
            debug!(error = %e, "draft failed validation");
            modal.validation_error = Some(e.to_string());
            return Ok(Vec::new());
        }

        let target = match (&kind, mode) {
            (MutationKind::Update(id), ModalMode::Edit) => R::update(*id, &parsed),
            _ => R::create(&parsed),
        }
        .ok_or_else(|| Self::unsupported(if mode == ModalMode::Edit { "edit" } else { "create" }))?;

        match target.build(&self.session) {
            Ok(request) => {
                modal.draft = draft;
                modal.validation_error = None;
                modal.submitting = true;
                Ok(vec![Followup::Call(ApiCall {
                    request,
                    purpose: CallPurpose::Mutation(kind),
                })])
            }
            Err(e) => {
                warn!(error = %e, "could not build mutation request");
                let action = kind.describe(R::NOUN);
                modal.validation_error = Some(api::from_http_error(&e, &action).user_facing_message());
                Ok(Vec::new())
            }
        }
    }

    #[instrument(skip_all, fields(resource = R::PLURAL, id = %id))]
    pub fn remove(&mut self, id: RecordId) -> Result<Vec<Followup>, ControllerError> {
        let target = R::delete(id).ok_or_else(|| Self::unsupported("delete"))?;
        Ok(self.mutate(&target, MutationKind::Delete(id)))
    }

    #[instrument(skip_all, fields(resource = R::PLURAL, id = %id, field = field))]
    pub fn toggle_field(
        &mut self,
        id: RecordId,
        field: &str,
    ) -> Result<Vec<Followup>, ControllerError> {
        if !R::OPERATIONS.toggles.contains(&field) {
            return Err(Self::unsupported("toggle"));
        }
        let record = self.find(id).ok_or(ControllerError::UnknownRecord(id))?;
        let target = R::toggle(record, field).ok_or_else(|| Self::unsupported("toggle"))?;
        Ok(self.mutate(
            &target,
            MutationKind::Toggle {
                id,
                field: field.to_string(),
            },
        ))
    }

    #[instrument(skip_all, fields(resource = R::PLURAL, id = %id, action = action))]
    pub fn perform(&mut self, id: RecordId, action: &str) -> Result<Vec<Followup>, ControllerError> {
        if !R::OPERATIONS.actions.contains(&action) {
            return Err(Self::unsupported("action"));
        }
        let record = self.find(id).ok_or(ControllerError::UnknownRecord(id))?;
        let target = R::action(record, action).ok_or_else(|| Self::unsupported("action"))?;
        Ok(self.mutate(
            &target,
            MutationKind::Action {
                id,
                action: action.to_string(),
            },
        ))
    }

    fn mutate(&mut self, target: &Target, kind: MutationKind) -> Vec<Followup> {
        match target.build(&self.session) {
            Ok(request) => vec![Followup::Call(ApiCall {
                request,
                purpose: CallPurpose::Mutation(kind),
            })],
            Err(e) => {
                warn!(error = %e, "could not build mutation request");
                let action = kind.describe(Self::noun_of(&kind));
                self.state.error = Some(api::from_http_error(&e, &action).user_facing_message());
                Vec::new()
            }
        }
    }

    /// Applies a finished HTTP exchange.
    pub fn on_response(&mut self, purpose: CallPurpose, result: HttpResult) -> Vec<Followup> {
        if self.torn_down {
            debug!(resource = R::PLURAL, "response after teardown dropped");
            return Vec::new();
        }
        match purpose {
            CallPurpose::List { generation } => self.on_list(generation, result),
            CallPurpose::Detail { id } => self.on_detail(id, result),
            CallPurpose::Mutation(kind) => self.on_mutation(kind, result),
            CallPurpose::FilterOptions => self.on_filter_options(result),
            CallPurpose::Panel { generation } => self.on_panel(generation, result),
        }
    }

    fn on_list(&mut self, generation: u64, result: HttpResult) -> Vec<Followup> {
        if generation != self.generation {
            debug!(
                resource = R::PLURAL,
                generation,
                latest = self.generation,
                "discarding stale list response"
            );
            return Vec::new();
        }

        let listing = api::accept(result, &Self::list_action()).and_then(|body| {
            let listing = R::decode(&body)?;
            let summary = R::summary(&body, &listing.items);
            Ok((listing, summary))
        });

        let pending = self.pending.take().filter(|p| p.generation == generation);

        match listing {
            Ok((listing, summary)) => {
                if let Some(pending) = pending {
                    self.state.current_page = pending.page;
                    self.state.search_query = pending.query;
                }
                self.state.items = listing.items;
                self.state.summary = summary;
                let mut vanished = false;
                match self.paging {
                    Paging::Client { per_page } => {
                        self.state.total_count = self.visible().len() as u64;
                        self.state.total_pages = total_pages_for(self.state.total_count, per_page);
                        self.state.current_page =
                            self.state.current_page.clamp(1, self.state.total_pages);
                    }
                    Paging::Server { .. } => {
                        self.state.total_pages = listing.meta.total_pages.max(1);
                        self.state.total_count = listing.meta.total_count;
                        if self.state.current_page > self.state.total_pages {
                            self.state.current_page = self.state.total_pages;
                            vanished = true;
                        }
                    }
                }
                self.state.is_loading = false;
                self.state.error = None;
                self.state.phase = LoadPhase::Loaded;
                debug!(
                    resource = R::PLURAL,
                    rows = self.state.items.len(),
                    total_pages = self.state.total_pages,
                    "list loaded"
                );
                if vanished {
                    info!(
                        resource = R::PLURAL,
                        page = self.state.current_page,
                        "requested page no longer exists; loading the last one"
                    );
                    let query = self.state.search_query.clone();
                    return self.load(self.state.current_page, &query);
                }
                Vec::new()
            }
            Err(err) if err.is_session_expired() => {
                self.state.is_loading = false;
                self.state.phase = LoadPhase::Failed;
                vec![Followup::SessionExpired]
            }
            Err(err) => {
                warn!(resource = R::PLURAL, error = %err, "list fetch failed");
                self.fail_load(&err);
                Vec::new()
            }
        }
    }

    fn on_detail(&mut self, id: RecordId, result: HttpResult) -> Vec<Followup> {
        let waiting = self
            .modal
            .as_ref()
            .is_some_and(|m| m.editing == Some(id) && m.loading_detail);
        if !waiting {
            debug!(resource = R::PLURAL, %id, "detail for a closed dialog dropped");
            return Vec::new();
        }

        let action = format!("fetch {} details", R::NOUN);
        let record = api::accept(result, &action)
            .and_then(|body| api::decode_record::<R::Record>(&body));

        match record {
            Ok(record) => {
                let draft = draft_to_map(&R::draft_from(&record)).unwrap_or_default();
                if let Some(modal) = self.modal.as_mut() {
                    modal.draft = draft;
                    modal.loading_detail = false;
                }
                Vec::new()
            }
            Err(err) if err.is_session_expired() => {
                self.modal = None;
                vec![Followup::SessionExpired]
            }
            Err(err) => {
                warn!(resource = R::PLURAL, %id, error = %err, "detail fetch failed");
                self.modal = None;
                self.state.error = Some(err.user_facing_message());
                Vec::new()
            }
        }
    }

    fn on_mutation(&mut self, kind: MutationKind, result: HttpResult) -> Vec<Followup> {
        let noun = Self::noun_of(&kind);
        let action = kind.describe(noun);
        match api::accept(result, &action) {
            Ok(_) => {
                info!(resource = R::PLURAL, ?kind, "mutation succeeded");
                if kind.is_dialog() && self.modal.as_ref().is_some_and(|m| m.submitting) {
                    self.modal = None;
                }
                self.state.error = None;
                self.state.notice = Some(kind.success_notice(noun));
                match kind {
                    MutationKind::PanelRow { .. } => self.reload_panel(),
                    _ => self.refresh(),
                }
            }
            Err(err) if err.is_session_expired() => {
                if let Some(modal) = self.modal.as_mut() {
                    modal.submitting = false;
                }
                vec![Followup::SessionExpired]
            }
            Err(err) => {
                warn!(resource = R::PLURAL, ?kind, error = %err, "mutation failed");
                let message = err.user_facing_message();
                match self.modal.as_mut() {
                    Some(modal) if kind.is_dialog() => {
                        modal.submitting = false;
                        modal.validation_error = Some(message);
                    }
                    _ => self.state.error = Some(message),
                }
                Vec::new()
            }
        }
    }

    fn on_filter_options(&mut self, result: HttpResult) -> Vec<Followup> {
        let categories = api::accept(result, "fetch categories")
            .and_then(|body| api::decode_list::<Category>(&body));
        match categories {
            Ok(listing) => {
                self.category_options = listing
                    .items
                    .into_iter()
                    .map(|c| FilterOption {
                        value: c.id.to_string(),
                        label: c.name,
                    })
                    .collect();
                debug!(resource = R::PLURAL, options = self.category_options.len(), "categories loaded");
                Vec::new()
            }
            Err(err) if err.is_session_expired() => vec![Followup::SessionExpired],
            Err(err) => {
                warn!(resource = R::PLURAL, error = %err, "category list failed");
                self.state.error = Some(err.user_facing_message());
                Vec::new()
            }
        }
    }

    /// Opens the drill-down `name` for record `id`, replacing any panel
    /// already open.
    #[instrument(skip_all, fields(resource = R::PLURAL, id = %id, panel = name))]
    pub fn open_panel(&mut self, id: RecordId, name: &str) -> Result<Vec<Followup>, ControllerError> {
        let panel = *R::PANELS
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ControllerError::UnknownPanel(name.to_string()))?;
        let record = self.find(id).ok_or(ControllerError::UnknownRecord(id))?;
        let target = R::panel(record, name).ok_or_else(|| Self::unsupported("panel"))?;
        self.panel = Some(PanelState {
            panel,
            record: id,
            tab: panel.tabs.first().map(|t| (*t).to_string()).unwrap_or_default(),
            body: None,
            is_loading: false,
            error: None,
            generation: 0,
            target,
        });
        Ok(self.reload_panel())
    }

    /// Fetches the open panel again under a new generation.
    fn reload_panel(&mut self) -> Vec<Followup> {
        self.panel_generation += 1;
        let generation = self.panel_generation;
        let Some(panel) = self.panel.as_mut() else {
            return Vec::new();
        };
        panel.generation = generation;
        match panel.target.build(&self.session) {
            Ok(request) => {
                panel.is_loading = true;
                vec![Followup::Call(ApiCall {
                    request,
                    purpose: CallPurpose::Panel { generation },
                })]
            }
            Err(e) => {
                warn!(panel = panel.panel.name, error = %e, "could not build panel request");
                let action = format!("fetch {}", panel.panel.title.to_lowercase());
                panel.is_loading = false;
                panel.error = Some(api::from_http_error(&e, &action).user_facing_message());
                Vec::new()
            }
        }
    }

    pub fn select_panel_tab(&mut self, tab: &str) -> Result<Vec<Followup>, ControllerError> {
        let panel = self.panel.as_mut().ok_or(ControllerError::PanelClosed)?;
        if !panel.panel.tabs.contains(&tab) {
            return Err(ControllerError::UnknownTab(tab.to_string()));
        }
        panel.tab = tab.to_string();
        Ok(Vec::new())
    }

    pub fn close_panel(&mut self) -> Vec<Followup> {
        self.panel = None;
        Vec::new()
    }

    #[instrument(skip_all, fields(resource = R::PLURAL, row = %row))]
    pub fn remove_panel_row(&mut self, row: RecordId) -> Result<Vec<Followup>, ControllerError> {
        let panel = self.panel.as_ref().ok_or(ControllerError::PanelClosed)?;
        if !panel.panel.removable {
            return Err(Self::unsupported("panel delete"));
        }
        let name = panel.panel.name;
        let target = R::remove_panel_row(name, row).ok_or_else(|| Self::unsupported("panel delete"))?;
        Ok(self.mutate(
            &target,
            MutationKind::PanelRow {
                panel: name.to_string(),
                row,
            },
        ))
    }

    fn on_panel(&mut self, generation: u64, result: HttpResult) -> Vec<Followup> {
        let Some(panel) = self.panel.as_mut().filter(|p| p.generation == generation) else {
            debug!(resource = R::PLURAL, generation, "panel answer for a closed panel dropped");
            return Vec::new();
        };
        panel.is_loading = false;
        let action = format!("fetch {}", panel.panel.title.to_lowercase());
        match api::accept(result, &action) {
            Ok(body) => {
                panel.body = Some(body);
                panel.error = None;
                Vec::new()
            }
            Err(err) if err.is_session_expired() => {
                self.panel = None;
                vec![Followup::SessionExpired]
            }
            Err(err) => {
                warn!(panel = panel.panel.name, error = %err, "panel fetch failed");
                panel.error = Some(err.user_facing_message());
                Vec::new()
            }
        }
    }

    /// Cancels polling and closes the dialog and any panel. Nothing
    /// touches the state afterwards.
    pub fn teardown(&mut self) -> Vec<Followup> {
        info!(resource = R::PLURAL, mount = %self.mount, "tearing down list page");
        self.torn_down = true;
        self.modal = None;
        self.panel = None;
        self.stop_polling()
    }

    /// Records matching the current search, in server order. Resources
    /// searched by the server are shown as returned.
    fn visible(&self) -> Vec<&R::Record> {
        let needle = self.state.search_query.trim().to_lowercase();
        let local = !needle.is_empty() && R::search_param().is_none();
        self.state
            .items
            .iter()
            .filter(|r| !local || R::matches(r, &needle))
            .collect()
    }

    pub fn view(&self) -> PageView {
        let visible = self.visible();
        let (rows, total_pages, total_count): (Vec<&R::Record>, u32, u64) = match self.paging {
            Paging::Client { per_page } => {
                let count = visible.len() as u64;
                let pages = total_pages_for(count, per_page);
                let page = self.state.current_page.clamp(1, pages);
                let start = (page as usize - 1) * per_page as usize;
                let rows = visible.into_iter().skip(start).take(per_page as usize).collect();
                (rows, pages, count)
            }
            Paging::Server { .. } => (visible, self.state.total_pages, self.state.total_count),
        };

        PageView {
            page: R::PAGE,
            title: R::PAGE.title().to_string(),
            rows: rows
                .into_iter()
                .filter_map(|r| serde_json::to_value(r).ok())
                .collect(),
            current_page: self.state.current_page.min(total_pages),
            total_pages,
            total_count,
            search_query: self.state.search_query.clone(),
            filters: R::filters()
                .iter()
                .map(|f| {
                    let (kind, options) = match f.input {
                        FilterInput::Choice(values) => (
                            FilterKind::Choice,
                            values
                                .iter()
                                .map(|v| FilterOption {
                                    value: (*v).to_string(),
                                    label: (*v).to_string(),
                                })
                                .collect(),
                        ),
                        FilterInput::Date => (FilterKind::Date, Vec::new()),
                        FilterInput::Category => (FilterKind::Category, self.category_options.clone()),
                    };
                    FilterView {
                        name: f.name.to_string(),
                        label: f.label.to_string(),
                        kind,
                        value: self
                            .state
                            .filters
                            .get(f.name)
                            .cloned()
                            .unwrap_or_else(|| f.default.to_string()),
                        required: f.required,
                        options,
                    }
                })
                .collect(),
            summary: self.state.summary.clone(),
            is_loading: self.state.is_loading,
            phase: self.state.phase,
            error: self.state.error.clone(),
            notice: self.state.notice.clone(),
            modal: self.modal.as_ref().map(|m| ModalView {
                mode: m.mode,
                editing: m.editing,
                draft: m.draft.clone(),
                validation_error: m.validation_error.clone(),
                submitting: m.submitting,
                loading: m.loading_detail,
            }),
            can_create: R::OPERATIONS.create,
            can_edit: R::OPERATIONS.edit,
            can_delete: R::OPERATIONS.delete,
            toggles: R::OPERATIONS.toggles.iter().map(|t| (*t).to_string()).collect(),
            actions: R::OPERATIONS.actions.iter().map(|a| (*a).to_string()).collect(),
            panels: R::PANELS
                .iter()
                .map(|p| PanelLink {
                    name: p.name.to_string(),
                    title: p.title.to_string(),
                })
                .collect(),
            panel: self.panel.as_ref().map(|p| PanelView {
                name: p.panel.name.to_string(),
                title: p.panel.title.to_string(),
                record: p.record,
                tabs: p.panel.tabs.iter().map(|t| (*t).to_string()).collect(),
                tab: p.tab.clone(),
                rows: p
                    .body
                    .as_ref()
                    .map(|body| R::panel_rows(p.panel.name, &p.tab, body))
                    .unwrap_or_default(),
                is_loading: p.is_loading,
                error: p.error.clone(),
                can_remove: p.panel.removable,
            }),
        }
    }
}

impl<R: Resource> ListPage for ResourceListController<R> {
    fn page(&self) -> PageId {
        R::PAGE
    }

    fn mount_id(&self) -> MountId {
        self.mount
    }

    fn mount(&mut self) -> Vec<Followup> {
        ResourceListController::mount(self)
    }

    fn handle(&mut self, event: PageEvent) -> Result<Vec<Followup>, ControllerError> {
        if self.torn_down {
            return Err(ControllerError::TornDown);
        }
        match event {
            PageEvent::Search(query) => Ok(self.search(&query)),
            PageEvent::Filter { name, value } => self.set_filter(&name, value.as_deref()),
            PageEvent::ChangePage(page) => self.change_page(page),
            PageEvent::Refresh => Ok(self.refresh()),
            PageEvent::OpenCreate => self.open_create(),
            PageEvent::OpenEdit(id) => self.open_edit(id),
            PageEvent::EditDraft { field, value } => self.edit_draft(&field, value),
            PageEvent::CloseModal => Ok(self.close_modal()),
            PageEvent::Submit => self.submit(),
            PageEvent::Remove(id) => self.remove(id),
            PageEvent::Toggle { id, field } => self.toggle_field(id, &field),
            PageEvent::Action { id, action } => self.perform(id, &action),
            PageEvent::OpenPanel { id, panel } => self.open_panel(id, &panel),
            PageEvent::PanelTab(tab) => self.select_panel_tab(&tab),
            PageEvent::ClosePanel => Ok(self.close_panel()),
            PageEvent::RemovePanelRow(row) => self.remove_panel_row(row),
        }
    }

    fn on_response(&mut self, purpose: CallPurpose, result: HttpResult) -> Vec<Followup> {
        ResourceListController::on_response(self, purpose, result)
    }

    fn on_tick(&mut self, timer: TimerId) -> Vec<Followup> {
        ResourceListController::on_tick(self, timer)
    }

    fn teardown(&mut self) -> Vec<Followup> {
        ResourceListController::teardown(self)
    }

    fn dismiss_messages(&mut self) {
        self.state.error = None;
        self.state.notice = None;
        if let Some(panel) = self.panel.as_mut() {
            panel.error = None;
        }
    }

    fn view(&self) -> PageView {
        ResourceListController::view(self)
    }
}
