//! What a list page needs to know about one API collection.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::api::{self, Listing};
use crate::capabilities::http::{HttpError, HttpMethod, HttpRequest};
use crate::event::{RecordId, ValidationError};
use crate::model::Figure;
use crate::resources::PageId;
use crate::session::Session;
use crate::AppError;

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Empty,
    Json(Value),
    Form(Vec<(String, String)>),
}

/// An endpoint call described relative to the API base. Turned into an
/// authenticated [`HttpRequest`] by [`Target::build`].
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    method: HttpMethod,
    path: String,
    query: Vec<(String, String)>,
    payload: Payload,
}

impl Target {
    fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            payload: Payload::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((name.into(), value.to_string()));
        self
    }

    /// Adds a parameter where the method carries them: the query string
    /// for GET and DELETE, a JSON object body otherwise.
    #[must_use]
    pub fn param(mut self, name: &str, value: impl ToString) -> Self {
        match self.method {
            HttpMethod::Get | HttpMethod::Delete => self.query(name, value),
            _ => {
                let mut body = match std::mem::replace(&mut self.payload, Payload::Empty) {
                    Payload::Json(Value::Object(fields)) => fields,
                    _ => Map::new(),
                };
                body.insert(name.to_string(), Value::String(value.to_string()));
                self.payload = Payload::Json(Value::Object(body));
                self
            }
        }
    }

    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.payload = Payload::Json(body);
        self
    }

    #[must_use]
    pub fn form<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        self.payload = Payload::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.to_string()))
                .collect(),
        );
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn build(&self, session: &Session) -> Result<HttpRequest, HttpError> {
        let mut request = session.request(self.method, &self.path)?;
        if !self.query.is_empty() {
            request = request.with_query(self.query.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;
        }
        match &self.payload {
            Payload::Empty => Ok(request),
            Payload::Json(body) => request.with_json(body),
            Payload::Form(fields) => {
                request.with_form(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            }
        }
    }
}

/// Where paging happens. Client-paged lists are fetched whole and sliced
/// for display; server-paged lists send `page` (and `per_page` when set).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paging {
    Client { per_page: u32 },
    Server { per_page: Option<u32> },
}

/// How the admin picks a filter's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterInput {
    Choice(&'static [&'static str]),
    /// A calendar day, `YYYY-MM-DD`.
    Date,
    /// A game category id, offered from the category list.
    Category,
}

/// A server-side filter. Non-empty values are sent with every list fetch;
/// while a required filter is empty nothing is fetched at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Filter {
    pub name: &'static str,
    pub label: &'static str,
    pub input: FilterInput,
    pub default: &'static str,
    pub required: bool,
}

impl Filter {
    pub const fn choice(
        name: &'static str,
        label: &'static str,
        values: &'static [&'static str],
        default: &'static str,
    ) -> Self {
        Self {
            name,
            label,
            input: FilterInput::Choice(values),
            default,
            required: false,
        }
    }

    pub const fn date(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            input: FilterInput::Date,
            default: "",
            required: true,
        }
    }

    pub const fn category(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            input: FilterInput::Category,
            default: "",
            required: true,
        }
    }

    #[must_use]
    pub const fn required(self) -> Self {
        Self {
            required: true,
            ..self
        }
    }

    /// Whether `value` may be selected. The default is always accepted.
    pub fn accepts(&self, value: &str) -> bool {
        if value == self.default {
            return true;
        }
        match self.input {
            FilterInput::Choice(values) => values.contains(&value),
            FilterInput::Date => is_calendar_date(value),
            FilterInput::Category => value.parse::<u64>().is_ok_and(|id| id > 0),
        }
    }
}

/// A drill-down listing fetched on demand for one record, such as a
/// user's bets. Tabs are local views over the fetched rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Panel {
    pub name: &'static str,
    pub title: &'static str,
    /// What one row is called in notices.
    pub noun: &'static str,
    pub tabs: &'static [&'static str],
    pub removable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModalMode {
    Create,
    Edit,
}

/// Form state for resources without a create/edit dialog.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct NoDraft {}

/// What a resource lets the admin do besides reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operations {
    pub create: bool,
    pub edit: bool,
    pub delete: bool,
    pub toggles: &'static [&'static str],
    pub actions: &'static [&'static str],
}

impl Operations {
    pub const READ_ONLY: Self = Self {
        create: false,
        edit: false,
        delete: false,
        toggles: &[],
        actions: &[],
    };
}

/// One API collection backing a list page.
///
/// Endpoint builders return `None` when the collection has no such
/// endpoint; [`Resource::OPERATIONS`] must agree with them.
pub trait Resource: 'static {
    type Record: DeserializeOwned + Serialize + Clone + fmt::Debug + Send + 'static;
    type Draft: DeserializeOwned + Serialize + Default + fmt::Debug;

    const PAGE: PageId;
    const NOUN: &'static str;
    const PLURAL: &'static str;
    const OPERATIONS: Operations;

    /// Whether the page refreshes itself on the poll interval.
    const POLLS: bool = true;

    /// Drill-downs offered on each row.
    const PANELS: &'static [Panel] = &[];

    fn list() -> Target;

    /// Reads the records out of a list response.
    fn decode(body: &Value) -> Result<Listing<Self::Record>, AppError> {
        api::decode_list(body)
    }

    /// A figure shown above the table, computed from the same response.
    fn summary(_body: &Value, _records: &[Self::Record]) -> Option<Figure> {
        None
    }

    fn paging(page_size: u32) -> Paging {
        Paging::Client {
            per_page: page_size,
        }
    }

    fn search_param() -> Option<&'static str> {
        None
    }

    fn filters() -> &'static [Filter] {
        &[]
    }

    fn id(record: &Self::Record) -> RecordId;

    /// Client-side search; `needle` is already lower-cased and trimmed.
    fn matches(record: &Self::Record, needle: &str) -> bool;

    fn detail(_id: RecordId) -> Option<Target> {
        None
    }

    fn draft_from(record: &Self::Record) -> Self::Draft;

    fn validate(_draft: &Self::Draft, _mode: ModalMode) -> Result<(), ValidationError> {
        Ok(())
    }

    fn create(_draft: &Self::Draft) -> Option<Target> {
        None
    }

    fn update(_id: RecordId, _draft: &Self::Draft) -> Option<Target> {
        None
    }

    fn delete(_id: RecordId) -> Option<Target> {
        None
    }

    fn toggle(_record: &Self::Record, _field: &str) -> Option<Target> {
        None
    }

    fn action(_record: &Self::Record, _action: &str) -> Option<Target> {
        None
    }

    fn panel(_record: &Self::Record, _panel: &str) -> Option<Target> {
        None
    }

    /// Rows of an opened panel under `tab` (empty for untabbed panels).
    fn panel_rows(_panel: &str, _tab: &str, _body: &Value) -> Vec<Value> {
        Vec::new()
    }

    fn remove_panel_row(_panel: &str, _row: RecordId) -> Option<Target> {
        None
    }
}

/// Case-insensitive substring test against an already lower-cased needle.
#[must_use]
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

/// `HH:MM` on a 24-hour clock; a trailing `:SS` is tolerated since the API
/// echoes times back with seconds.
#[must_use]
pub fn is_clock_time(value: &str) -> bool {
    let mut parts = value.trim().split(':');
    let (Some(h), Some(m)) = (parts.next(), parts.next()) else {
        return false;
    };
    let seconds_ok = match parts.next() {
        None => true,
        Some(s) => s.len() == 2 && s.parse::<u8>().is_ok_and(|s| s < 60),
    };
    parts.next().is_none()
        && seconds_ok
        && h.len() == 2
        && m.len() == 2
        && h.parse::<u8>().is_ok_and(|h| h < 24)
        && m.parse::<u8>().is_ok_and(|m| m < 60)
}

/// `YYYY-MM-DD` naming a real day.
#[must_use]
pub fn is_calendar_date(value: &str) -> bool {
    let mut parts = value.split('-');
    let (Some(y), Some(m), Some(d), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    if y.len() != 4 || m.len() != 2 || d.len() != 2 {
        return false;
    }
    let (Ok(year), Ok(month), Ok(day)) = (y.parse::<u32>(), m.parse::<u32>(), d.parse::<u32>()) else {
        return false;
    };
    let leap = (year % 4 == 0 && year % 100 != 0) || year % 400 == 0;
    let days = match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if leap => 29,
        2 => 28,
        _ => return false,
    };
    (1..=days).contains(&day)
}

/// The array under `value`, or nothing.
#[must_use]
pub fn rows_of(value: Option<&Value>) -> Vec<Value> {
    value
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

pub fn require(value: &str, label: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Required { label })
    } else {
        Ok(())
    }
}

/// Parses a money amount typed into a form; it must be a finite number
/// above zero.
pub fn positive_amount(value: &str) -> Result<f64, ValidationError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite() && *amount > 0.0)
        .ok_or(ValidationError::InvalidAmount)
}

/// Serialises a draft into the editable field map kept by the modal.
pub fn draft_to_map<D: Serialize>(draft: &D) -> Result<Map<String, Value>, serde_json::Error> {
    match serde_json::to_value(draft)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}
