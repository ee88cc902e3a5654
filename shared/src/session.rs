use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::capabilities::http::{HttpError, HttpMethod, HttpRequest, HttpResult, ValidatedUrl};
use crate::capabilities::kv::{KeyNamespace, KvError, KvOperation};
use crate::config::Settings;
use crate::event::ValidationError;
use crate::{LOGIN_FAILED_MESSAGE, LOGIN_UNREACHABLE_MESSAGE};

pub const TOKEN_KEY: &str = "authToken";
pub const LOGIN_PATH: &str = "login";
pub const PROFILE_PATH: &str = "admin/admin-get";
pub const LOGOUT_PATH: &str = "admin/admin-logout";
pub const DEFAULT_ADMIN_NAME: &str = "Admin";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("bearer token is empty")]
    EmptyToken,
}

/// An authenticated connection to the admin API.
///
/// Cheap to clone; every list controller gets its own handle at
/// construction and attaches the bearer token to each request it builds.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    api_base: ValidatedUrl,
    token: SecretString,
    request_timeout: std::time::Duration,
}

impl Session {
    pub fn new(settings: &Settings, token: impl Into<String>) -> Result<Self, SessionError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(SessionError::EmptyToken);
        }
        Ok(Self {
            inner: Arc::new(SessionInner {
                api_base: settings.api_base.clone(),
                token: SecretString::new(token),
                request_timeout: settings.request_timeout,
            }),
        })
    }

    pub fn api_base(&self) -> &ValidatedUrl {
        &self.inner.api_base
    }

    /// Builds an authenticated request for `path`, relative to the API base.
    pub fn request(&self, method: HttpMethod, path: &str) -> Result<HttpRequest, HttpError> {
        let url = resolve(&self.inner.api_base, path)?;
        HttpRequest::new(method, url)
            .with_bearer(self.inner.token.expose_secret())?
            .with_timeout(self.inner.request_timeout)
    }

    pub fn profile_request(&self) -> Result<HttpRequest, HttpError> {
        self.request(HttpMethod::Get, PROFILE_PATH)
    }

    pub fn logout_request(&self) -> Result<HttpRequest, HttpError> {
        self.request(HttpMethod::Post, LOGOUT_PATH)?
            .with_json(&serde_json::json!({}))
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("api_base", &self.inner.api_base.as_str())
            .field("token", &"[REDACTED]")
            .finish()
    }
}

fn resolve(base: &ValidatedUrl, path: &str) -> Result<ValidatedUrl, HttpError> {
    if path.starts_with('/') || path.contains("://") || path.split('/').any(|s| s == "..") {
        return Err(HttpError::InvalidUrl {
            url: path.to_string(),
            reason: "endpoint paths must stay relative to the API base".to_string(),
        });
    }
    base.join(path)
}

/// Credentials typed into the login form.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginForm {
    pub mobile: String,
    pub password: String,
}

impl fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginForm")
            .field("mobile", &self.mobile)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.mobile.trim().is_empty() {
            return Err(ValidationError::Required { label: "Mobile" });
        }
        if self.password.is_empty() {
            return Err(ValidationError::Required { label: "Password" });
        }
        Ok(())
    }

    pub fn request(&self, settings: &Settings) -> Result<HttpRequest, HttpError> {
        let url = resolve(&settings.api_base, LOGIN_PATH)?;
        HttpRequest::new(HttpMethod::Post, url)
            .with_timeout(settings.request_timeout)?
            .with_json(&serde_json::json!({
                "mobile": self.mobile.trim(),
                "password": self.password,
            }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginGrant {
    pub token: String,
    pub role: Option<String>,
}

/// Reads the answer to a login attempt. `Err` carries the message to show
/// under the form.
pub fn read_login(result: &HttpResult) -> Result<LoginGrant, String> {
    let response = match result {
        Ok(response) => response,
        Err(_) => return Err(LOGIN_UNREACHABLE_MESSAGE.to_string()),
    };
    let body: Value = response.json().unwrap_or(Value::Null);

    let token = body
        .get("token")
        .and_then(Value::as_str)
        .filter(|t| !t.trim().is_empty());

    match (body.get("status").and_then(Value::as_str), token) {
        (Some("success"), Some(token)) if response.is_success() => Ok(LoginGrant {
            token: token.to_string(),
            role: body
                .pointer("/user/role")
                .and_then(Value::as_str)
                .map(str::to_string),
        }),
        _ => Err(body
            .get("message")
            .and_then(Value::as_str)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(LOGIN_FAILED_MESSAGE)
            .to_string()),
    }
}

/// Pulls the admin's display name out of a profile response.
pub fn read_profile_name(body: &Value) -> Option<String> {
    body.pointer("/data/name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

pub fn read_token_op() -> Result<KvOperation, KvError> {
    KvOperation::get(KeyNamespace::Session, TOKEN_KEY)
}

pub fn store_token_op(token: &str) -> Result<KvOperation, KvError> {
    KvOperation::set(KeyNamespace::Session, TOKEN_KEY, token.as_bytes().to_vec())
}

pub fn forget_token_op() -> Result<KvOperation, KvError> {
    KvOperation::delete(KeyNamespace::Session, TOKEN_KEY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::http::{HttpError, HttpResponse};
    use crate::config::ConsoleConfig;
    use serde_json::json;

    fn settings() -> Settings {
        ConsoleConfig {
            api_base_url: "https://liveapi.example.com/api/".into(),
            ..ConsoleConfig::default()
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn requests_carry_bearer_and_timeout() {
        let session = Session::new(&settings(), "tok-123").unwrap();
        let req = session
            .request(HttpMethod::Get, "admin/all-users-list")
            .unwrap();
        assert_eq!(
            req.url().as_str(),
            "https://liveapi.example.com/api/admin/all-users-list"
        );
        assert_eq!(req.headers().get("authorization"), Some("Bearer tok-123"));
        assert_eq!(req.timeout_ms(), 30_000);
    }

    #[test]
    fn paths_cannot_escape_the_api_base() {
        let session = Session::new(&settings(), "tok").unwrap();
        assert!(session.request(HttpMethod::Get, "/admin").is_err());
        assert!(session
            .request(HttpMethod::Get, "https://evil.example.com/x")
            .is_err());
        assert!(session.request(HttpMethod::Get, "../admin").is_err());
    }

    #[test]
    fn empty_token_is_rejected() {
        assert_eq!(
            Session::new(&settings(), "  ").unwrap_err(),
            SessionError::EmptyToken
        );
    }

    #[test]
    fn debug_output_hides_secrets() {
        let session = Session::new(&settings(), "super-secret").unwrap();
        assert!(!format!("{session:?}").contains("super-secret"));

        let form = LoginForm {
            mobile: "9876543210".into(),
            password: "hunter2".into(),
        };
        assert!(!format!("{form:?}").contains("hunter2"));
    }

    #[test]
    fn login_form_requires_both_fields() {
        let form = LoginForm {
            mobile: " ".into(),
            password: "x".into(),
        };
        assert_eq!(form.validate().unwrap_err().to_string(), "Mobile is required");

        let form = LoginForm {
            mobile: "9876543210".into(),
            password: String::new(),
        };
        assert_eq!(form.validate().unwrap_err().to_string(), "Password is required");
    }

    #[test]
    fn login_request_posts_credentials() {
        let form = LoginForm {
            mobile: "9876543210".into(),
            password: "pw".into(),
        };
        let req = form.request(&settings()).unwrap();
        assert_eq!(req.method(), HttpMethod::Post);
        assert_eq!(req.url().as_str(), "https://liveapi.example.com/api/login");
        assert_eq!(
            req.json_body(),
            Some(json!({"mobile": "9876543210", "password": "pw"}))
        );
        assert!(req.headers().get("authorization").is_none());
    }

    #[test]
    fn read_login_outcomes() {
        let ok = Ok(HttpResponse::from_json(
            200,
            &json!({"status": "success", "token": "abc", "user": {"role": "admin"}}),
        ));
        assert_eq!(
            read_login(&ok),
            Ok(LoginGrant {
                token: "abc".into(),
                role: Some("admin".into())
            })
        );

        let refused = Ok(HttpResponse::from_json(
            200,
            &json!({"status": "error", "message": "Invalid credentials"}),
        ));
        assert_eq!(read_login(&refused), Err("Invalid credentials".into()));

        let silent = Ok(HttpResponse::from_json(200, &json!({"status": "error"})));
        assert_eq!(read_login(&silent), Err(LOGIN_FAILED_MESSAGE.into()));

        let offline = Err(HttpError::ConnectionError {
            host: "liveapi.example.com".into(),
            message: "offline".into(),
        });
        assert_eq!(read_login(&offline), Err(LOGIN_UNREACHABLE_MESSAGE.into()));
    }

    #[test]
    fn profile_name_is_optional() {
        assert_eq!(
            read_profile_name(&json!({"status": 200, "data": {"name": "Ravi"}})),
            Some("Ravi".into())
        );
        assert_eq!(read_profile_name(&json!({"data": {"name": ""}})), None);
        assert_eq!(read_profile_name(&json!({})), None);
    }

    #[test]
    fn token_ops_use_the_session_namespace() {
        let op = store_token_op("abc").unwrap();
        assert_eq!(op.key().raw(), "session:authToken");
        assert!(matches!(read_token_op().unwrap(), KvOperation::Get { .. }));
        assert!(matches!(forget_token_op().unwrap(), KvOperation::Delete { .. }));
    }
}
