use tracing::{debug, info, warn};

use crate::api;
use crate::capabilities::{CapabilityError, Capabilities, HttpResult, KvResult, TimerOperation, TimerOutput};
use crate::controller::{ApiCall, Followup};
use crate::event::{Event, MountId, Route};
use crate::model::{Model, ViewModel};
use crate::resources::controller_for;
use crate::session::{self, LoginForm, Session};
use crate::{AppError, ErrorKind, SESSION_EXPIRED_MESSAGE};

#[derive(Default)]
pub struct App;

impl App {
    /// Carries out what a page controller asked for. Answers are tagged
    /// with `mount` so they can be dropped once the page is gone.
    fn run(model: &mut Model, caps: &Capabilities, mount: MountId, followups: Vec<Followup>) {
        let mut expired = false;
        for followup in followups {
            match followup {
                Followup::Call(ApiCall { request, purpose }) => {
                    request.send(&caps.http, move |result| Event::PageResponse {
                        mount,
                        purpose,
                        result: Box::new(result),
                    });
                }
                Followup::StartTimer { id, after } => match TimerOperation::start(id, after) {
                    Ok(op) => caps.timer.start(op, Event::PollFired),
                    Err(e) => warn!(timer = %id, error = %CapabilityError::from(e), "refresh timer not armed"),
                },
                Followup::CancelTimer(id) => caps.timer.cancel(id),
                Followup::SessionExpired => expired = true,
            }
        }
        if expired {
            Self::expire_session(model, caps);
        }
    }

    fn restore(model: &mut Model, caps: &Capabilities, result: KvResult) {
        model.restoring = false;
        let token = match result.and_then(|output| output.into_text()) {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %CapabilityError::from(e), "stored token unreadable");
                None
            }
        };
        match token {
            Some(token) => Self::begin_session(model, caps, token),
            None => {
                debug!("no stored token");
                model.route = Route::Login;
            }
        }
    }

    fn begin_session(model: &mut Model, caps: &Capabilities, token: String) {
        let Some(settings) = model.settings.as_ref() else {
            warn!("session started before configuration");
            return;
        };
        let session = match Session::new(settings, token) {
            Ok(session) => session,
            Err(e) => {
                warn!(error = %e, "token rejected");
                model.route = Route::Login;
                return;
            }
        };

        match session.profile_request() {
            Ok(request) => {
                request.send(&caps.http, |result| Event::ProfileResponse(Box::new(result)))
            }
            Err(e) => warn!(error = %CapabilityError::from(e), "profile request not built"),
        }

        info!("session started");
        model.session = Some(session);
        model.login_error = None;
        Self::navigate(model, caps, Route::Dashboard);
    }

    /// Leaves whatever is on screen: the list page is torn down, its timer
    /// cancelled and the dashboard visit forgotten.
    fn leave_current(model: &mut Model, caps: &Capabilities) {
        if let Some(mut page) = model.page.take() {
            let mount = page.mount_id();
            let followups = page.teardown();
            debug!(page = ?page.page(), %mount, "page torn down");
            Self::run(model, caps, mount, followups);
        }
        model.dashboard.leave();
    }

    fn navigate(model: &mut Model, caps: &Capabilities, route: Route) {
        let Some(session) = model.session.clone() else {
            if route != Route::Login {
                debug!(?route, "navigation ignored while signed out");
            }
            model.route = Route::Login;
            return;
        };
        if route == Route::Login {
            debug!("already signed in; log out to reach the login screen");
            return;
        }

        Self::leave_current(model, caps);
        model.route = route;

        match route {
            Route::Login => {}
            Route::Dashboard => Self::fetch_dashboard(model, caps, &session),
            Route::List(page) => {
                let mount = model.next_mount_id();
                let Some(settings) = model.settings.as_ref() else {
                    return;
                };
                let mut controller = controller_for(page, session, settings, mount);
                let followups = controller.mount();
                model.page = Some(controller);
                Self::run(model, caps, mount, followups);
            }
        }
    }

    fn fetch_dashboard(model: &mut Model, caps: &Capabilities, session: &Session) {
        let mount = model.next_mount_id();
        match model.dashboard.request(session, mount) {
            Ok(request) => request.send(&caps.http, move |result| Event::DashboardResponse {
                mount,
                result: Box::new(result),
            }),
            Err(e) => warn!(error = %CapabilityError::from(e), "dashboard request not built"),
        }
    }

    /// Signs out locally. With `tell_server` the API is told to revoke the
    /// token; nobody waits for the answer.
    fn end_session(model: &mut Model, caps: &Capabilities, tell_server: bool) {
        Self::leave_current(model, caps);

        if let Some(session) = model.session.take() {
            if tell_server {
                match session.logout_request() {
                    Ok(request) => {
                        request.send(&caps.http, |result| Event::LogoutResponse(Box::new(result)))
                    }
                    Err(e) => warn!(error = %CapabilityError::from(e), "logout request not built"),
                }
            }
        }

        match session::forget_token_op() {
            Ok(op) => op.run(&caps.kv, |result| Event::TokenForgotten(Box::new(result))),
            Err(e) => warn!(error = %CapabilityError::from(e), "token not cleared"),
        }

        model.route = Route::Login;
        model.admin_name = None;
        model.login_error = None;
        model.logging_in = false;
    }

    fn expire_session(model: &mut Model, caps: &Capabilities) {
        if !model.is_signed_in() {
            return;
        }
        warn!("session expired");
        Self::end_session(model, caps, false);
        model.set_error(AppError::new(ErrorKind::Authentication, SESSION_EXPIRED_MESSAGE));
    }

    fn submit_login(model: &mut Model, caps: &Capabilities, form: LoginForm) {
        let Some(settings) = model.settings.as_ref() else {
            warn!("login attempted before configuration");
            return;
        };
        if let Err(e) = form.validate() {
            model.login_error = Some(e.to_string());
            return;
        }
        match form.request(settings) {
            Ok(request) => {
                model.logging_in = true;
                model.login_error = None;
                request.send(&caps.http, |result| Event::LoginResponse(Box::new(result)));
            }
            Err(e) => {
                let err = api::from_http_error(&e, "log in");
                model.login_error = Some(err.user_facing_message());
            }
        }
    }

    fn finish_login(model: &mut Model, caps: &Capabilities, result: HttpResult) {
        model.logging_in = false;
        match session::read_login(&result) {
            Ok(grant) => {
                info!(role = grant.role.as_deref().unwrap_or("unknown"), "login succeeded");
                match session::store_token_op(&grant.token) {
                    Ok(op) => op.run(&caps.kv, |result| Event::TokenStored(Box::new(result))),
                    Err(e) => warn!(error = %CapabilityError::from(e), "token not persisted"),
                }
                Self::begin_session(model, caps, grant.token);
            }
            Err(message) => {
                info!(%message, "login refused");
                model.login_error = Some(message);
            }
        }
    }

    fn on_profile(model: &mut Model, caps: &Capabilities, result: HttpResult) {
        if !model.is_signed_in() {
            return;
        }
        match api::accept(result, "fetch profile") {
            Ok(body) => model.admin_name = session::read_profile_name(&body),
            Err(e) if e.is_session_expired() => Self::expire_session(model, caps),
            Err(e) => warn!(error = %e, "profile fetch failed"),
        }
    }

    fn on_tick(model: &mut Model, caps: &Capabilities, output: TimerOutput) {
        let Some(id) = output.fired_id() else {
            return;
        };
        let mount = MountId(id.mount);
        let followups = match model.page.as_mut() {
            Some(page) if page.mount_id() == mount => page.on_tick(id),
            _ => {
                debug!(timer = %id, "tick for a page no longer shown");
                return;
            }
        };
        Self::run(model, caps, mount, followups);
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        if event.is_user_initiated() {
            debug!(event = event.name(), "user action");
        }

        match event {
            Event::Startup(config) => match config.validate() {
                Ok(settings) => {
                    info!(api = settings.api_base.as_str(), "console starting");
                    model.settings = Some(settings);
                    match session::read_token_op() {
                        Ok(op) => {
                            model.restoring = true;
                            op.run(&caps.kv, |result| Event::TokenLoaded(Box::new(result)));
                        }
                        Err(e) => {
                            warn!(error = %CapabilityError::from(e), "token lookup not built");
                            model.route = Route::Login;
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "invalid configuration");
                    model.set_error(e.into());
                }
            },

            Event::TokenLoaded(result) => Self::restore(model, caps, *result),

            Event::TokenStored(result) | Event::TokenForgotten(result) => {
                if let Err(e) = *result {
                    warn!(error = %CapabilityError::from(e), "token storage failed");
                }
            }

            Event::LoginSubmitted(form) => Self::submit_login(model, caps, form),

            Event::LoginResponse(result) => Self::finish_login(model, caps, *result),

            Event::ProfileResponse(result) => Self::on_profile(model, caps, *result),

            Event::Logout => {
                info!("logging out");
                Self::end_session(model, caps, true);
                model.clear_error();
            }

            Event::LogoutResponse(result) => {
                if let Err(e) = api::accept(*result, "log out") {
                    debug!(error = %e, "logout call failed");
                }
            }

            Event::Navigate(route) => Self::navigate(model, caps, route),

            Event::Page(page_event) => {
                let Some(page) = model.page.as_mut() else {
                    debug!(event = page_event.name(), "no list page mounted");
                    return;
                };
                let mount = page.mount_id();
                match page.handle(page_event) {
                    Ok(followups) => Self::run(model, caps, mount, followups),
                    Err(e) => {
                        warn!(error = %e, "page event refused");
                        model.set_error(e.into());
                    }
                }
            }

            Event::PageResponse {
                mount,
                purpose,
                result,
            } => {
                let followups = match model.page.as_mut() {
                    Some(page) if page.mount_id() == mount => page.on_response(purpose, *result),
                    _ => {
                        debug!(%mount, ?purpose, "dropping response for a page no longer shown");
                        return;
                    }
                };
                Self::run(model, caps, mount, followups);
            }

            Event::PollFired(output) => Self::on_tick(model, caps, output),

            Event::RefreshDashboard => {
                if model.route == Route::Dashboard {
                    if let Some(session) = model.session.clone() {
                        Self::fetch_dashboard(model, caps, &session);
                    }
                }
            }

            Event::DashboardResponse { mount, result } => {
                let followups = model.dashboard.on_response(mount, *result);
                Self::run(model, caps, mount, followups);
            }

            Event::DismissError => {
                model.clear_error();
                model.login_error = None;
                model.dashboard.dismiss_error();
                if let Some(page) = model.page.as_mut() {
                    page.dismiss_messages();
                }
            }
        }

        caps.render.render();
    }

    fn view(&self, model: &Model) -> ViewModel {
        ViewModel::from_model(model)
    }
}
