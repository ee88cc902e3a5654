use crux_core::testing::{AppTester, Update};
use crux_core::Request;
use crux_http::protocol::{HttpRequest, HttpResponse, HttpResult};
use serde_json::{json, Value};

use satta_admin::capabilities::{KvOutput, TimerOperation, TimerOutput};
use satta_admin::config::ConsoleConfig;
use satta_admin::event::{PageEvent, RecordId, Route};
use satta_admin::resources::PageId;
use satta_admin::session::LoginForm;
use satta_admin::{App, Effect, Event, Model, SESSION_EXPIRED_MESSAGE};

type Tester = AppTester<App, Effect>;

/// Feeds follow-up events back into the app and gathers every effect.
fn settle(app: &Tester, model: &mut Model, update: Update<Effect, Event>) -> Vec<Effect> {
    let mut effects = update.effects;
    for event in update.events {
        let next = app.update(event, model);
        effects.extend(settle(app, model, next));
    }
    effects
}

fn http(effects: Vec<Effect>) -> Vec<Request<HttpRequest>> {
    effects.into_iter().filter_map(Effect::into_http).collect()
}

/// Key/value operations in their debug form, e.g. `Delete { key: .. }`.
fn kv(effects: &[Effect]) -> Vec<String> {
    effects
        .iter()
        .filter_map(|e| match e {
            Effect::KeyValue(request) => Some(format!("{:?}", request.operation)),
            _ => None,
        })
        .collect()
}

fn url(request: &Request<HttpRequest>) -> String {
    request.operation.url.clone()
}

fn header(request: &Request<HttpRequest>, name: &str) -> Option<String> {
    request
        .operation
        .headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.clone())
}

fn body(request: &Request<HttpRequest>) -> Option<Value> {
    serde_json::from_slice(&request.operation.body).ok()
}

fn find<'a>(requests: &'a mut [Request<HttpRequest>], path: &str) -> &'a mut Request<HttpRequest> {
    requests
        .iter_mut()
        .find(|r| url(r).contains(path))
        .unwrap_or_else(|| panic!("no request to {path}"))
}

fn reply(
    app: &Tester,
    model: &mut Model,
    request: &mut Request<HttpRequest>,
    status: u16,
    body: Value,
) -> Vec<Effect> {
    let response = HttpResponse::status(status).body(body.to_string()).build();
    let update = app
        .resolve(request, HttpResult::Ok(response))
        .expect("http request resolves");
    settle(app, model, update)
}

fn listing(rows: Value) -> Value {
    json!({ "status": "success", "data": rows })
}

/// Starts the console and answers the token lookup with `stored`.
fn start(app: &Tester, model: &mut Model, stored: Option<&str>) -> Vec<Effect> {
    let update = app.update(Event::Startup(ConsoleConfig::default()), model);
    let lookups = kv(&update.effects);
    assert!(lookups
        .iter()
        .any(|op| op.starts_with("Get") && op.contains("session:authToken")));
    assert!(model.restoring);

    let token = stored.map(|t| t.as_bytes().to_vec());
    let update = app.update(Event::TokenLoaded(Box::new(Ok(KvOutput::Value(token)))), model);
    settle(app, model, update)
}

/// Starts the console with a stored token; returns the requests the
/// restored session issued.
fn signed_in(app: &Tester, model: &mut Model) -> Vec<Request<HttpRequest>> {
    http(start(app, model, Some("tok-123")))
}

fn open(app: &Tester, model: &mut Model, page: PageId) -> Vec<Request<HttpRequest>> {
    let update = app.update(Event::Navigate(Route::List(page)), model);
    http(settle(app, model, update))
}

fn page_event(app: &Tester, model: &mut Model, event: PageEvent) -> Vec<Effect> {
    let update = app.update(Event::Page(event), model);
    settle(app, model, update)
}

#[test]
fn stored_token_restores_the_session() {
    let app = Tester::default();
    let mut model = Model::default();

    let mut requests = signed_in(&app, &mut model);
    assert!(model.is_signed_in());
    assert_eq!(model.route, Route::Dashboard);

    let profile = find(&mut requests, "admin/admin-get");
    assert_eq!(header(profile, "Authorization").as_deref(), Some("Bearer tok-123"));
    assert!(header(profile, "X-Request-Id").is_some());
    reply(&app, &mut model, profile, 200, json!({"data": {"name": "Asha"}}));
    assert_eq!(app.view(&model).admin_name, "Asha");

    let dashboard = find(&mut requests, "admin/admin-dashboard");
    reply(
        &app,
        &mut model,
        dashboard,
        200,
        json!({"data": {"total_user": 42}}),
    );
    let view = app.view(&model);
    let cards = view.dashboard.expect("dashboard shown").cards;
    assert!(cards.iter().any(|c| c.value == "42"));
}

#[test]
fn login_stores_token_and_logout_forgets_it() {
    let app = Tester::default();
    let mut model = Model::default();

    start(&app, &mut model, None);
    assert_eq!(model.route, Route::Login);
    assert!(!model.restoring);

    let form = LoginForm {
        mobile: "9000000000".into(),
        password: "secret".into(),
    };
    let update = app.update(Event::LoginSubmitted(form), &mut model);
    assert!(model.logging_in);
    let mut login = http(update.effects);
    let request = find(&mut login, "login");
    assert_eq!(request.operation.method, "POST");
    assert_eq!(
        body(request),
        Some(json!({"mobile": "9000000000", "password": "secret"}))
    );

    let effects = reply(
        &app,
        &mut model,
        request,
        200,
        json!({"status": "success", "token": "tok-9", "user": {"role": "admin"}}),
    );
    let stored = format!("{:?}", b"tok-9".to_vec());
    assert!(kv(&effects)
        .iter()
        .any(|op| op.starts_with("Set") && op.contains("session:authToken") && op.contains(&stored)));
    assert!(model.is_signed_in());
    assert_eq!(model.route, Route::Dashboard);

    let update = app.update(Event::Logout, &mut model);
    let effects = update.effects;
    assert!(kv(&effects).iter().any(|op| op.starts_with("Delete")));
    let mut calls = http(effects);
    let logout = find(&mut calls, "admin/admin-logout");
    assert_eq!(header(logout, "Authorization").as_deref(), Some("Bearer tok-9"));
    assert!(!model.is_signed_in());
    assert_eq!(model.route, Route::Login);
}

#[test]
fn refused_login_shows_the_server_message() {
    let app = Tester::default();
    let mut model = Model::default();
    app.update(Event::Startup(ConsoleConfig::default()), &mut model);

    let form = LoginForm {
        mobile: "9000000000".into(),
        password: "wrong".into(),
    };
    let mut calls = http(app.update(Event::LoginSubmitted(form), &mut model).effects);
    reply(
        &app,
        &mut model,
        &mut calls[0],
        401,
        json!({"status": "error", "message": "Invalid credentials"}),
    );

    assert!(!model.is_signed_in());
    assert!(!model.logging_in);
    assert_eq!(
        app.view(&model).login_error.as_deref(),
        Some("Invalid credentials")
    );
}

#[test]
fn unauthorised_list_answer_ends_the_session() {
    let app = Tester::default();
    let mut model = Model::default();
    signed_in(&app, &mut model);

    let mut calls = open(&app, &mut model, PageId::Users);
    let list = find(&mut calls, "admin/all-users-list");
    let effects = reply(&app, &mut model, list, 401, json!({"message": "Unauthenticated."}));

    assert!(kv(&effects).iter().any(|op| op.starts_with("Delete")));
    assert!(effects.iter().any(|e| matches!(
        e,
        Effect::Timer(r) if matches!(r.operation, TimerOperation::Cancel { .. })
    )));
    assert!(!model.is_signed_in());
    assert!(model.page.is_none());

    let view = app.view(&model);
    assert_eq!(view.route, Route::Login);
    assert_eq!(view.error.expect("error shown").message, SESSION_EXPIRED_MESSAGE);
}

#[test]
fn users_are_searched_locally() {
    let app = Tester::default();
    let mut model = Model::default();
    signed_in(&app, &mut model);

    let mut calls = open(&app, &mut model, PageId::Users);
    let list = find(&mut calls, "admin/all-users-list");
    reply(
        &app,
        &mut model,
        list,
        200,
        listing(json!([
            {"id": 1, "name": "Rahul Kumar", "mobile": "9000000001", "status": "0"},
            {"id": 2, "name": "Priya", "mobile": "9000000002", "status": "0"},
            {"id": 3, "name": "Amit", "mobile": "9111111111", "status": "1"}
        ])),
    );
    assert_eq!(app.view(&model).page.expect("page").rows.len(), 3);

    let mut calls = http(page_event(&app, &mut model, PageEvent::Search("rahul".into())));
    let list = find(&mut calls, "admin/all-users-list");
    assert!(!url(list).contains("rahul"));
    reply(
        &app,
        &mut model,
        list,
        200,
        listing(json!([
            {"id": 1, "name": "Rahul Kumar", "mobile": "9000000001", "status": "0"},
            {"id": 2, "name": "Priya", "mobile": "9000000002", "status": "0"}
        ])),
    );

    let page = app.view(&model).page.expect("page");
    assert_eq!(page.search_query, "rahul");
    assert_eq!(page.rows.len(), 1);
    assert_eq!(page.rows[0]["name"], "Rahul Kumar");
}

#[test]
fn category_toggle_flips_and_refetches() {
    let app = Tester::default();
    let mut model = Model::default();
    signed_in(&app, &mut model);

    let mut calls = open(&app, &mut model, PageId::Categories);
    let list = find(&mut calls, "admin/get-all-category-list");
    reply(
        &app,
        &mut model,
        list,
        200,
        listing(json!([{"id": 7, "name": "Gali", "active": 1}])),
    );

    let toggle = PageEvent::Toggle {
        id: RecordId(7),
        field: "active".into(),
    };
    let mut calls = http(page_event(&app, &mut model, toggle.clone()));
    let put = find(&mut calls, "admin/update-active/7");
    assert_eq!(body(put), Some(json!({"active": 0})));

    let mut calls = http(reply(
        &app,
        &mut model,
        put,
        200,
        json!({"status": "success", "message": "Updated"}),
    ));
    let list = find(&mut calls, "admin/get-all-category-list");
    reply(
        &app,
        &mut model,
        list,
        200,
        listing(json!([{"id": 7, "name": "Gali", "active": "0"}])),
    );
    assert_eq!(app.view(&model).page.expect("page").rows[0]["active"], 0);

    let mut calls = http(page_event(&app, &mut model, toggle));
    let put = find(&mut calls, "admin/update-active/7");
    assert_eq!(body(put), Some(json!({"active": 1})));
}

#[test]
fn add_money_rejects_non_positive_amounts() {
    let app = Tester::default();
    let mut model = Model::default();
    signed_in(&app, &mut model);

    let mut calls = open(&app, &mut model, PageId::MoneyCredits);
    let list = find(&mut calls, "admin/all-money-added-list");
    assert!(url(list).contains("page=1"));
    assert!(url(list).contains("per_page=10"));

    page_event(&app, &mut model, PageEvent::OpenCreate);
    page_event(
        &app,
        &mut model,
        PageEvent::EditDraft {
            field: "mobile".into(),
            value: json!("9000000001"),
        },
    );
    page_event(
        &app,
        &mut model,
        PageEvent::EditDraft {
            field: "amount".into(),
            value: json!("0"),
        },
    );

    let effects = page_event(&app, &mut model, PageEvent::Submit);
    assert!(http(effects).is_empty());
    let modal = app.view(&model).page.and_then(|p| p.modal).expect("modal");
    assert_eq!(
        modal.validation_error.as_deref(),
        Some("Please enter a valid amount.")
    );
    assert!(!modal.submitting);
}

#[test]
fn removing_a_record_refetches_the_list() {
    let app = Tester::default();
    let mut model = Model::default();
    signed_in(&app, &mut model);

    let mut calls = open(&app, &mut model, PageId::Categories);
    let list = find(&mut calls, "admin/get-all-category-list");
    reply(
        &app,
        &mut model,
        list,
        200,
        listing(json!([{"id": 1, "name": "Gali"}, {"id": 2, "name": "Desawar"}])),
    );

    let mut calls = http(page_event(&app, &mut model, PageEvent::Remove(RecordId(2))));
    let delete = find(&mut calls, "admin/delete-category/2");
    let mut calls = http(reply(
        &app,
        &mut model,
        delete,
        200,
        json!({"status": "success"}),
    ));
    let list = find(&mut calls, "admin/get-all-category-list");
    reply(
        &app,
        &mut model,
        list,
        200,
        listing(json!([{"id": 1, "name": "Gali"}])),
    );

    let page = app.view(&model).page.expect("page");
    assert_eq!(page.rows.len(), 1);
    assert_eq!(page.notice.as_deref(), Some("Category deleted successfully."));
}

#[test]
fn older_list_answers_are_discarded() {
    let app = Tester::default();
    let mut model = Model::default();
    signed_in(&app, &mut model);

    let mut first = open(&app, &mut model, PageId::Withdrawals);
    let mut second = http(page_event(&app, &mut model, PageEvent::Search("9000".into())));
    let newer = find(&mut second, "admin/all-withdrawal-list");
    assert!(url(newer).contains("search=9000"));

    reply(
        &app,
        &mut model,
        newer,
        200,
        listing(json!({"data": [{"id": 5, "user_name": "Rahul"}], "last_page": 1, "total": 1})),
    );
    let older = find(&mut first, "admin/all-withdrawal-list");
    reply(
        &app,
        &mut model,
        older,
        200,
        listing(json!({"data": [{"id": 8, "user_name": "Other"}], "last_page": 3, "total": 30})),
    );

    let page = app.view(&model).page.expect("page");
    assert_eq!(page.rows.len(), 1);
    assert_eq!(page.rows[0]["id"], 5);
    assert_eq!(page.total_pages, 1);
}

#[test]
fn ticks_from_a_left_page_are_ignored() {
    let app = Tester::default();
    let mut model = Model::default();
    signed_in(&app, &mut model);

    let update = app.update(Event::Navigate(Route::List(PageId::Users)), &mut model);
    let mut timer = update
        .effects
        .into_iter()
        .find_map(|e| match e {
            Effect::Timer(r) if matches!(r.operation, TimerOperation::Start { .. }) => Some(r),
            _ => None,
        })
        .expect("refresh timer armed");
    let id = match timer.operation {
        TimerOperation::Start { id, .. } => id,
        TimerOperation::Cancel { .. } => unreachable!(),
    };

    open(&app, &mut model, PageId::Categories);
    assert_eq!(model.page.as_ref().map(|p| p.page()), Some(PageId::Categories));

    let update = app
        .resolve(&mut timer, TimerOutput::Fired { id })
        .expect("timer resolves");
    let effects = settle(&app, &mut model, update);
    assert!(http(effects).is_empty());
}

#[test]
fn field_errors_are_joined_in_the_dialog() {
    let app = Tester::default();
    let mut model = Model::default();
    signed_in(&app, &mut model);
    open(&app, &mut model, PageId::Users);

    page_event(&app, &mut model, PageEvent::OpenCreate);
    for (field, value) in [
        ("name", "Rahul"),
        ("email", "rahul@example.com"),
        ("mobile", "9000000001"),
        ("password", "secret1"),
        ("confirm_password", "secret1"),
    ] {
        page_event(
            &app,
            &mut model,
            PageEvent::EditDraft {
                field: field.into(),
                value: json!(value),
            },
        );
    }

    let mut calls = http(page_event(&app, &mut model, PageEvent::Submit));
    let create = find(&mut calls, "admin/add-new-users");
    reply(
        &app,
        &mut model,
        create,
        422,
        json!({
            "message": "The given data was invalid.",
            "errors": {
                "email": ["The email has already been taken."],
                "mobile": ["The mobile has already been taken."]
            }
        }),
    );

    let modal = app.view(&model).page.and_then(|p| p.modal).expect("modal stays open");
    assert_eq!(
        modal.validation_error.as_deref(),
        Some("The email has already been taken.\nThe mobile has already been taken.")
    );
    assert!(!modal.submitting);
}

#[test]
fn out_of_range_page_is_reported() {
    let app = Tester::default();
    let mut model = Model::default();
    signed_in(&app, &mut model);
    open(&app, &mut model, PageId::Categories);

    let effects = page_event(&app, &mut model, PageEvent::ChangePage(4));
    assert!(http(effects).is_empty());
    assert!(matches!(app.view(&model).error, Some(_)));

    app.update(Event::DismissError, &mut model);
    assert!(app.view(&model).error.is_none());
}

fn credits(ids: &[u64], last_page: u32) -> Value {
    let rows: Vec<Value> = ids
        .iter()
        .map(|id| json!({"id": id, "amount": "100", "user_name": format!("user {id}")}))
        .collect();
    listing(json!({"data": rows, "last_page": last_page, "total": u64::from(last_page) * 10}))
}

#[test]
fn failed_page_change_keeps_the_page_on_screen() {
    let app = Tester::default();
    let mut model = Model::default();
    signed_in(&app, &mut model);

    let mut calls = open(&app, &mut model, PageId::MoneyCredits);
    let list = find(&mut calls, "admin/all-money-added-list");
    reply(&app, &mut model, list, 200, credits(&[1, 2], 3));

    let mut calls = http(page_event(&app, &mut model, PageEvent::ChangePage(2)));
    let list = find(&mut calls, "admin/all-money-added-list");
    assert!(url(list).contains("page=2&"));
    reply(&app, &mut model, list, 500, json!({"message": "Server Error"}));

    let page = app.view(&model).page.expect("page");
    assert_eq!(page.current_page, 1);
    assert_eq!(page.rows.len(), 2);
    assert_eq!(page.rows[0]["id"], 1);
    assert_eq!(
        page.error.as_deref(),
        Some("Failed to fetch transactions. Please try again.")
    );

    let mut calls = http(page_event(&app, &mut model, PageEvent::Refresh));
    assert!(url(find(&mut calls, "admin/all-money-added-list")).contains("page=1&"));
}

#[test]
fn deleting_the_last_row_of_the_last_page_moves_back_a_page() {
    let app = Tester::default();
    let mut model = Model::default();
    signed_in(&app, &mut model);

    let mut calls = open(&app, &mut model, PageId::MoneyCredits);
    let list = find(&mut calls, "admin/all-money-added-list");
    reply(&app, &mut model, list, 200, credits(&[1, 2], 3));
    let mut calls = http(page_event(&app, &mut model, PageEvent::ChangePage(3)));
    let list = find(&mut calls, "admin/all-money-added-list");
    reply(&app, &mut model, list, 200, credits(&[21], 3));

    let mut calls = http(page_event(&app, &mut model, PageEvent::Remove(RecordId(21))));
    let delete = find(&mut calls, "admin/delete-add-money");
    let mut calls = http(reply(&app, &mut model, delete, 200, json!({"status": "success"})));
    let list = find(&mut calls, "admin/all-money-added-list");
    assert!(url(list).contains("page=3&"));

    let mut calls = http(reply(&app, &mut model, list, 200, credits(&[], 2)));
    let list = find(&mut calls, "admin/all-money-added-list");
    assert!(url(list).contains("page=2&"));
    reply(&app, &mut model, list, 200, credits(&[11, 12], 2));

    let page = app.view(&model).page.expect("page");
    assert_eq!(page.current_page, 2);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.rows.len(), 2);
}

#[test]
fn harup_sheet_waits_for_category_and_side() {
    let app = Tester::default();
    let mut model = Model::default();
    signed_in(&app, &mut model);

    let mut calls = open(&app, &mut model, PageId::HarupJantri);
    assert_eq!(calls.len(), 1);
    let categories = find(&mut calls, "admin/get-all-category-list");
    reply(
        &app,
        &mut model,
        categories,
        200,
        listing(json!([{"id": 3, "name": "Gali"}, {"id": 4, "name": "Desawar"}])),
    );
    let page = app.view(&model).page.expect("page");
    assert_eq!(page.filters[0].options.len(), 2);
    assert!(page.rows.is_empty());

    let calls = http(page_event(
        &app,
        &mut model,
        PageEvent::Filter {
            name: "category_id".into(),
            value: Some("4".into()),
        },
    ));
    assert!(calls.is_empty());

    let mut calls = http(page_event(
        &app,
        &mut model,
        PageEvent::Filter {
            name: "game_type".into(),
            value: Some("ander_harup".into()),
        },
    ));
    let sheet = find(&mut calls, "admin/play-games-number-harup");
    assert!(url(sheet).ends_with("?category_id=4&game_type=ander_harup"));
    reply(
        &app,
        &mut model,
        sheet,
        200,
        json!({
            "bettingTotals": [{"number": "1", "total": "50"}, {"number": "6", "total": "25"}],
            "totalAmount": 75
        }),
    );

    let page = app.view(&model).page.expect("page");
    assert_eq!(page.title, "Harup Game Numbers");
    assert_eq!(page.rows.len(), 2);
    let summary = page.summary.expect("total");
    assert_eq!(summary.label, "Total Amount");
    assert_eq!(summary.value, "75.00");
}

#[test]
fn admin_deletes_a_bet_from_a_users_history() {
    let app = Tester::default();
    let mut model = Model::default();
    signed_in(&app, &mut model);

    let mut calls = open(&app, &mut model, PageId::Users);
    let list = find(&mut calls, "admin/all-users-list");
    reply(
        &app,
        &mut model,
        list,
        200,
        listing(json!([{"id": 7, "name": "Rahul", "mobile": "9000000001", "status": "0"}])),
    );

    let mut calls = http(page_event(
        &app,
        &mut model,
        PageEvent::OpenPanel {
            id: RecordId(7),
            panel: "game_history".into(),
        },
    ));
    let history = find(&mut calls, "admin/play-game-history-user/7");
    reply(
        &app,
        &mut model,
        history,
        200,
        listing(json!([
            {"id": 90, "Playing_Name": "Jodi", "entered_number": "45"},
            {"id": 91, "Playing_Name": "Harup", "entered_number": "4"}
        ])),
    );
    let panel = app.view(&model).page.expect("page").panel.expect("panel");
    assert_eq!(panel.title, "Game History");
    assert!(panel.can_remove);
    assert_eq!(panel.rows.len(), 2);

    let mut calls = http(page_event(&app, &mut model, PageEvent::RemovePanelRow(RecordId(90))));
    let delete = find(&mut calls, "admin/game-delete-by-admin/90");
    assert_eq!(delete.operation.method, "DELETE");
    let mut calls = http(reply(&app, &mut model, delete, 200, json!({"status": "success"})));
    assert!(calls.iter().all(|r| !url(r).contains("admin/all-users-list")));
    let history = find(&mut calls, "admin/play-game-history-user/7");
    reply(
        &app,
        &mut model,
        history,
        200,
        listing(json!([{"id": 91, "Playing_Name": "Harup", "entered_number": "4"}])),
    );

    let page = app.view(&model).page.expect("page");
    assert_eq!(page.notice.as_deref(), Some("Game deleted successfully."));
    assert_eq!(page.panel.expect("panel").rows.len(), 1);

    page_event(&app, &mut model, PageEvent::ClosePanel);
    assert!(app.view(&model).page.expect("page").panel.is_none());
}
