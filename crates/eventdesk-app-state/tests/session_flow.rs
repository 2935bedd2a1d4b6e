#![allow(clippy::expect_used)]

use std::sync::Arc;

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use chrono::{NaiveDate, NaiveTime};
use eventdesk_api_client::{ApiClient, ApiClientConfig, RsvpStatus};
use eventdesk_app_state::{
    AdminDashboard, Credentials, EventWizardState, GuestRsvpAction, GuestRsvpState,
    GuestRsvpStatus, LoginError, OrganizerDashboard, Registration, SessionContext, WizardAction,
    WizardStatus,
    apply_rsvp_action, apply_wizard_action, submit_event_wizard, submit_guest_rsvp,
};
use eventdesk_client_core::{AppRoute, Decision, KeyValueStore, MemoryStore, Role};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};

#[derive(Debug, Clone)]
struct RecordedRequest {
    method: Method,
    path: String,
    authorization: Option<String>,
    body: Value,
}

#[derive(Clone, Default)]
struct StubState {
    calls: Arc<Mutex<Vec<RecordedRequest>>>,
}

struct BackendStub {
    base_url: String,
    calls: Arc<Mutex<Vec<RecordedRequest>>>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl BackendStub {
    async fn calls(&self) -> Vec<RecordedRequest> {
        self.calls.lock().await.clone()
    }

    fn client(&self) -> Result<ApiClient> {
        Ok(ApiClient::new(ApiClientConfig::new(self.base_url.as_str()))?)
    }

    fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

async fn spawn_backend_stub() -> Result<BackendStub> {
    let state = StubState::default();
    let calls = state.calls.clone();
    let app = Router::new().fallback(handle).with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });
        let _ = server.await;
    });

    Ok(BackendStub {
        base_url: format!("http://{addr}/api"),
        calls,
        shutdown: Some(shutdown_tx),
    })
}

fn unauthenticated() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "Unauthenticated"})),
    )
        .into_response()
}

async fn handle(
    State(state): State<StubState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let authorization = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string);
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    state.calls.lock().await.push(RecordedRequest {
        method: method.clone(),
        path: uri.path().to_string(),
        authorization: authorization.clone(),
        body: body.clone(),
    });

    let bearer = authorization.as_deref();
    let signed_in = matches!(bearer, Some("Bearer abc" | "Bearer u1"));

    match (method.as_str(), uri.path()) {
        ("POST", "/api/auth/login") => match body.get("email").and_then(Value::as_str) {
            Some("ada@example.com") => Json(json!({"token": "abc", "role": "admin"})).into_response(),
            Some("sam@example.com") => Json(json!({
                "token": "u1",
                "user": {"id": 7, "name": "Sam", "role": "user"}
            }))
            .into_response(),
            Some("norole@example.com") => Json(json!({"token": "t0"})).into_response(),
            _ => (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "Invalid credentials"})),
            )
                .into_response(),
        },
        ("POST", "/api/auth/register") => (
            StatusCode::CREATED,
            Json(json!({
                "message": "Account created",
                "user": {"id": 9, "name": body["name"], "email": body["email"], "role": "user"}
            })),
        )
            .into_response(),
        ("POST", "/api/events/42/rsvp-guest") => {
            (StatusCode::CREATED, Json(json!({"ok": true}))).into_response()
        }
        ("POST", "/api/events") if signed_in => (
            StatusCode::CREATED,
            Json(json!({"event": {"_id": "evt_1", "title": body["title"]}})),
        )
            .into_response(),
        (_, path) if !signed_in && path != "/api/auth/login" => unauthenticated(),
        ("GET", "/api/events") => Json(json!({"events": [
            {"id": 42, "title": "Launch", "date": "2026-11-20"},
            {"id": 43, "title": "Retro"}
        ]}))
        .into_response(),
        ("GET", "/api/rsvps") => Json(json!([
            {"id": 1, "status": "yes", "guests": 2},
            {"id": 2, "status": "no"}
        ]))
        .into_response(),
        ("GET", "/api/notifications") => {
            (StatusCode::INTERNAL_SERVER_ERROR, "notification service down").into_response()
        }
        ("GET", "/api/admin/stats") => {
            Json(json!({"stats": {"totalEvents": 2, "totalUsers": 3}})).into_response()
        }
        ("GET", "/api/admin/events") => Json(json!({"data": []})).into_response(),
        ("GET", "/api/admin/users") => Json(json!({"users": [
            {"id": 1, "role": "admin"},
            {"id": 2, "role": "user"},
            {"id": 3, "role": "user"}
        ]}))
        .into_response(),
        _ => (StatusCode::NOT_FOUND, Json(json!({"message": "Not found"}))).into_response(),
    }
}

#[tokio::test]
async fn admin_login_persists_session_and_gates_views() -> Result<()> {
    let stub = spawn_backend_stub().await?;
    let store = MemoryStore::new();
    let mut context = SessionContext::restore(&store, stub.client()?);

    let landing = context
        .login(&Credentials::new(" Ada@Example.com ", "hunter2"))
        .await?;
    assert_eq!(landing, AppRoute::dashboard_for(Role::Admin));
    assert_eq!(store.get_item("token")?.as_deref(), Some("abc"));
    assert_eq!(store.get_item("role")?.as_deref(), Some("admin"));
    assert_eq!(context.client().auth_token(), Some("abc"));

    assert_eq!(context.authorize(Some(Role::Admin)), Decision::Render);
    assert_eq!(
        context.authorize(Some(Role::User)),
        Decision::Redirect(AppRoute::Home)
    );
    assert_eq!(context.authorize(Some(Role::User)).redirect_path(), Some("/".to_string()));

    let calls = stub.calls().await;
    assert_eq!(calls[0].authorization, None);
    assert_eq!(
        calls[0].body,
        json!({"email": "ada@example.com", "password": "hunter2"})
    );

    stub.stop();
    Ok(())
}

#[tokio::test]
async fn role_falls_back_to_user_object() -> Result<()> {
    let stub = spawn_backend_stub().await?;
    let store = MemoryStore::new();
    let mut context = SessionContext::restore(&store, stub.client()?);

    let landing = context
        .login(&Credentials::new("sam@example.com", "pw"))
        .await?;
    assert_eq!(landing.to_path(), "/dashboard");
    assert_eq!(store.get_item("role")?.as_deref(), Some("user"));

    stub.stop();
    Ok(())
}

#[tokio::test]
async fn failed_login_leaves_session_untouched() -> Result<()> {
    let stub = spawn_backend_stub().await?;
    let store = MemoryStore::new();
    let mut context = SessionContext::restore(&store, stub.client()?);

    let error = context
        .login(&Credentials::new("ghost@example.com", "pw"))
        .await
        .expect_err("bad credentials");
    assert_eq!(error.user_message(), "Invalid credentials");
    assert!(store.is_empty());

    let error = context
        .login(&Credentials::new("norole@example.com", "pw"))
        .await
        .expect_err("missing role");
    assert!(matches!(error, LoginError::MissingRole));
    assert!(store.is_empty());
    assert!(!context.client().is_authenticated());

    stub.stop();
    Ok(())
}

#[tokio::test]
async fn guest_rsvp_submits_without_a_session() -> Result<()> {
    let stub = spawn_backend_stub().await?;
    let client = stub.client()?;
    let mut state = GuestRsvpState::new("42");
    for action in [
        GuestRsvpAction::SetResponse(RsvpStatus::Yes),
        GuestRsvpAction::SetFullName("Jane Doe".to_string()),
        GuestRsvpAction::SetPhone("0999".to_string()),
    ] {
        apply_rsvp_action(&mut state, action);
    }

    submit_guest_rsvp(&client, &mut state).await;
    assert_eq!(state.status, GuestRsvpStatus::Submitted);

    let calls = stub.calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, Method::POST);
    assert_eq!(calls[0].path, "/api/events/42/rsvp-guest");
    assert_eq!(calls[0].authorization, None);
    assert_eq!(calls[0].body["status"], "yes");
    assert_eq!(calls[0].body["name"], "Jane Doe");

    stub.stop();
    Ok(())
}

#[tokio::test]
async fn stale_token_surfaces_unauthenticated_and_logout_recovers() -> Result<()> {
    let stub = spawn_backend_stub().await?;
    let store = MemoryStore::with_session("expired", "user");
    let mut context = SessionContext::restore(&store, stub.client()?);

    let dashboard = OrganizerDashboard::load(context.client()).await;
    let failure = dashboard.events.failure().expect("events rejected");
    assert_eq!(failure.message, "Unauthenticated");
    assert!(dashboard.should_logout());

    // The gate still trusts local state until the caller logs out.
    assert!(context.authorize(Some(Role::User)).is_render());
    assert_eq!(context.logout(), AppRoute::Login);
    assert!(store.is_empty());
    assert_eq!(
        context.authorize(Some(Role::User)),
        Decision::Redirect(AppRoute::Login)
    );

    stub.stop();
    Ok(())
}

#[tokio::test]
async fn organizer_dashboard_panels_fail_independently() -> Result<()> {
    let stub = spawn_backend_stub().await?;
    let context = SessionContext::restore(MemoryStore::with_session("u1", "user"), stub.client()?);

    let dashboard = OrganizerDashboard::load(context.client()).await;
    assert_eq!(dashboard.events.loaded().map(Vec::len), Some(2));
    assert_eq!(dashboard.confirmed_guests(), 2);
    assert_eq!(
        dashboard.notifications.error_message(),
        Some("notification service down")
    );
    assert_eq!(dashboard.unread_notifications(), 0);
    assert!(!dashboard.should_logout());

    stub.stop();
    Ok(())
}

#[tokio::test]
async fn admin_dashboard_loads_stats_and_users() -> Result<()> {
    let stub = spawn_backend_stub().await?;
    let client = stub.client()?.with_auth_token(Some("abc"));

    let dashboard = AdminDashboard::load(&client).await;
    let stats = dashboard.stats.loaded().expect("stats");
    assert_eq!(stats.total_events, 2);
    assert_eq!(stats.total_users, 3);
    assert_eq!(dashboard.events.loaded().map(Vec::len), Some(0));
    assert_eq!(dashboard.users_with_role("user"), 2);

    stub.stop();
    Ok(())
}

#[tokio::test]
async fn wizard_posts_reviewed_event() -> Result<()> {
    let stub = spawn_backend_stub().await?;
    let client = stub.client()?.with_auth_token(Some("u1"));
    let mut state = EventWizardState::new();
    for action in [
        WizardAction::SetTitle("Launch".to_string()),
        WizardAction::SetDescription("Demo night".to_string()),
        WizardAction::Next,
        WizardAction::SetDate(NaiveDate::from_ymd_opt(2026, 11, 20)),
        WizardAction::SetStartTime(NaiveTime::from_hms_opt(18, 30, 0)),
        WizardAction::Next,
        WizardAction::SetVirtual(true),
        WizardAction::SetMeetingLink("https://meet.example.com/launch".to_string()),
        WizardAction::Next,
    ] {
        apply_wizard_action(&mut state, action);
    }

    submit_event_wizard(&client, &mut state).await;
    assert_eq!(
        state.status,
        WizardStatus::Submitted {
            event_id: "evt_1".to_string()
        }
    );

    let calls = stub.calls().await;
    assert_eq!(calls[0].path, "/api/events");
    assert_eq!(calls[0].body["start_time"], "18:30");
    assert_eq!(calls[0].body["date"], "2026-11-20");
    assert_eq!(calls[0].body["is_virtual"], true);
    assert!(calls[0].body.get("location").is_none());

    stub.stop();
    Ok(())
}

#[tokio::test]
async fn register_normalizes_input_and_does_not_sign_in() -> Result<()> {
    let stub = spawn_backend_stub().await?;
    let store = MemoryStore::new();
    let context = SessionContext::restore(&store, stub.client()?);

    let response = context
        .register(&Registration {
            name: "  Jane   Doe ".to_string(),
            email: " Jane@Example.com ".to_string(),
            password: "s3cret".to_string(),
        })
        .await?;
    assert_eq!(response.message.as_deref(), Some("Account created"));
    assert_eq!(response.token(), None);
    assert_eq!(
        response.user.as_ref().and_then(|user| user.name.as_deref()),
        Some("Jane Doe")
    );

    let calls = stub.calls().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].method, Method::POST);
    assert_eq!(calls[0].path, "/api/auth/register");
    assert_eq!(calls[0].authorization, None);
    assert_eq!(
        calls[0].body,
        json!({"name": "Jane Doe", "email": "jane@example.com", "password": "s3cret"})
    );
    assert!(store.is_empty());
    assert!(!context.client().is_authenticated());

    stub.stop();
    Ok(())
}
