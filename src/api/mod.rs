pub mod auth;
mod bookings;
pub mod error;
pub mod rate_limit;
mod subscription;
mod therapists;
pub mod validation;

use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::CorsConfig;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Credential routes (public, tight rate limit)
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_auth,
        ));

    // Bearer routes; each handler resolves its `Caller`
    let api_routes = Router::new()
        .route(
            "/bookings",
            get(bookings::list_bookings).post(bookings::create_booking),
        )
        .route("/therapists", post(therapists::update_profile))
        .route("/subscribe", post(subscription::subscribe))
        .route("/approve", post(therapists::approve_therapist))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_api,
        ));

    let public_routes = Router::new()
        .route("/therapists", get(therapists::list_therapists))
        .route("/health", get(health_check));

    Router::new()
        .merge(auth_routes)
        .merge(api_routes)
        .merge(public_routes)
        .layer(cors_layer(&state.config.cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Any origin when none are configured
fn cors_layer(config: &CorsConfig) -> CorsLayer {
    if config.allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
}

async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    match crate::db::ping(&state.db).await {
        Ok(()) => Json(HealthResponse {
            status: "ok",
            database: "ok",
        })
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "degraded",
                    database: "unreachable",
                }),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenService;
    use crate::config::Config;
    use crate::db::{test_pool, Role, SubscriptionTier, TherapistProfile, User};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const SECRET: &str = "router-test-secret";

    fn test_config() -> Config {
        let mut config = Config::default();
        config.auth.jwt_secret = Some(SECRET.to_string());
        config
    }

    async fn test_app_with(config: Config) -> (Router, Arc<AppState>) {
        let db = test_pool().await;
        let state = Arc::new(AppState::new(config, db).unwrap());
        (create_router(state.clone()), state)
    }

    async fn test_app() -> (Router, Arc<AppState>) {
        test_app_with(test_config()).await
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn register(app: &Router, email: &str, role: &str) -> (StatusCode, Value) {
        send(
            app,
            Method::POST,
            "/register",
            None,
            Some(json!({"email": email, "password": "pw-123", "role": role})),
        )
        .await
    }

    async fn login(app: &Router, email: &str) -> String {
        let (status, body) = send(
            app,
            Method::POST,
            "/login",
            None,
            Some(json!({"email": email, "password": "pw-123"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    async fn register_and_login(app: &Router, email: &str, role: &str) -> String {
        let (status, _) = register(app, email, role).await;
        assert_eq!(status, StatusCode::OK);
        login(app, email).await
    }

    async fn admin_token(app: &Router, state: &AppState) -> String {
        auth::ensure_admin_user(&state.db, "admin@x.com", "pw-123")
            .await
            .unwrap();
        login(app, "admin@x.com").await
    }

    async fn user_id(state: &AppState, email: &str) -> i64 {
        User::find_by_email(&state.db, email).await.unwrap().unwrap().id
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = test_app().await;
        let (status, body) = send(&app, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ok", "database": "ok"}));
    }

    #[tokio::test]
    async fn test_client_registers_logs_in_and_has_no_bookings() {
        let (app, _) = test_app().await;

        let (status, body) = register(&app, "client@x.com", "client").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Registrado ok"}));

        let token = login(&app, "client@x.com").await;
        let (status, body) = send(&app, Method::GET, "/bookings", Some(token.as_str()), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_token_carries_identity() {
        let (app, state) = test_app().await;
        let token = register_and_login(&app, "t@x.com", "therapist").await;

        let caller = state.tokens.verify(&token).unwrap();
        assert_eq!(caller.id, user_id(&state, "t@x.com").await);
        assert_eq!(caller.role, Role::Therapist);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let (app, _) = test_app().await;
        register(&app, "dup@x.com", "client").await;

        let (status, body) = register(&app, "dup@x.com", "therapist").await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "duplicate_email");
    }

    #[tokio::test]
    async fn test_register_validation() {
        let (app, _) = test_app().await;

        let (status, body) = register(&app, "no-at-sign", "client").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "validation_error");

        let (status, body) = register(&app, "a@x.com", "superuser").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["details"]["role"].is_array());
    }

    #[tokio::test]
    async fn test_admin_self_registration() {
        let (app, _) = test_app().await;
        let (status, body) = register(&app, "root@x.com", "admin").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "forbidden");

        let mut config = test_config();
        config.auth.allow_admin_registration = true;
        let (app, state) = test_app_with(config).await;
        let (status, _) = register(&app, "root@x.com", "admin").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(User::count_by_role(&state.db, Role::Admin).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_login_failures() {
        let (app, _) = test_app().await;
        register(&app, "a@x.com", "client").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/login",
            None,
            Some(json!({"email": "ghost@x.com", "password": "pw-123"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "not_found");

        let (status, body) = send(
            &app,
            Method::POST,
            "/login",
            None,
            Some(json!({"email": "a@x.com", "password": "wrong"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "invalid_credentials");
    }

    #[tokio::test]
    async fn test_malformed_json_uses_error_envelope() {
        let (app, _) = test_app().await;
        let request = Request::builder()
            .method(Method::POST)
            .uri("/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["code"], "bad_request");
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_bearer_routes_require_valid_token() {
        let (app, state) = test_app().await;

        let (status, body) = send(&app, Method::GET, "/bookings", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "unauthenticated");

        let (status, body) = send(&app, Method::GET, "/bookings", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "invalid_token");

        let request = Request::builder()
            .uri("/bookings")
            .header(header::AUTHORIZATION, "Basic dXNlcjpwdw==")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // Issued two hours ago, expired one hour ago
        let stale = state
            .tokens
            .issue_at(1, Role::Client, chrono::Utc::now().timestamp() - 7200)
            .unwrap();
        let (status, body) = send(&app, Method::GET, "/bookings", Some(stale.as_str()), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "invalid_token");

        let foreign = TokenService::new("someone-else", 3600)
            .unwrap()
            .issue(1, Role::Admin)
            .unwrap();
        let (status, _) = send(&app, Method::POST, "/approve", Some(foreign.as_str()), Some(json!({"therapist_id": 1}))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_bookings_are_private_to_client() {
        let (app, state) = test_app().await;
        let alice = register_and_login(&app, "alice@x.com", "client").await;
        let bob = register_and_login(&app, "bob@x.com", "client").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/bookings",
            Some(alice.as_str()),
            Some(json!({"therapist_id": 1, "date": "2025-01-01", "time": "10:00"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Booking creado ok"}));

        let (_, body) = send(&app, Method::GET, "/bookings", Some(alice.as_str()), None).await;
        let bookings = body.as_array().unwrap();
        assert_eq!(bookings.len(), 1);
        assert_eq!(bookings[0]["client_id"], user_id(&state, "alice@x.com").await);
        assert_eq!(bookings[0]["therapist_id"], 1);
        assert_eq!(bookings[0]["date"], "2025-01-01");
        assert_eq!(bookings[0]["time"], "10:00");

        let (_, body) = send(&app, Method::GET, "/bookings", Some(bob.as_str()), None).await;
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_booking_requires_date_and_time() {
        let (app, _) = test_app().await;
        let token = register_and_login(&app, "c@x.com", "client").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/bookings",
            Some(token.as_str()),
            Some(json!({"therapist_id": 1, "date": "", "time": "10:00"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "validation_error");
    }

    #[tokio::test]
    async fn test_new_therapist_is_hidden_until_approved() {
        let (app, state) = test_app().await;
        let therapist = register_and_login(&app, "t@x.com", "therapist").await;
        let admin = admin_token(&app, &state).await;
        let id = user_id(&state, "t@x.com").await;

        let (_, body) = send(&app, Method::GET, "/therapists", None, None).await;
        assert_eq!(body, json!([]));

        let (status, body) = send(&app, Method::GET, "/therapists?verified=0", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["id"], id);
        assert_eq!(body[0]["name"], "Nuevo Terapeuta");
        assert_eq!(body[0]["verified"], false);

        // A therapist cannot approve, even themselves
        let (status, body) = send(
            &app,
            Method::POST,
            "/approve",
            Some(therapist.as_str()),
            Some(json!({"therapist_id": id})),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "forbidden");
        assert!(!TherapistProfile::find_by_id(&state.db, id).await.unwrap().unwrap().verified);

        for _ in 0..2 {
            let (status, body) = send(
                &app,
                Method::POST,
                "/approve",
                Some(admin.as_str()),
                Some(json!({"therapist_id": id})),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["message"], "Terapeuta aprobado");
        }

        let (_, body) = send(&app, Method::GET, "/therapists", None, None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["verified"], true);

        let (_, body) = send(&app, Method::GET, "/therapists?verified=Todos", None, None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_approve_unknown_therapist_is_not_found() {
        let (app, state) = test_app().await;
        let admin = admin_token(&app, &state).await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/approve",
            Some(admin.as_str()),
            Some(json!({"therapist_id": 999})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");
    }

    #[tokio::test]
    async fn test_directory_filters() {
        let (app, state) = test_app().await;
        crate::db::seed_demo_therapists(&state.db).await.unwrap();

        let (_, body) = send(&app, Method::GET, "/therapists?modality=Online", None, None).await;
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Jorge Gutierrez", "Carlos Pérez"]);

        let (_, body) = send(
            &app,
            Method::GET,
            "/therapists?seguro=Todos&modality=Todas&specialty=Parejas",
            None,
            None,
        )
        .await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["seguro"], "Sin seguro");

        let (status, body) = send(&app, Method::GET, "/therapists?verified=maybe", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "bad_request");

        let (status, _) = send(&app, Method::GET, "/therapists?id=abc", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_therapist_edits_only_own_profile() {
        let (app, state) = test_app().await;
        let mine = register_and_login(&app, "mine@x.com", "therapist").await;
        register(&app, "other@x.com", "therapist").await;
        let my_id = user_id(&state, "mine@x.com").await;
        let other_id = user_id(&state, "other@x.com").await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/therapists",
            Some(mine.as_str()),
            Some(json!({
                "id": other_id,
                "name": "Ana López",
                "specialty": "Depresión",
                "modality": "Presencial",
                "seguro": "Privado",
                "price": "Gs. 180.000"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Profile actualizado exitosamente");

        let own = TherapistProfile::find_by_id(&state.db, my_id).await.unwrap().unwrap();
        assert_eq!(own.name, "Ana López");
        assert_eq!(own.modality, "Presencial");
        assert!(!own.verified);

        let other = TherapistProfile::find_by_id(&state.db, other_id).await.unwrap().unwrap();
        assert_eq!(other.name, "Nuevo Terapeuta");
    }

    #[tokio::test]
    async fn test_profile_edit_rejects_other_roles_and_bad_modality() {
        let (app, state) = test_app().await;
        let client = register_and_login(&app, "c@x.com", "client").await;
        let admin = admin_token(&app, &state).await;
        let therapist = register_and_login(&app, "t@x.com", "therapist").await;
        let body = json!({"name": "X", "specialty": "", "modality": "Online", "seguro": "", "price": ""});

        for token in [&client, &admin] {
            let (status, resp) =
                send(&app, Method::POST, "/therapists", Some(token.as_str()), Some(body.clone())).await;
            assert_eq!(status, StatusCode::FORBIDDEN);
            assert_eq!(resp["code"], "forbidden");
        }

        let bad = json!({"name": "X", "modality": "Telepatia"});
        let (status, _) = send(&app, Method::POST, "/therapists", Some(therapist.as_str()), Some(bad)).await;
        assert!(status.is_client_error());
    }

    #[tokio::test]
    async fn test_profile_edit_without_profile_is_not_found() {
        let (app, state) = test_app().await;
        let token = register_and_login(&app, "t@x.com", "therapist").await;
        let id = user_id(&state, "t@x.com").await;
        sqlx::query("DELETE FROM therapists WHERE id = ?")
            .bind(id)
            .execute(&state.db)
            .await
            .unwrap();

        let (status, body) = send(
            &app,
            Method::POST,
            "/therapists",
            Some(token.as_str()),
            Some(json!({"name": "X", "modality": "Online"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");
    }

    #[tokio::test]
    async fn test_subscribe() {
        let (app, state) = test_app().await;
        let therapist = register_and_login(&app, "t@x.com", "therapist").await;
        let client = register_and_login(&app, "c@x.com", "client").await;

        let (status, _) = send(&app, Method::POST, "/subscribe", Some(client.as_str()), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        for _ in 0..2 {
            let (status, body) = send(&app, Method::POST, "/subscribe", Some(therapist.as_str()), None).await;
            assert_eq!(status, StatusCode::OK);
            assert!(body["message"].is_string());
        }

        let user = User::find_by_email(&state.db, "t@x.com").await.unwrap().unwrap();
        assert_eq!(user.sub_tier, SubscriptionTier::Premium);
        let client = User::find_by_email(&state.db, "c@x.com").await.unwrap().unwrap();
        assert_eq!(client.sub_tier, SubscriptionTier::Basic);
    }

    #[tokio::test]
    async fn test_auth_routes_are_rate_limited() {
        let mut config = test_config();
        config.rate_limit.auth_requests_per_window = 2;
        let (app, _) = test_app_with(config).await;
        let creds = json!({"email": "ghost@x.com", "password": "pw"});

        for _ in 0..2 {
            let (status, _) = send(&app, Method::POST, "/login", None, Some(creds.clone())).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
        }

        let request = Request::builder()
            .method(Method::POST)
            .uri("/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(creds.to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key(header::RETRY_AFTER));

        // Public directory is not throttled by the auth budget
        let (status, _) = send(&app, Method::GET, "/therapists", None, None).await;
        assert_eq!(status, StatusCode::OK);
    }
}
