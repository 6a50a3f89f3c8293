//! Auth API endpoints
//!
//! Provides REST API endpoints for the credential core:
//! - POST /api/auth/register - Create an account
//! - POST /api/auth/login - Login and get a session token (throttled)
//! - POST /api/auth/logout - Revoke a session token
//! - POST /api/auth/password/reset - Start a password reset
//! - POST /api/auth/password/reset/confirm - Complete a password reset
//! - GET /api/users/{id} - Read your own profile
//!
//! Bodies that fail to parse are answered with an `INVALID_ARGUMENT` error
//! body, like any other rejected request.

use axum::{
    Json, Router,
    extract::{Path, State},
    middleware,
    routing::{MethodRouter, get, post},
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use super::error::AuthError;
use super::guard::{AuthenticatedSubject, SessionGuard};
use super::pipeline::{Operation, require_session, throttle_attempts};
use super::reset::PasswordResetService;
use super::service::{AuthService, LoginRequest, LoginResponse, LogoutRequest, RegisterRequest};
use super::throttle::AttemptThrottle;
use crate::core::db::models::UserResponse;

/// Shared state for the auth routes
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub reset_service: PasswordResetService,
    pub guard: SessionGuard,
    pub throttle: Arc<AttemptThrottle>,
}

/// Request for starting a password reset
#[derive(Debug, Deserialize)]
pub struct BeginResetRequest {
    pub email: String,
}

/// Request for completing a password reset
#[derive(Debug, Deserialize)]
pub struct CompleteResetRequest {
    pub token: String,
    pub new_password: String,
}

/// Generic success response
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

impl SuccessResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

/// Handler serving `op`
fn operation_handler(op: Operation) -> MethodRouter<Arc<AppState>> {
    match op {
        Operation::Register => post(register_handler),
        Operation::Login => post(login_handler),
        Operation::Logout => post(logout_handler),
        Operation::BeginReset => post(begin_reset_handler),
        Operation::CompleteReset => post(complete_reset_handler),
        Operation::GetProfile => get(profile_handler),
    }
}

/// Create the API router.
///
/// Each operation gets the throttle and session stages its table entry asks
/// for. The session stage runs before the throttle when both apply.
pub fn api_router(state: AppState) -> Router {
    let throttle = Arc::clone(&state.throttle);
    let guard = state.guard.clone();

    let mut router = Router::new();
    for op in Operation::ALL {
        let mut route = operation_handler(op);
        if op.is_throttled() {
            route = route.route_layer(middleware::from_fn_with_state(
                Arc::clone(&throttle),
                throttle_attempts,
            ));
        }
        if op.requires_session() {
            route = route.route_layer(middleware::from_fn_with_state(
                guard.clone(),
                require_session,
            ));
        }
        router = router.route(op.path(), route);
    }

    router
        .with_state(Arc::new(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// POST /api/auth/register
async fn register_handler(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(request), _): WithRejection<Json<RegisterRequest>, AuthError>,
) -> Result<Json<UserResponse>, AuthError> {
    let user = state.auth_service.register(request).await?;
    Ok(Json(user))
}

/// POST /api/auth/login
async fn login_handler(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(request), _): WithRejection<Json<LoginRequest>, AuthError>,
) -> Result<Json<LoginResponse>, AuthError> {
    let session = state.auth_service.login(request).await?;
    Ok(Json(session))
}

/// POST /api/auth/logout
async fn logout_handler(
    State(state): State<Arc<AppState>>,
    subject: AuthenticatedSubject,
    WithRejection(Json(request), _): WithRejection<Json<LogoutRequest>, AuthError>,
) -> Result<Json<SuccessResponse>, AuthError> {
    tracing::debug!(subject = %subject.subject, "Logout request");

    state.auth_service.logout(&request.token).await?;

    Ok(Json(SuccessResponse::new("Logged out successfully")))
}

/// POST /api/auth/password/reset
/// Same response whether or not the address belongs to an account
async fn begin_reset_handler(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(request), _): WithRejection<Json<BeginResetRequest>, AuthError>,
) -> Result<Json<SuccessResponse>, AuthError> {
    state.reset_service.begin_reset(&request.email).await?;

    Ok(Json(SuccessResponse::new(
        "If the address is registered, a reset link has been sent",
    )))
}

/// POST /api/auth/password/reset/confirm
async fn complete_reset_handler(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(request), _): WithRejection<Json<CompleteResetRequest>, AuthError>,
) -> Result<Json<SuccessResponse>, AuthError> {
    state
        .reset_service
        .complete_reset(&request.token, &request.new_password)
        .await?;

    Ok(Json(SuccessResponse::new("Password updated successfully")))
}

/// GET /api/users/{id}
async fn profile_handler(
    State(state): State<Arc<AppState>>,
    subject: AuthenticatedSubject,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserResponse>, AuthError> {
    let user = state.auth_service.get_profile(&subject, user_id).await?;
    Ok(Json(user))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::jwt::{JwtConfig, JwtService};
    use crate::core::auth::reset::LogResetNotifier;
    use crate::core::auth::revocation::RevocationList;
    use crate::core::config::Config;
    use crate::core::db::repositories::MemoryStore;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
        response::Response,
    };
    use serde_json::{Value, json};
    use std::time::Duration;
    use tower::ServiceExt;

    fn create_test_app(limit: usize) -> Router {
        let store = Arc::new(MemoryStore::new());
        let config = Config {
            bcrypt_cost: 4,
            ..Config::default()
        };
        let jwt = JwtService::new(JwtConfig::new("api_test_secret"));
        let revocations = RevocationList::new(store.clone());

        api_router(AppState {
            auth_service: AuthService::new(
                store.clone(),
                jwt.clone(),
                revocations.clone(),
                config.bcrypt_cost,
            ),
            reset_service: PasswordResetService::new(
                store.clone(),
                store.clone(),
                Arc::new(LogResetNotifier),
                &config,
            ),
            guard: SessionGuard::new(jwt, revocations),
            throttle: Arc::new(AttemptThrottle::new(limit, Duration::from_secs(60))),
        })
    }

    fn post_json(uri: &str, body: Value, bearer: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_with(uri: &str, authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn register_and_login(app: &Router, email: &str) -> (String, String) {
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/auth/register",
                json!({"name": "Api User", "email": email, "password": "validPass1"}),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/auth/login",
                json!({"email": email, "password": "validPass1"}),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        (
            body["token"].as_str().unwrap().to_string(),
            body["user_id"].as_str().unwrap().to_string(),
        )
    }

    #[tokio::test]
    async fn test_login_then_read_own_profile() {
        let app = create_test_app(5);
        let (token, user_id) = register_and_login(&app, "me@example.com").await;

        let response = app
            .clone()
            .oneshot(get_with(
                &format!("/api/users/{}", user_id),
                Some(&format!("Bearer {}", token)),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["email"], "me@example.com");
        assert!(body.get("password_hash").is_none());
    }

    #[tokio::test]
    async fn test_other_profile_is_forbidden() {
        let app = create_test_app(5);
        let (token, _) = register_and_login(&app, "me@example.com").await;

        let response = app
            .oneshot(get_with(
                &format!("/api/users/{}", Uuid::new_v4()),
                Some(&format!("Bearer {}", token)),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(response).await["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn test_protected_route_rejections() {
        let app = create_test_app(5);
        let uri = format!("/api/users/{}", Uuid::new_v4());

        for (authorization, message) in [
            (None, "authorization token is not provided"),
            (Some("xyz"), "invalid token format"),
            (Some("Bearer not-a-jwt"), "invalid token"),
        ] {
            let response = app
                .clone()
                .oneshot(get_with(&uri, authorization))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            let body = json_body(response).await;
            assert_eq!(body["code"], "UNAUTHENTICATED");
            assert_eq!(body["error"], message);
        }
    }

    #[tokio::test]
    async fn test_logout_revokes_session() {
        let app = create_test_app(5);
        let (token, user_id) = register_and_login(&app, "bye@example.com").await;

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/auth/logout",
                json!({"token": token}),
                Some(&token),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(get_with(
                &format!("/api/users/{}", user_id),
                Some(&format!("Bearer {}", token)),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["error"], "token has been revoked");
    }

    #[tokio::test]
    async fn test_login_is_throttled() {
        let app = create_test_app(2);

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(post_json(
                    "/api/auth/login",
                    json!({"email": "x@example.com", "password": "wrongPass1"}),
                    None,
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }

        let response = app
            .oneshot(post_json(
                "/api/auth/login",
                json!({"email": "x@example.com", "password": "wrongPass1"}),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(json_body(response).await["code"], "RESOURCE_EXHAUSTED");
    }

    #[tokio::test]
    async fn test_register_is_not_throttled() {
        let app = create_test_app(1);

        for i in 0..3 {
            let response = app
                .clone()
                .oneshot(post_json(
                    "/api/auth/register",
                    json!({
                        "name": "N",
                        "email": format!("user{}@example.com", i),
                        "password": "validPass1"
                    }),
                    None,
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn test_begin_reset_response_is_uniform() {
        let app = create_test_app(5);
        register_and_login(&app, "known@example.com").await;

        let known = app
            .clone()
            .oneshot(post_json(
                "/api/auth/password/reset",
                json!({"email": "known@example.com"}),
                None,
            ))
            .await
            .unwrap();
        let unknown = app
            .oneshot(post_json(
                "/api/auth/password/reset",
                json!({"email": "unknown@example.com"}),
                None,
            ))
            .await
            .unwrap();

        assert_eq!(known.status(), unknown.status());
        assert_eq!(json_body(known).await, json_body(unknown).await);
    }

    #[tokio::test]
    async fn test_complete_reset_with_bad_ticket() {
        let app = create_test_app(5);

        let response = app
            .oneshot(post_json(
                "/api/auth/password/reset/confirm",
                json!({"token": "deadbeef", "new_password": "validPass1"}),
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["code"], "INVALID_ARGUMENT");
        assert_eq!(body["error"], "invalid or expired token");
    }

    #[tokio::test]
    async fn test_session_gate_follows_operation_table() {
        let app = create_test_app(100);

        for op in Operation::ALL {
            let uri = op.path().replace("{id}", &Uuid::new_v4().to_string());
            let request = if op == Operation::GetProfile {
                get_with(&uri, None)
            } else {
                post_json(&uri, json!({}), None)
            };

            let response = app.clone().oneshot(request).await.unwrap();
            let body = json_body(response).await;
            let gated = body["error"] == "authorization token is not provided";

            assert_eq!(gated, op.requires_session(), "{:?}: {}", op, body);
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_invalid_argument() {
        let app = create_test_app(5);

        let request = Request::builder()
            .method("POST")
            .uri("/api/auth/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["code"], "INVALID_ARGUMENT");
        assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));

        // Missing fields take the same path
        let response = app
            .oneshot(post_json(
                "/api/auth/password/reset/confirm",
                json!({"token": "abc"}),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "INVALID_ARGUMENT");
    }

    #[tokio::test]
    async fn test_duplicate_registration_conflicts() {
        let app = create_test_app(5);
        register_and_login(&app, "twice@example.com").await;

        let response = app
            .oneshot(post_json(
                "/api/auth/register",
                json!({"name": "Again", "email": "twice@example.com", "password": "validPass1"}),
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = json_body(response).await;
        assert_eq!(body["code"], "ALREADY_EXISTS");
        assert_eq!(body["error"], "email already registered");
    }
}
