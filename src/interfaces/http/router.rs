//! API Router with Swagger UI

use std::sync::Arc;
use std::time::Instant;

use axum::{
    http::HeaderValue,
    middleware,
    routing::{get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::application::booking::ReservationService;
use crate::application::identity::UserService;
use crate::domain::RepositoryProvider;
use crate::infrastructure::crypto::jwt::JwtConfig;
use crate::interfaces::http::common::{ApiResponse, PaginatedResponse};
use crate::interfaces::http::middleware::{auth_middleware, AuthState};
use crate::interfaces::http::modules::{
    auth, health, metrics, request_id::request_id_middleware, reservations, users,
};

/// Everything the HTTP layer needs from the rest of the service
#[derive(Clone)]
pub struct ApiDependencies {
    pub repos: Arc<dyn RepositoryProvider>,
    pub reservation_service: Arc<ReservationService>,
    pub user_service: Arc<UserService>,
    pub jwt_config: JwtConfig,
    /// `None` leaves `/metrics` unrouted
    pub metrics_handle: Option<PrometheusHandle>,
    /// Empty or `"*"` allows any origin
    pub allowed_origins: Vec<String>,
}

/// Security scheme modifier for OpenAPI
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT Bearer token from /api/v1/auth/login"))
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health_check,
        // Auth
        auth::login,
        auth::register,
        auth::get_current_user,
        auth::change_password,
        // Users
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
        // Reservations
        reservations::list_reservations,
        reservations::check_conflicts,
        reservations::get_reservation,
        reservations::create_reservation,
        reservations::update_reservation,
        reservations::cancel_reservation,
        reservations::purge_reservations,
    ),
    components(
        schemas(
            ApiResponse<users::UserDto>,
            PaginatedResponse<users::UserDto>,
            health::HealthResponse,
            health::ComponentHealth,
            auth::LoginRequest,
            auth::LoginResponse,
            auth::RegisterRequest,
            auth::ChangePasswordRequest,
            users::UserDto,
            users::CreateUserRequest,
            users::UpdateUserRequest,
            reservations::OwnerDto,
            reservations::ReservationDto,
            reservations::ConflictDto,
            reservations::ConflictCheckResponse,
            reservations::CreateReservationRequest,
            reservations::UpdateReservationRequest,
            reservations::PurgeResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Service health"),
        (name = "Authentication", description = "Login, registration and profile"),
        (name = "Users", description = "Resident accounts"),
        (name = "Reservations", description = "Party room bookings"),
    ),
    info(
        title = "Party Room Reservation API",
        version = "1.0.0",
        description = "Booking calendar for the condominium party room"
    )
)]
pub struct ApiDoc;

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    base.allow_origin(AllowOrigin::list(origins))
}

/// Create the API router with all routes
pub fn create_api_router(deps: ApiDependencies) -> Router {
    let middleware_state = AuthState {
        jwt_config: deps.jwt_config.clone(),
    };

    let auth_state = auth::AuthHandlerState {
        user_service: deps.user_service.clone(),
    };

    // Auth routes (public)
    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .with_state(auth_state.clone());

    // Auth routes (protected)
    let auth_protected_routes = Router::new()
        .route("/me", get(auth::get_current_user))
        .route("/change-password", put(auth::change_password))
        .layer(middleware::from_fn_with_state(
            middleware_state.clone(),
            auth_middleware,
        ))
        .with_state(auth_state);

    // User routes (protected)
    let user_routes = Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route(
            "/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .layer(middleware::from_fn_with_state(
            middleware_state.clone(),
            auth_middleware,
        ))
        .with_state(users::UserHandlerState {
            user_service: deps.user_service.clone(),
        });

    // Reservation routes (protected)
    let reservation_routes = Router::new()
        .route(
            "/",
            get(reservations::list_reservations).post(reservations::create_reservation),
        )
        .route("/conflicts", get(reservations::check_conflicts))
        .route("/purge", post(reservations::purge_reservations))
        .route(
            "/{id}",
            get(reservations::get_reservation)
                .put(reservations::update_reservation)
                .delete(reservations::cancel_reservation),
        )
        .layer(middleware::from_fn_with_state(
            middleware_state,
            auth_middleware,
        ))
        .with_state(reservations::ReservationHandlerState {
            service: deps.reservation_service.clone(),
        });

    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .with_state(health::HealthState {
            repos: deps.repos.clone(),
            started_at: Arc::new(Instant::now()),
        });

    let swagger_routes = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

    let mut router = Router::new()
        // Swagger UI
        .merge(swagger_routes)
        // Health
        .merge(health_routes)
        // Auth
        .nest("/api/v1/auth", auth_routes)
        .nest("/api/v1/auth", auth_protected_routes)
        // Users
        .nest("/api/v1/users", user_routes)
        // Reservations
        .nest("/api/v1/reservations", reservation_routes);

    if let Some(handle) = deps.metrics_handle {
        router = router.route(
            "/metrics",
            get(metrics::prometheus_metrics).with_state(metrics::MetricsState { handle }),
        );
    }

    router
        .layer(middleware::from_fn(metrics::http_metrics_middleware))
        .layer(cors_layer(&deps.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id_middleware))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::booking::{BookingPolicy, FixedClock};
    use crate::application::identity::NewAccount;
    use crate::infrastructure::InMemoryRepositoryProvider;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use chrono::NaiveDate;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        users: Arc<UserService>,
    }

    fn app() -> TestApp {
        let repos: Arc<dyn RepositoryProvider> = Arc::new(InMemoryRepositoryProvider::new());
        let clock = Arc::new(FixedClock::new(
            NaiveDate::from_ymd_opt(2030, 6, 10)
                .unwrap()
                .and_hms_opt(15, 0, 0)
                .unwrap(),
        ));
        let jwt_config = JwtConfig::new("router-test-secret", 1);
        let users = Arc::new(UserService::new(repos.clone(), jwt_config.clone()));
        let reservation_service = Arc::new(ReservationService::new(
            repos.clone(),
            clock,
            BookingPolicy::default(),
        ));

        let router = create_api_router(ApiDependencies {
            repos,
            reservation_service,
            user_service: users.clone(),
            jwt_config,
            metrics_handle: None,
            allowed_origins: vec![],
        });

        TestApp { router, users }
    }

    async fn call(
        router: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header("authorization", format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => req
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        router.clone().oneshot(req).await.unwrap()
    }

    async fn json_body(resp: Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn register(router: &Router, name: &str, unit: i32) -> (String, i64) {
        let resp = call(
            router,
            "POST",
            "/api/v1/auth/register",
            None,
            Some(json!({
                "name": name,
                "email": format!("{}@example.com", name.to_lowercase()),
                "phone": "4130001000",
                "unit": unit,
                "password": "correct-horse",
            })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = json_body(resp).await;
        (
            body["data"]["token"].as_str().unwrap().to_string(),
            body["data"]["user"]["id"].as_i64().unwrap(),
        )
    }

    /// Seeding only works on an empty store, so call this before `register`.
    async fn admin_token(app: &TestApp) -> String {
        let seeded = app
            .users
            .seed_admin(NewAccount {
                name: "Admin".into(),
                email: "admin@example.com".into(),
                phone: "4130000000".into(),
                unit: 1,
                password: "admin-password".into(),
            })
            .await
            .unwrap();
        assert!(seeded.is_some(), "admin must be seeded first");
        app.users
            .login("admin@example.com", "admin-password")
            .await
            .unwrap()
            .token
    }

    fn booking(start: &str, end: &str) -> Value {
        json!({
            "date": "2030-06-11",
            "start_time": format!("2030-06-11T{start}:00"),
            "end_time": format!("2030-06-11T{end}:00"),
            "note": "birthday",
        })
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = app();
        let resp = call(&app.router, "GET", "/health", None, None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn reservations_require_token() {
        let app = app();
        let resp = call(&app.router, "GET", "/api/v1/reservations", None, None).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(resp).await["code"], "unauthorized");
    }

    #[tokio::test]
    async fn login_returns_token() {
        let app = app();
        register(&app.router, "Ana", 101).await;

        let resp = call(
            &app.router,
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "ana@example.com", "password": "correct-horse"})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["data"]["token_type"], "Bearer");

        let bad = call(
            &app.router,
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "ana@example.com", "password": "wrong-password"})),
        )
        .await;
        assert_eq!(bad.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_then_overlap_conflicts() {
        let app = app();
        let (token, user_id) = register(&app.router, "Ana", 101).await;

        let resp = call(
            &app.router,
            "POST",
            "/api/v1/reservations",
            Some(&token),
            Some(booking("10:00", "12:00")),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = json_body(resp).await;
        assert_eq!(body["data"]["status"], "pending");
        assert_eq!(body["data"]["owner"]["id"], user_id);

        let resp = call(
            &app.router,
            "POST",
            "/api/v1/reservations",
            Some(&token),
            Some(booking("11:00", "13:00")),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(json_body(resp).await["code"], "conflict");

        let resp = call(
            &app.router,
            "GET",
            "/api/v1/reservations/conflicts?date=2030-06-11&start_time=2030-06-11T12:00:00&end_time=2030-06-11T14:00:00",
            Some(&token),
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["data"]["available"], true);
    }

    #[tokio::test]
    async fn outside_business_hours_is_rejected() {
        let app = app();
        let (token, _) = register(&app.router, "Ana", 101).await;

        let resp = call(
            &app.router,
            "POST",
            "/api/v1/reservations",
            Some(&token),
            Some(booking("21:00", "23:00")),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn residents_cannot_touch_other_bookings() {
        let app = app();
        let (ana, _) = register(&app.router, "Ana", 101).await;
        let (bruno, _) = register(&app.router, "Bruno", 102).await;

        let resp = call(
            &app.router,
            "POST",
            "/api/v1/reservations",
            Some(&ana),
            Some(booking("10:00", "12:00")),
        )
        .await;
        let id = json_body(resp).await["data"]["id"].as_i64().unwrap();
        let uri = format!("/api/v1/reservations/{id}");

        let resp = call(&app.router, "DELETE", &uri, Some(&bruno), None).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = call(
            &app.router,
            "PUT",
            &uri,
            Some(&bruno),
            Some(json!({"note": "mine now"})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        // reading is allowed
        let resp = call(&app.router, "GET", &uri, Some(&bruno), None).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn only_admin_confirms() {
        let app = app();
        let admin = admin_token(&app).await;
        let (ana, _) = register(&app.router, "Ana", 101).await;

        let resp = call(
            &app.router,
            "POST",
            "/api/v1/reservations",
            Some(&ana),
            Some(booking("10:00", "12:00")),
        )
        .await;
        let id = json_body(resp).await["data"]["id"].as_i64().unwrap();
        let uri = format!("/api/v1/reservations/{id}");

        let resp = call(
            &app.router,
            "PUT",
            &uri,
            Some(&ana),
            Some(json!({"status": "confirmed"})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = call(
            &app.router,
            "PUT",
            &uri,
            Some(&admin),
            Some(json!({"status": "confirmed"})),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["data"]["status"], "confirmed");

        // owner may still cancel, twice
        for _ in 0..2 {
            let resp = call(&app.router, "DELETE", &uri, Some(&ana), None).await;
            assert_eq!(resp.status(), StatusCode::OK);
            assert_eq!(json_body(resp).await["data"]["status"], "cancelled");
        }
    }

    #[tokio::test]
    async fn purge_is_admin_only() {
        let app = app();
        let admin = admin_token(&app).await;
        let (ana, _) = register(&app.router, "Ana", 101).await;

        let resp = call(
            &app.router,
            "POST",
            "/api/v1/reservations/purge",
            Some(&ana),
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp = call(
            &app.router,
            "POST",
            "/api/v1/reservations/purge?before=2030-06-10",
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["data"]["deleted"], 0);
        assert_eq!(body["data"]["before"], "2030-06-10");
    }

    #[tokio::test]
    async fn resident_cannot_book_for_someone_else() {
        let app = app();
        let (ana, _) = register(&app.router, "Ana", 101).await;
        let (_, bruno_id) = register(&app.router, "Bruno", 102).await;

        let mut body = booking("10:00", "12:00");
        body["user_id"] = json!(bruno_id);
        let resp = call(
            &app.router,
            "POST",
            "/api/v1/reservations",
            Some(&ana),
            Some(body),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn openapi_lists_reservation_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/reservations"));
        assert!(doc.paths.paths.contains_key("/api/v1/reservations/{id}"));
        assert!(doc.paths.paths.contains_key("/api/v1/reservations/purge"));
    }
}
