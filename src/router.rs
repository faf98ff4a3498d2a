use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::access::AccessPolicy;
use crate::config::{config, AppConfig, Environment};
use crate::handlers::{client, elevated, protected, public};
use crate::middleware::{enforce_access, identity_middleware};
use crate::state::AppState;

/// Build the full application router.
///
/// Every route group is guarded by the access tier it belongs to. The
/// identity middleware runs first for all requests so the tier guards only
/// have to read the decoded identity.
pub fn app(state: AppState) -> Router {
    app_with_config(state, config())
}

pub fn app_with_config(state: AppState, config: &AppConfig) -> Router {
    let router = Router::new()
        .merge(public_routes(&state))
        .merge(protected_routes(&state))
        .merge(client_routes(&state))
        .merge(client_editor_routes(&state))
        .merge(premium_routes(&state))
        .merge(mfa_routes(&state))
        .merge(admin_routes(&state))
        .layer(from_fn(identity_middleware))
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes));

    let router = if config.security.enable_cors {
        router.layer(cors_layer(config))
    } else {
        router
    };

    let router = if config.api.enable_request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };

    router.with_state(state)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.environment == Environment::Development {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

fn guarded(state: &AppState, policy: AccessPolicy, router: Router<AppState>) -> Router<AppState> {
    router.route_layer(from_fn_with_state(state.guard(policy), enforce_access))
}

fn public_routes(state: &AppState) -> Router<AppState> {
    guarded(
        state,
        AccessPolicy::public(),
        Router::new()
            .route("/", get(public::root))
            .route("/health", get(public::health)),
    )
}

fn protected_routes(state: &AppState) -> Router<AppState> {
    guarded(
        state,
        AccessPolicy::protected(),
        Router::new()
            .route("/api/auth/whoami", get(protected::auth::whoami))
            .route("/api/clients", get(protected::clients::list)),
    )
}

/// Read access for any member of the client
fn client_routes(state: &AppState) -> Router<AppState> {
    guarded(
        state,
        AccessPolicy::client(),
        Router::new()
            .route("/api/clients/:client_id", get(client::overview::show))
            .route("/api/clients/:client_id/members", get(client::members::list))
            .route("/api/clients/:client_id/controls", get(client::controls::list))
            .route("/api/clients/:client_id/compliance", get(client::compliance::summary))
            .route("/api/clients/:client_id/board", get(client::board::show)),
    )
}

/// Writes; viewers are rejected
fn client_editor_routes(state: &AppState) -> Router<AppState> {
    guarded(
        state,
        AccessPolicy::client_editor(),
        Router::new()
            .route("/api/clients/:client_id/members", post(client::members::add))
            .route(
                "/api/clients/:client_id/members/:user_id",
                patch(client::members::update_role).delete(client::members::remove),
            )
            .route("/api/clients/:client_id/controls/:id", patch(client::controls::update))
            .route("/api/clients/:client_id/board/move", post(client::board::move_item)),
    )
}

/// Pro and enterprise plans only
fn premium_routes(state: &AppState) -> Router<AppState> {
    guarded(
        state,
        AccessPolicy::premium(),
        Router::new().route(
            "/api/clients/:client_id/evidence/suggestions",
            post(client::evidence::suggestions),
        ),
    )
}

/// Security-sensitive surfaces honour the client's MFA requirement
fn mfa_routes(state: &AppState) -> Router<AppState> {
    let read = guarded(
        state,
        AccessPolicy::mfa(),
        Router::new().route("/api/clients/:client_id/audit-log", get(client::security::audit_log)),
    );

    let write = guarded(
        state,
        AccessPolicy::client_editor().with_mfa(),
        Router::new().route("/api/clients/:client_id/security", put(client::security::update_security)),
    );

    read.merge(write)
}

fn admin_routes(state: &AppState) -> Router<AppState> {
    guarded(
        state,
        AccessPolicy::admin(),
        Router::new()
            .route(
                "/api/admin/clients",
                get(elevated::clients::list_all).post(elevated::clients::create),
            )
            .route("/api/admin/clients/:client_id/plan", put(elevated::clients::set_plan)),
    )
}
