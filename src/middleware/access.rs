use axum::{
    extract::{Query, RawPathParams, Request, State},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::access::{authorize, resolve_client_id, AccessDirectory, AccessPolicy, Identity};
use crate::error::ApiError;

/// Request-scoped fallback for the client a call is about
pub const CLIENT_ID_HEADER: &str = "x-client-id";

/// Path parameter name used by client-scoped routes
const CLIENT_ID_PARAM: &str = "client_id";

/// Middleware state: the tier a group of routes belongs to
#[derive(Clone)]
pub struct AccessGuard {
    directory: Arc<dyn AccessDirectory>,
    policy: AccessPolicy,
}

impl AccessGuard {
    pub fn new(directory: Arc<dyn AccessDirectory>, policy: AccessPolicy) -> Self {
        Self { directory, policy }
    }
}

#[derive(Debug, Deserialize)]
struct ClientQuery {
    #[serde(rename = "clientId")]
    client_id: Option<String>,
}

/// Runs the access chain for the route's tier and attaches the resulting
/// [`crate::access::AccessContext`]. Mounted with `route_layer` so path
/// parameters are already matched.
pub async fn enforce_access(
    State(guard): State<AccessGuard>,
    path_params: Option<RawPathParams>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let from_path = path_params.as_ref().and_then(|params| {
        params
            .iter()
            .find(|(key, _)| *key == CLIENT_ID_PARAM)
            .map(|(_, value)| value.to_string())
    });
    let from_query = Query::<ClientQuery>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(query)| query.client_id);
    let from_header = request
        .headers()
        .get(CLIENT_ID_HEADER)
        .and_then(|value| value.to_str().ok());

    // Declared input is the path segment, then the query; the header is the
    // request-scoped fallback.
    let client_id = resolve_client_id(from_path.as_deref(), from_query.as_deref())
        .or_else(|| resolve_client_id(from_header, None));
    let identity = request.extensions().get::<Identity>().cloned();

    let context = authorize(guard.policy, identity, client_id, guard.directory.as_ref()).await?;
    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}
