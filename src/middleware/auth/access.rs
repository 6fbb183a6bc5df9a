//! Authentication filter: bearer token -> SecurityContext in request extensions.
//!
//! Runs once per request, in front of every route (public ones included):
//! - no header / no prefix      -> continue unauthenticated
//! - malformed / bad signature  -> log, continue unauthenticated (authorization
//!   further down rejects with 401/403 if the route needs a principal)
//! - expired                    -> stop here with 403 `{ "token": "expired" }`
//! - valid                      -> install the principal (if none yet), continue
//!
//! The context lives in the request's extensions, so it is dropped with the
//! request whatever the outcome.

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use crate::error::AppError;
use crate::services::auth::{SecurityContext, ValidationOutcome};
use crate::state::{AppState, BearerConfig};

/// Marks a request the filter has already processed.
#[derive(Clone, Copy, Debug)]
struct FilterApplied;

/// Wrap every route of `router` with the authentication filter.
///
/// 例：
/// ```ignore
/// let app = middleware::auth::access::apply(api::v1::routes(), state.clone());
/// ```
pub fn apply<S>(router: Router<S>, state: AppState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    // axum 0.8 の from_fn は State extractor を受け取れないため、`from_fn_with_state` で明示的に state を渡す
    router.layer(middleware::from_fn_with_state(state, authentication_filter))
}

pub async fn authentication_filter(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if req.extensions().get::<FilterApplied>().is_some() {
        return next.run(req).await;
    }
    req.extensions_mut().insert(FilterApplied);

    let mut ctx = req
        .extensions_mut()
        .remove::<SecurityContext>()
        .unwrap_or_default();

    match bearer_token(req.headers(), &state.bearer) {
        None => debug!("couldn't find bearer string, header will be ignored"),
        Some(token) => match state.validator.parse(token) {
            ValidationOutcome::Valid { principal, .. } => {
                let username = principal.username.clone();
                if ctx.install(principal) {
                    debug!(username = %username, "authenticated user, setting security context");
                }
            }
            ValidationOutcome::Expired => {
                warn!("the token has expired");
                return AppError::TokenExpired.into_response();
            }
            ValidationOutcome::Malformed(reason) => {
                warn!(reason = %reason, "this is not a valid token");
            }
            ValidationOutcome::BadSignature => {
                warn!("token signature verification failed");
            }
            ValidationOutcome::UnknownSubject => {
                warn!("token does not name a subject");
            }
        },
    }

    req.extensions_mut().insert(ctx);
    next.run(req).await
}

fn bearer_token<'a>(headers: &'a HeaderMap, bearer: &BearerConfig) -> Option<&'a str> {
    headers
        .get(&bearer.header_name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix(bearer.prefix.as_str()))
}
