//! Session middleware: turns a Kratos session into a graph actor.

use axum::extract::{Request, State};
use axum::http::header::COOKIE;
use axum::middleware::Next;
use axum::response::Response;
use trellis_core::knowledge::user::{get_user_by_kratos_identity_id, User};
use trellis_core::Authentication;

use crate::auth::kratos::{SessionCredentials, SESSION_TOKEN_HEADER};
use crate::error::ApiError;
use crate::state::AppState;

/// Sessions are revalidated against Kratos after this long.
const SESSION_CACHE_TTL_SECS: u64 = 60;

/// The user behind the current request, available to handlers via request
/// extensions once the session middleware ran.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user: User,
}

/// Resolves the session credentials on the request into an
/// [`Authentication`] and, when a signed-up user stands behind it, an
/// [`AuthenticatedUser`] extension. Requests without a valid session proceed
/// as the public actor.
pub async fn session_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = match credentials_from_request(&request) {
        Some(credentials) => resolve_user(&state, &credentials).await?,
        None => None,
    };

    // Accounts that never finished signup only get their own identity on the
    // routes needed to finish it; everywhere else they act as the public
    // actor.
    let user = user.filter(|user| {
        user.is_account_signup_complete || is_signup_route(request.uri().path())
    });

    let authentication = user
        .as_ref()
        .map(|user| Authentication {
            actor_id: user.account_id,
        })
        .unwrap_or_else(Authentication::public);

    request.extensions_mut().insert(authentication);
    if let Some(user) = user {
        request.extensions_mut().insert(AuthenticatedUser { user });
    }

    Ok(next.run(request).await)
}

fn is_signup_route(path: &str) -> bool {
    path.starts_with("/entities") || path.starts_with("/entity-types")
}

fn credentials_from_request(request: &Request) -> Option<SessionCredentials> {
    if let Some(token) = request
        .headers()
        .get(SESSION_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
    {
        return Some(SessionCredentials::SessionToken(token.to_string()));
    }
    request
        .headers()
        .get(COOKIE)
        .and_then(|value| value.to_str().ok())
        .filter(|cookie| cookie.contains("ory_kratos_session"))
        .map(|cookie| SessionCredentials::Cookie(cookie.to_string()))
}

async fn resolve_user(
    state: &AppState,
    credentials: &SessionCredentials,
) -> Result<Option<User>, ApiError> {
    let Some(kratos) = &state.kratos else {
        return Ok(None);
    };

    let (identity_id, from_cache) = match cached_identity_id(state, credentials).await {
        Some(identity_id) => (Some(identity_id), true),
        None => {
            let identity_id = kratos
                .whoami(credentials)
                .await?
                .and_then(|session| session.identity)
                .map(|identity| identity.id);
            if let (Some(cache), Some(identity_id)) = (&state.cache, &identity_id) {
                if let Err(err) = trellis_cache::set_json_ex(
                    cache,
                    &credentials.cache_key(),
                    identity_id,
                    SESSION_CACHE_TTL_SECS,
                )
                .await
                {
                    tracing::warn!(error = %err, "failed to cache session identity");
                }
            }
            (identity_id, false)
        }
    };

    let Some(identity_id) = identity_id else {
        return Ok(None);
    };

    // The user entity is looked up as the system account: the session is
    // proven, but the actor behind it is not yet known to the graph.
    let system = Authentication {
        actor_id: state.ctx.system_account,
    };
    let user = get_user_by_kratos_identity_id(&state.ctx, system, &identity_id).await?;

    // A cached session can outlive its user entity; drop the entry so the
    // next request re-resolves against Kratos instead of riding out the TTL.
    if user.is_none() && from_cache {
        if let Some(cache) = &state.cache {
            if let Err(err) = trellis_cache::delete(cache, &credentials.cache_key()).await {
                tracing::warn!(error = %err, "failed to evict stale session cache entry");
            }
        }
    }

    Ok(user)
}

async fn cached_identity_id(
    state: &AppState,
    credentials: &SessionCredentials,
) -> Option<String> {
    let cache = state.cache.as_ref()?;
    match trellis_cache::get_json::<String>(cache, &credentials.cache_key()).await {
        Ok(identity_id) => identity_id,
        Err(err) => {
            tracing::warn!(error = %err, "session cache lookup failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_without_a_kratos_session_is_ignored() {
        let request = Request::builder()
            .uri("/")
            .header(COOKIE, "theme=dark")
            .body(axum::body::Body::empty())
            .unwrap();
        assert!(credentials_from_request(&request).is_none());
    }

    #[test]
    fn session_token_takes_precedence_over_cookies() {
        let request = Request::builder()
            .uri("/")
            .header(SESSION_TOKEN_HEADER, "tok-1")
            .header(COOKIE, "ory_kratos_session=abc")
            .body(axum::body::Body::empty())
            .unwrap();
        assert!(matches!(
            credentials_from_request(&request),
            Some(SessionCredentials::SessionToken(token)) if token == "tok-1"
        ));
    }

    #[test]
    fn signup_routes_keep_incomplete_accounts() {
        assert!(is_signup_route("/entities/update"));
        assert!(is_signup_route("/entity-types/query"));
        assert!(!is_signup_route("/rpc/echo"));
    }
}
