//! Thin client for the Ory Kratos session API.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// Header carrying a Kratos session token for non-browser clients.
pub const SESSION_TOKEN_HEADER: &str = "x-session-token";

/// How a request proves its session.
#[derive(Debug, Clone)]
pub enum SessionCredentials {
    /// The raw `Cookie` header, forwarded as-is.
    Cookie(String),
    SessionToken(String),
}

impl SessionCredentials {
    /// Cache-key form; the raw credential scopes the cached identity to
    /// exactly one session.
    pub fn cache_key(&self) -> String {
        match self {
            Self::Cookie(cookie) => format!("session:cookie:{cookie}"),
            Self::SessionToken(token) => format!("session:token:{token}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KratosIdentity {
    pub id: String,
    #[serde(default)]
    pub traits: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KratosSession {
    pub id: String,
    #[serde(default)]
    pub active: bool,
    pub identity: Option<KratosIdentity>,
}

#[derive(Clone)]
pub struct KratosClient {
    base_url: String,
    http: reqwest::Client,
}

impl KratosClient {
    pub fn new(public_url: &str, http: reqwest::Client) -> Self {
        Self {
            base_url: public_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    /// Resolves the session behind the credentials via `GET /sessions/whoami`.
    /// An invalid or expired session is `None`, not an error.
    pub async fn whoami(
        &self,
        credentials: &SessionCredentials,
    ) -> Result<Option<KratosSession>, ApiError> {
        let mut request = self.http.get(format!("{}/sessions/whoami", self.base_url));
        request = match credentials {
            SessionCredentials::Cookie(cookie) => request.header(reqwest::header::COOKIE, cookie),
            SessionCredentials::SessionToken(token) => {
                request.header(SESSION_TOKEN_HEADER, token)
            }
        };

        let response = request
            .send()
            .await
            .map_err(|err| ApiError::Upstream(format!("session lookup failed: {err}")))?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(ApiError::Upstream(format!(
                "session lookup returned {}",
                response.status()
            )));
        }

        let session: KratosSession = response
            .json()
            .await
            .map_err(|err| ApiError::Upstream(format!("malformed session response: {err}")))?;
        Ok(session.active.then_some(session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn whoami_forwards_the_session_token() {
        let server = MockServer::start();
        let whoami = server.mock(|when, then| {
            when.method(GET)
                .path("/sessions/whoami")
                .header(SESSION_TOKEN_HEADER, "tok-123");
            then.status(200).json_body(json!({
                "id": "session-1",
                "active": true,
                "identity": { "id": "identity-1", "traits": {} }
            }));
        });

        let client = KratosClient::new(&server.base_url(), reqwest::Client::new());
        let session = client
            .whoami(&SessionCredentials::SessionToken("tok-123".to_string()))
            .await
            .unwrap()
            .unwrap();

        whoami.assert();
        assert_eq!(session.identity.unwrap().id, "identity-1");
    }

    #[tokio::test]
    async fn unauthorized_sessions_resolve_to_none() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/sessions/whoami");
            then.status(401).json_body(json!({ "error": "no session" }));
        });

        let client = KratosClient::new(&server.base_url(), reqwest::Client::new());
        let session = client
            .whoami(&SessionCredentials::Cookie("ory_kratos_session=gone".to_string()))
            .await
            .unwrap();

        assert!(session.is_none());
    }

    #[tokio::test]
    async fn inactive_sessions_resolve_to_none() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/sessions/whoami");
            then.status(200).json_body(json!({
                "id": "session-1",
                "active": false,
                "identity": { "id": "identity-1" }
            }));
        });

        let client = KratosClient::new(&server.base_url(), reqwest::Client::new());
        let session = client
            .whoami(&SessionCredentials::SessionToken("tok".to_string()))
            .await
            .unwrap();

        assert!(session.is_none());
    }
}
