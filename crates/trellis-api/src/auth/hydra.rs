//! Ory Hydra admin client and the OAuth2 consent handlers.

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

/// Consent request as Hydra's admin API reports it. Only the fields the
/// consent decision needs are typed; the rest rides along for the frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentRequest {
    pub challenge: String,
    #[serde(default)]
    pub skip: bool,
    #[serde(default)]
    pub requested_scope: Vec<String>,
    #[serde(default)]
    pub requested_access_token_audience: Vec<String>,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletedRequest {
    pub redirect_to: String,
}

#[derive(Clone)]
pub struct HydraClient {
    admin_url: String,
    http: reqwest::Client,
}

impl HydraClient {
    pub fn new(admin_url: &str, http: reqwest::Client) -> Self {
        Self {
            admin_url: admin_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    fn consent_url(&self, verb: Option<&str>) -> String {
        match verb {
            Some(verb) => format!(
                "{}/admin/oauth2/auth/requests/consent/{verb}",
                self.admin_url
            ),
            None => format!("{}/admin/oauth2/auth/requests/consent", self.admin_url),
        }
    }

    pub async fn get_consent_request(&self, challenge: &str) -> Result<ConsentRequest, ApiError> {
        let response = self
            .http
            .get(self.consent_url(None))
            .query(&[("consent_challenge", challenge)])
            .send()
            .await
            .map_err(|err| ApiError::Upstream(format!("consent lookup failed: {err}")))?;
        if !response.status().is_success() {
            return Err(ApiError::BadRequest(format!(
                "unknown consent challenge (upstream returned {})",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|err| ApiError::Upstream(format!("malformed consent request: {err}")))
    }

    pub async fn accept_consent_request(
        &self,
        challenge: &str,
        body: &Value,
    ) -> Result<CompletedRequest, ApiError> {
        self.put_consent_decision("accept", challenge, body).await
    }

    pub async fn reject_consent_request(
        &self,
        challenge: &str,
        body: &Value,
    ) -> Result<CompletedRequest, ApiError> {
        self.put_consent_decision("reject", challenge, body).await
    }

    async fn put_consent_decision(
        &self,
        verb: &str,
        challenge: &str,
        body: &Value,
    ) -> Result<CompletedRequest, ApiError> {
        let response = self
            .http
            .put(self.consent_url(Some(verb)))
            .query(&[("consent_challenge", challenge)])
            .json(body)
            .send()
            .await
            .map_err(|err| ApiError::Upstream(format!("consent {verb} failed: {err}")))?;
        if !response.status().is_success() {
            return Err(ApiError::Upstream(format!(
                "consent {verb} returned {}",
                response.status()
            )));
        }
        response
            .json()
            .await
            .map_err(|err| ApiError::Upstream(format!("malformed consent decision: {err}")))
    }
}

#[derive(Debug, Deserialize)]
pub struct ConsentChallengeQuery {
    pub consent_challenge: String,
}

/// `GET /oauth2/consent`: auto-accepts when Hydra says the user already
/// consented (`skip`), otherwise hands the consent request to the frontend
/// to render.
pub async fn get_consent(
    State(state): State<AppState>,
    Query(query): Query<ConsentChallengeQuery>,
) -> Result<Json<Value>, ApiError> {
    let hydra = state
        .hydra
        .as_ref()
        .ok_or_else(|| ApiError::Upstream("OAuth2 provider is not configured".to_string()))?;

    let consent_request = hydra.get_consent_request(&query.consent_challenge).await?;
    if consent_request.skip {
        let completed = hydra
            .accept_consent_request(
                &query.consent_challenge,
                &json!({
                    "grant_scope": consent_request.requested_scope,
                    "grant_access_token_audience":
                        consent_request.requested_access_token_audience,
                }),
            )
            .await?;
        return Ok(Json(json!({ "redirect_to": completed.redirect_to })));
    }

    Ok(Json(json!({ "consent_request": consent_request })))
}

#[derive(Debug, Deserialize)]
pub struct ConsentDecision {
    pub challenge: String,
    #[serde(default)]
    pub remember: bool,
    #[serde(default)]
    pub grant_scope: Option<Vec<String>>,
    /// `false` rejects the request on the user's behalf.
    #[serde(default = "default_accept")]
    pub accept: bool,
}

fn default_accept() -> bool {
    true
}

/// `POST /oauth2/consent`: submits the user's decision back to Hydra and
/// returns the URL to continue the OAuth2 flow at.
pub async fn post_consent(
    State(state): State<AppState>,
    Json(decision): Json<ConsentDecision>,
) -> Result<Json<Value>, ApiError> {
    let hydra = state
        .hydra
        .as_ref()
        .ok_or_else(|| ApiError::Upstream("OAuth2 provider is not configured".to_string()))?;

    let completed = if decision.accept {
        let consent_request = hydra.get_consent_request(&decision.challenge).await?;
        let grant_scope = decision
            .grant_scope
            .unwrap_or(consent_request.requested_scope);
        hydra
            .accept_consent_request(
                &decision.challenge,
                &json!({
                    "grant_scope": grant_scope,
                    "grant_access_token_audience":
                        consent_request.requested_access_token_audience,
                    "remember": decision.remember,
                    "remember_for": 3600,
                }),
            )
            .await?
    } else {
        hydra
            .reject_consent_request(
                &decision.challenge,
                &json!({
                    "error": "access_denied",
                    "error_description": "The resource owner denied the request",
                }),
            )
            .await?
    };

    Ok(Json(json!({ "redirect_to": completed.redirect_to })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn skipped_consent_is_accepted_automatically() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/admin/oauth2/auth/requests/consent")
                .query_param("consent_challenge", "chal-1");
            then.status(200).json_body(json!({
                "challenge": "chal-1",
                "skip": true,
                "requested_scope": ["openid"],
                "requested_access_token_audience": []
            }));
        });
        let accept = server.mock(|when, then| {
            when.method(PUT)
                .path("/admin/oauth2/auth/requests/consent/accept")
                .query_param("consent_challenge", "chal-1")
                .json_body_partial(r#"{ "grant_scope": ["openid"] }"#);
            then.status(200)
                .json_body(json!({ "redirect_to": "https://auth.example/continue" }));
        });

        let client = HydraClient::new(&server.base_url(), reqwest::Client::new());
        let request = client.get_consent_request("chal-1").await.unwrap();
        assert!(request.skip);

        let completed = client
            .accept_consent_request(
                "chal-1",
                &json!({ "grant_scope": request.requested_scope }),
            )
            .await
            .unwrap();
        accept.assert();
        assert_eq!(completed.redirect_to, "https://auth.example/continue");
    }

    #[tokio::test]
    async fn unknown_challenge_is_a_bad_request() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/admin/oauth2/auth/requests/consent");
            then.status(404).json_body(json!({ "error": "not found" }));
        });

        let client = HydraClient::new(&server.base_url(), reqwest::Client::new());
        let err = client.get_consent_request("missing").await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
