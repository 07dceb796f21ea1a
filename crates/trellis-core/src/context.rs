//! Shared context threaded through domain operations.

use std::sync::Arc;

use async_trait::async_trait;
use trellis_graph::types::{ActorId, EditionProvenance};
use trellis_graph::GraphApiClient;
use uuid::Uuid;

use crate::error::DomainResult;

/// Actor id used for unauthenticated requests. The Graph API knows this id
/// and scopes it to public data.
pub const PUBLIC_ACTOR_ID: ActorId = ActorId(Uuid::nil());

/// The acting account behind a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Authentication {
    pub actor_id: ActorId,
}

impl Authentication {
    pub fn public() -> Self {
        Self {
            actor_id: PUBLIC_ACTOR_ID,
        }
    }

    pub fn is_public(&self) -> bool {
        self.actor_id == PUBLIC_ACTOR_ID
    }
}

/// Instance-level settings domain operations depend on.
#[derive(Debug, Clone)]
pub struct InstanceSettings {
    /// URL new ontology type ids are minted under, e.g. `https://app.trellis.dev`.
    pub frontend_url: String,
    /// Self-hosted instances skip the hosted access checks.
    pub self_hosted: bool,
    /// For hosted instances: emails (`ada@example.com`) or whole domains
    /// (`@example.com`) granted access.
    pub email_allowlist: Option<Vec<String>>,
}

/// External workflow that turns text into an embedding vector, used to
/// rewrite semantic filters before they reach the Graph API. The workflow
/// engine itself is an external collaborator; only this call contract is
/// modeled.
#[async_trait]
pub trait EmbeddingWorkflow: Send + Sync {
    async fn embed_text(&self, text: &str) -> DomainResult<Vec<f32>>;
}

/// Everything a domain operation needs besides its own parameters.
#[derive(Clone)]
pub struct GraphContext {
    pub graph: GraphApiClient,
    /// Default edition provenance, merged with per-call overrides.
    pub provenance: EditionProvenance,
    /// Machine account the instance acts as for privileged calls.
    pub system_account: ActorId,
    pub instance: InstanceSettings,
    pub embedder: Option<Arc<dyn EmbeddingWorkflow>>,
}

impl GraphContext {
    /// Provenance for a call, preferring the per-call override.
    pub fn provenance_for(&self, call: Option<EditionProvenance>) -> EditionProvenance {
        call.unwrap_or_else(|| self.provenance.clone())
    }
}
