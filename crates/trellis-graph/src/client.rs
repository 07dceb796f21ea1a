//! Graph API connection client.

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::filter::{Filter, QueryTemporalAxes};
use crate::patches::PropertyPatch;
use crate::types::{
    ActorId, EditionProvenance, Entity, EntityTypeMetadata, EntityTypeSchema,
    EntityTypeWithMetadata, OntologyTemporalMetadata, Subgraph, VersionedUrl, WebId,
};

/// Actor id header attached to every authenticated Graph API call.
pub const ACTOR_ID_HEADER: &str = "x-authenticated-actor-id";

/// Graph API error types.
#[derive(Error, Debug)]
pub enum GraphApiError {
    #[error("Graph API transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Graph API responded with {status}: {message}")]
    Api { status: StatusCode, message: String },

    #[error("Failed to decode Graph API response: {0}")]
    Decode(#[source] reqwest::Error),
}

impl GraphApiError {
    /// The upstream HTTP status, when the error is an API response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type for Graph API operations.
pub type GraphResult<T> = Result<T, GraphApiError>;

/// Configuration for connecting to the Graph API.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphApiConfig {
    pub host: String,
    pub port: u16,
}

impl GraphApiConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// Client for the remote Graph API.
#[derive(Clone)]
pub struct GraphApiClient {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEntityTypeRequest {
    pub web_id: WebId,
    pub schema: EntityTypeSchema,
    pub provenance: EditionProvenance,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEntityTypeRequest {
    pub type_to_update: VersionedUrl,
    pub schema: EntityTypeSchema,
    pub provenance: EditionProvenance,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetEntityTypesParams {
    pub filter: Filter,
    pub temporal_axes: QueryTemporalAxes,
    pub include_drafts: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_entity_types: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetEntityTypesResponse {
    pub entity_types: Vec<EntityTypeWithMetadata>,
    #[serde(default)]
    pub closed_entity_types: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetEntityTypeSubgraphParams {
    pub filter: Filter,
    pub graph_resolve_depths: serde_json::Value,
    pub temporal_axes: QueryTemporalAxes,
    pub include_drafts: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetEntityTypeSubgraphResponse {
    pub subgraph: Subgraph,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetClosedMultiEntityTypesParams {
    pub entity_type_ids: Vec<Vec<VersionedUrl>>,
    pub temporal_axes: QueryTemporalAxes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_resolved: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetClosedMultiEntityTypesResponse {
    pub entity_types: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub definitions: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveEntityTypeParams {
    pub type_to_archive: VersionedUrl,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnarchiveEntityTypeParams {
    pub type_to_unarchive: VersionedUrl,
    pub provenance: EditionProvenance,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct PermissionCheckRequest<'a> {
    entity_type_ids: &'a [VersionedUrl],
    action: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PermissionCheckResponse {
    permitted: Vec<VersionedUrl>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryEntitiesParams {
    pub filter: Filter,
    pub temporal_axes: QueryTemporalAxes,
    pub include_drafts: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryEntitiesResponse {
    entities: Vec<Entity>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchEntityParams {
    pub entity_id: crate::types::EntityId,
    pub property_patches: Vec<PropertyPatch>,
    pub provenance: EditionProvenance,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebRecord {
    shortname: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SystemAccountResponse {
    actor_id: ActorId,
}

impl GraphApiClient {
    pub fn new(config: &GraphApiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            base_url: config.base_url(),
            client,
        }
    }

    /// Base URL this client talks to, mostly useful in logs.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        actor: Option<ActorId>,
        body: Option<&impl Serialize>,
    ) -> GraphResult<T> {
        let mut request = self
            .client
            .request(method.clone(), format!("{}{}", self.base_url, path));

        if let Some(actor) = actor {
            request = request.header(ACTOR_ID_HEADER, actor.to_string());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GraphApiError::Api { status, message });
        }

        debug!(%method, path, %status, "graph api call");
        response.json().await.map_err(GraphApiError::Decode)
    }

    pub async fn create_entity_type(
        &self,
        actor: ActorId,
        request: &CreateEntityTypeRequest,
    ) -> GraphResult<EntityTypeMetadata> {
        self.send(Method::POST, "/entity-types", Some(actor), Some(request))
            .await
    }

    pub async fn update_entity_type(
        &self,
        actor: ActorId,
        request: &UpdateEntityTypeRequest,
    ) -> GraphResult<EntityTypeMetadata> {
        self.send(Method::PUT, "/entity-types", Some(actor), Some(request))
            .await
    }

    pub async fn update_entity_types(
        &self,
        actor: ActorId,
        requests: &[UpdateEntityTypeRequest],
    ) -> GraphResult<Vec<EntityTypeMetadata>> {
        self.send(Method::PUT, "/entity-types/bulk", Some(actor), Some(&requests))
            .await
    }

    pub async fn get_entity_types(
        &self,
        actor: ActorId,
        params: &GetEntityTypesParams,
    ) -> GraphResult<GetEntityTypesResponse> {
        self.send(Method::POST, "/entity-types/query", Some(actor), Some(params))
            .await
    }

    pub async fn get_entity_type_subgraph(
        &self,
        actor: ActorId,
        params: &GetEntityTypeSubgraphParams,
    ) -> GraphResult<Subgraph> {
        let response: GetEntityTypeSubgraphResponse = self
            .send(
                Method::POST,
                "/entity-types/query/subgraph",
                Some(actor),
                Some(params),
            )
            .await?;
        Ok(response.subgraph)
    }

    pub async fn get_closed_multi_entity_types(
        &self,
        actor: ActorId,
        params: &GetClosedMultiEntityTypesParams,
    ) -> GraphResult<GetClosedMultiEntityTypesResponse> {
        self.send(
            Method::POST,
            "/entity-types/query/closed-multi",
            Some(actor),
            Some(params),
        )
        .await
    }

    pub async fn archive_entity_type(
        &self,
        actor: ActorId,
        params: &ArchiveEntityTypeParams,
    ) -> GraphResult<OntologyTemporalMetadata> {
        self.send(Method::PUT, "/entity-types/archive", Some(actor), Some(params))
            .await
    }

    pub async fn unarchive_entity_type(
        &self,
        actor: ActorId,
        params: &UnarchiveEntityTypeParams,
    ) -> GraphResult<OntologyTemporalMetadata> {
        self.send(
            Method::PUT,
            "/entity-types/unarchive",
            Some(actor),
            Some(params),
        )
        .await
    }

    /// Load an externally-hosted entity type into the Graph.
    pub async fn load_external_entity_type(
        &self,
        actor: ActorId,
        entity_type_id: &VersionedUrl,
    ) -> GraphResult<EntityTypeMetadata> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct LoadExternalRequest<'a> {
            entity_type_id: &'a VersionedUrl,
        }

        self.send(
            Method::POST,
            "/entity-types/load-external",
            Some(actor),
            Some(&LoadExternalRequest { entity_type_id }),
        )
        .await
    }

    /// Which of the given entity types the actor may perform `action` on.
    pub async fn has_permission_for_entity_types(
        &self,
        actor: ActorId,
        entity_type_ids: &[VersionedUrl],
        action: &str,
    ) -> GraphResult<Vec<VersionedUrl>> {
        let response: PermissionCheckResponse = self
            .send(
                Method::POST,
                "/permissions/entity-types",
                Some(actor),
                Some(&PermissionCheckRequest {
                    entity_type_ids,
                    action,
                }),
            )
            .await?;
        Ok(response.permitted)
    }

    /// Grant `actor_id` administrator rights on an actor group (a web).
    pub async fn add_actor_group_administrator(
        &self,
        acting_as: ActorId,
        actor_id: ActorId,
        actor_group_id: ActorId,
    ) -> GraphResult<()> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct AddAdministratorRequest {
            actor_id: ActorId,
        }

        let _: serde_json::Value = self
            .send(
                Method::POST,
                &format!("/actor-groups/{actor_group_id}/administrators"),
                Some(acting_as),
                Some(&AddAdministratorRequest { actor_id }),
            )
            .await?;
        Ok(())
    }

    /// Shortname of the web owning types under it.
    pub async fn get_web_shortname(&self, actor: ActorId, web_id: WebId) -> GraphResult<String> {
        let web: WebRecord = self
            .send(
                Method::GET,
                &format!("/webs/{web_id}"),
                Some(actor),
                None::<&()>,
            )
            .await?;
        Ok(web.shortname)
    }

    pub async fn query_entities(
        &self,
        actor: ActorId,
        params: &QueryEntitiesParams,
    ) -> GraphResult<Vec<Entity>> {
        let response: QueryEntitiesResponse = self
            .send(Method::POST, "/entities/query", Some(actor), Some(params))
            .await?;
        Ok(response.entities)
    }

    pub async fn patch_entity(
        &self,
        actor: ActorId,
        params: &PatchEntityParams,
    ) -> GraphResult<Entity> {
        self.send(Method::PATCH, "/entities", Some(actor), Some(params))
            .await
    }

    /// Resolve the machine account the instance acts as. The Graph API
    /// creates it on first call, so this is safe to run on every boot.
    pub async fn get_or_create_system_account(&self) -> GraphResult<ActorId> {
        let response: SystemAccountResponse = self
            .send(Method::GET, "/accounts/system", None, None::<&()>)
            .await?;
        Ok(response.actor_id)
    }
}
