//! HTTP surface of the entity-type operations.

use axum::extract::{Query, State};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use trellis_core::ontology::entity_type::{
    archive_entity_type, check_permissions_on_entity_type, create_entity_type,
    get_closed_entity_types, get_closed_multi_entity_types, get_entity_type_by_id,
    get_entity_type_subgraph, get_entity_type_subgraph_by_id, get_entity_types,
    unarchive_entity_type, update_entity_type, update_entity_types, CreateEntityTypeParams,
    GetEntityTypeSubgraphByIdRequest, GetEntityTypeSubgraphRequest, GetEntityTypesRequest,
    UpdateEntityTypeParams,
};
use trellis_core::Authentication;
use trellis_graph::client::GetClosedMultiEntityTypesParams;
use trellis_graph::filter::{Filter, QueryTemporalAxes};
use trellis_graph::types::{EntityTypeDefinition, VersionedUrl, WebId};

use crate::error::ApiError;
use crate::state::AppState;

fn require_actor(authentication: Authentication) -> Result<Authentication, ApiError> {
    if authentication.is_public() {
        return Err(ApiError::Unauthenticated(
            "This request requires authentication".to_string(),
        ));
    }
    Ok(authentication)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEntityTypeBody {
    pub web_id: WebId,
    pub schema: EntityTypeDefinition,
    #[serde(default)]
    pub web_shortname: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    Extension(authentication): Extension<Authentication>,
    Json(body): Json<CreateEntityTypeBody>,
) -> Result<Json<Value>, ApiError> {
    let authentication = require_actor(authentication)?;
    let entity_type = create_entity_type(
        &state.ctx,
        authentication,
        CreateEntityTypeParams {
            web_id: body.web_id,
            schema: body.schema,
            web_shortname: body.web_shortname,
            provenance: None,
        },
    )
    .await?;
    Ok(Json(json!(entity_type)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryEntityTypesBody {
    pub filter: Filter,
    pub temporal_axes: QueryTemporalAxes,
    /// Also resolve each type against its ancestors.
    #[serde(default)]
    pub include_closed: bool,
}

pub async fn query(
    State(state): State<AppState>,
    Extension(authentication): Extension<Authentication>,
    Json(body): Json<QueryEntityTypesBody>,
) -> Result<Json<Value>, ApiError> {
    let request = GetEntityTypesRequest {
        filter: body.filter,
        temporal_axes: body.temporal_axes,
    };
    if body.include_closed {
        let closed = get_closed_entity_types(&state.ctx, authentication, request).await?;
        return Ok(Json(json!({ "closedEntityTypes": closed })));
    }
    let entity_types = get_entity_types(&state.ctx, authentication, request).await?;
    Ok(Json(json!({ "entityTypes": entity_types })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySubgraphBody {
    pub filter: Filter,
    #[serde(default)]
    pub graph_resolve_depths: Value,
    pub temporal_axes: QueryTemporalAxes,
}

pub async fn query_subgraph(
    State(state): State<AppState>,
    Extension(authentication): Extension<Authentication>,
    Json(body): Json<QuerySubgraphBody>,
) -> Result<Json<Value>, ApiError> {
    let subgraph = get_entity_type_subgraph(
        &state.ctx,
        authentication,
        GetEntityTypeSubgraphRequest {
            filter: body.filter,
            graph_resolve_depths: body.graph_resolve_depths,
            temporal_axes: body.temporal_axes,
        },
    )
    .await?;
    Ok(Json(json!({ "subgraph": subgraph })))
}

pub async fn query_closed_multi(
    State(state): State<AppState>,
    Extension(authentication): Extension<Authentication>,
    Json(params): Json<GetClosedMultiEntityTypesParams>,
) -> Result<Json<Value>, ApiError> {
    let result = get_closed_multi_entity_types(&state.ctx, authentication, params).await?;
    Ok(Json(json!(result)))
}

/// Versioned type URLs contain slashes, so by-id routes take the id as a
/// query parameter instead of a path segment.
#[derive(Debug, Deserialize)]
pub struct EntityTypeIdQuery {
    pub entity_type_id: VersionedUrl,
}

pub async fn resolve(
    State(state): State<AppState>,
    Extension(authentication): Extension<Authentication>,
    Query(query): Query<EntityTypeIdQuery>,
) -> Result<Json<Value>, ApiError> {
    let entity_type =
        get_entity_type_by_id(&state.ctx, authentication, &query.entity_type_id).await?;
    Ok(Json(json!(entity_type)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveSubgraphBody {
    pub entity_type_id: VersionedUrl,
    #[serde(default)]
    pub graph_resolve_depths: Value,
    pub temporal_axes: QueryTemporalAxes,
}

pub async fn resolve_subgraph(
    State(state): State<AppState>,
    Extension(authentication): Extension<Authentication>,
    Json(body): Json<ResolveSubgraphBody>,
) -> Result<Json<Value>, ApiError> {
    let subgraph = get_entity_type_subgraph_by_id(
        &state.ctx,
        authentication,
        GetEntityTypeSubgraphByIdRequest {
            entity_type_id: body.entity_type_id,
            graph_resolve_depths: body.graph_resolve_depths,
            temporal_axes: body.temporal_axes,
        },
    )
    .await?;
    Ok(Json(json!({ "subgraph": subgraph })))
}

pub async fn permissions(
    State(state): State<AppState>,
    Extension(authentication): Extension<Authentication>,
    Query(query): Query<EntityTypeIdQuery>,
) -> Result<Json<Value>, ApiError> {
    let permissions =
        check_permissions_on_entity_type(&state.ctx, authentication, &query.entity_type_id)
            .await?;
    Ok(Json(json!(permissions)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEntityTypeBody {
    pub entity_type_id: VersionedUrl,
    pub schema: EntityTypeDefinition,
}

impl From<UpdateEntityTypeBody> for UpdateEntityTypeParams {
    fn from(body: UpdateEntityTypeBody) -> Self {
        Self {
            entity_type_id: body.entity_type_id,
            schema: body.schema,
            provenance: None,
        }
    }
}

pub async fn update(
    State(state): State<AppState>,
    Extension(authentication): Extension<Authentication>,
    Json(body): Json<UpdateEntityTypeBody>,
) -> Result<Json<Value>, ApiError> {
    let authentication = require_actor(authentication)?;
    let entity_type = update_entity_type(&state.ctx, authentication, body.into()).await?;
    Ok(Json(json!(entity_type)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEntityTypesBody {
    pub updates: Vec<UpdateEntityTypeBody>,
}

pub async fn update_bulk(
    State(state): State<AppState>,
    Extension(authentication): Extension<Authentication>,
    Json(body): Json<UpdateEntityTypesBody>,
) -> Result<Json<Value>, ApiError> {
    let authentication = require_actor(authentication)?;
    let entity_types = update_entity_types(
        &state.ctx,
        authentication,
        body.updates.into_iter().map(Into::into).collect(),
    )
    .await?;
    Ok(Json(json!(entity_types)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveBody {
    pub entity_type_id: VersionedUrl,
}

pub async fn archive(
    State(state): State<AppState>,
    Extension(authentication): Extension<Authentication>,
    Json(body): Json<ArchiveBody>,
) -> Result<Json<Value>, ApiError> {
    let authentication = require_actor(authentication)?;
    let temporal_metadata =
        archive_entity_type(&state.ctx, authentication, body.entity_type_id).await?;
    Ok(Json(json!(temporal_metadata)))
}

pub async fn unarchive(
    State(state): State<AppState>,
    Extension(authentication): Extension<Authentication>,
    Json(body): Json<ArchiveBody>,
) -> Result<Json<Value>, ApiError> {
    let authentication = require_actor(authentication)?;
    let temporal_metadata =
        unarchive_entity_type(&state.ctx, authentication, body.entity_type_id).await?;
    Ok(Json(json!(temporal_metadata)))
}
