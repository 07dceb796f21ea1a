//! Entity-type operations.
//!
//! Thin wrappers around the Graph API: validate parameters, force the
//! flags the front door owns (`include_drafts` is never exposed), forward,
//! and re-shape the response.

use futures::future::{BoxFuture, FutureExt};
use futures::try_join;
use serde::Serialize;
use serde_json::Value;
use trellis_graph::client::{
    ArchiveEntityTypeParams, CreateEntityTypeRequest, GetClosedMultiEntityTypesParams,
    GetEntityTypeSubgraphParams, GetEntityTypesParams, UnarchiveEntityTypeParams,
    UpdateEntityTypeRequest,
};
use trellis_graph::filter::{Filter, QueryTemporalAxes};
use trellis_graph::types::{
    ClosedEntityTypeSchema, ClosedEntityTypeWithMetadata, EditionProvenance,
    EntityTypeDefinition, EntityTypeReference, EntityTypeSchema, EntityTypeWithMetadata,
    OntologyTemporalMetadata, Subgraph, VersionedUrl, WebId, LINK_ENTITY_TYPE_ID,
};

use super::{generate_type_id, is_external_type_id, rewrite_semantic_filter, OntologyTypeKind};
use crate::context::{Authentication, GraphContext};
use crate::error::{DomainError, DomainResult};

/// What the current actor may do with an entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UserPermissionsOnEntityType {
    pub edit: bool,
    pub instantiate: bool,
    pub view: bool,
}

/// Check edit/instantiate permissions for one entity type.
///
/// The public actor is never permitted to edit or instantiate; both checks
/// for everyone else run against the Graph API concurrently.
pub async fn check_permissions_on_entity_type(
    ctx: &GraphContext,
    authentication: Authentication,
    entity_type_id: &VersionedUrl,
) -> DomainResult<UserPermissionsOnEntityType> {
    if authentication.is_public() {
        return Ok(UserPermissionsOnEntityType {
            edit: false,
            instantiate: false,
            view: true,
        });
    }

    let ids = std::slice::from_ref(entity_type_id);
    let (can_update, can_instantiate) = try_join!(
        ctx.graph
            .has_permission_for_entity_types(authentication.actor_id, ids, "updateEntityType"),
        ctx.graph
            .has_permission_for_entity_types(authentication.actor_id, ids, "instantiate"),
    )?;

    Ok(UserPermissionsOnEntityType {
        edit: can_update.contains(entity_type_id),
        instantiate: can_instantiate.contains(entity_type_id),
        view: true,
    })
}

#[derive(Debug, Clone)]
pub struct CreateEntityTypeParams {
    /// The web that will own the entity type.
    pub web_id: WebId,
    pub schema: EntityTypeDefinition,
    /// Shortname of the owning web when it is not resolvable yet (seeding
    /// only); callers are responsible for it matching `web_id`.
    pub web_shortname: Option<String>,
    pub provenance: Option<EditionProvenance>,
}

/// Create an entity type owned by a web, minting its versioned URL from the
/// web shortname and the schema title.
pub async fn create_entity_type(
    ctx: &GraphContext,
    authentication: Authentication,
    params: CreateEntityTypeParams,
) -> DomainResult<EntityTypeWithMetadata> {
    let shortname = match params.web_shortname {
        Some(shortname) => shortname,
        None => {
            ctx.graph
                .get_web_shortname(authentication.actor_id, params.web_id)
                .await?
        }
    };

    let entity_type_id = generate_type_id(
        &ctx.instance.frontend_url,
        &shortname,
        OntologyTypeKind::EntityType,
        &params.schema.title,
    );
    let schema = EntityTypeSchema::from_definition(entity_type_id, params.schema);

    let metadata = ctx
        .graph
        .create_entity_type(
            authentication.actor_id,
            &CreateEntityTypeRequest {
                web_id: params.web_id,
                schema: schema.clone(),
                provenance: ctx.provenance_for(params.provenance),
            },
        )
        .await?;

    Ok(EntityTypeWithMetadata { schema, metadata })
}

#[derive(Debug, Clone)]
pub struct GetEntityTypesRequest {
    pub filter: Filter,
    pub temporal_axes: QueryTemporalAxes,
}

/// Get entity types by a structural query.
pub async fn get_entity_types(
    ctx: &GraphContext,
    authentication: Authentication,
    mut request: GetEntityTypesRequest,
) -> DomainResult<Vec<EntityTypeWithMetadata>> {
    rewrite_semantic_filter(ctx.embedder.as_deref(), &mut request.filter).await?;

    let response = ctx
        .graph
        .get_entity_types(
            authentication.actor_id,
            &GetEntityTypesParams {
                filter: request.filter,
                temporal_axes: request.temporal_axes,
                include_drafts: false,
                include_entity_types: None,
            },
        )
        .await?;

    Ok(response.entity_types)
}

/// Get entity types with their closed (ancestor-resolved) schemas.
pub async fn get_closed_entity_types(
    ctx: &GraphContext,
    authentication: Authentication,
    mut request: GetEntityTypesRequest,
) -> DomainResult<Vec<ClosedEntityTypeWithMetadata>> {
    rewrite_semantic_filter(ctx.embedder.as_deref(), &mut request.filter).await?;

    let response = ctx
        .graph
        .get_entity_types(
            authentication.actor_id,
            &GetEntityTypesParams {
                filter: request.filter,
                temporal_axes: request.temporal_axes,
                include_drafts: false,
                include_entity_types: Some("closed".to_string()),
            },
        )
        .await?;

    let closed = response.closed_entity_types.ok_or_else(|| {
        DomainError::UnexpectedResponse(
            "closed entity types requested but missing from response".to_string(),
        )
    })?;
    if closed.len() != response.entity_types.len() {
        return Err(DomainError::UnexpectedResponse(format!(
            "{} closed schemas for {} entity types",
            closed.len(),
            response.entity_types.len()
        )));
    }

    Ok(closed
        .into_iter()
        .zip(response.entity_types)
        .map(|(schema, entity_type)| ClosedEntityTypeWithMetadata {
            schema: ClosedEntityTypeSchema(schema),
            metadata: entity_type.metadata,
        })
        .collect())
}

/// Closed-multi response with front-door field names.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetClosedMultiEntityTypesResult {
    pub closed_multi_entity_types: serde_json::Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definitions: Option<Value>,
}

/// Get closed schemas for combinations of entity types.
pub async fn get_closed_multi_entity_types(
    ctx: &GraphContext,
    authentication: Authentication,
    params: GetClosedMultiEntityTypesParams,
) -> DomainResult<GetClosedMultiEntityTypesResult> {
    let response = ctx
        .graph
        .get_closed_multi_entity_types(authentication.actor_id, &params)
        .await?;

    Ok(GetClosedMultiEntityTypesResult {
        closed_multi_entity_types: response.entity_types,
        definitions: response.definitions,
    })
}

#[derive(Debug, Clone)]
pub struct GetEntityTypeSubgraphRequest {
    pub filter: Filter,
    pub graph_resolve_depths: Value,
    pub temporal_axes: QueryTemporalAxes,
}

/// Get an entity-type rooted subgraph by a structural query.
pub async fn get_entity_type_subgraph(
    ctx: &GraphContext,
    authentication: Authentication,
    mut request: GetEntityTypeSubgraphRequest,
) -> DomainResult<Subgraph> {
    rewrite_semantic_filter(ctx.embedder.as_deref(), &mut request.filter).await?;

    Ok(ctx
        .graph
        .get_entity_type_subgraph(
            authentication.actor_id,
            &GetEntityTypeSubgraphParams {
                filter: request.filter,
                graph_resolve_depths: request.graph_resolve_depths,
                temporal_axes: request.temporal_axes,
                include_drafts: false,
            },
        )
        .await?)
}

/// Get an entity type by its versioned URL.
pub async fn get_entity_type_by_id(
    ctx: &GraphContext,
    authentication: Authentication,
    entity_type_id: &VersionedUrl,
) -> DomainResult<EntityTypeWithMetadata> {
    let mut entity_types = get_entity_types(
        ctx,
        authentication,
        GetEntityTypesRequest {
            filter: Filter::for_versioned_url(entity_type_id),
            temporal_axes: QueryTemporalAxes::current_time_instant(),
        },
    )
    .await?;

    if entity_types.is_empty() {
        return Err(DomainError::NotFound(format!(
            "Could not find entity type with ID \"{entity_type_id}\""
        )));
    }
    Ok(entity_types.swap_remove(0))
}

#[derive(Debug, Clone)]
pub struct GetEntityTypeSubgraphByIdRequest {
    pub entity_type_id: VersionedUrl,
    pub graph_resolve_depths: Value,
    pub temporal_axes: QueryTemporalAxes,
}

/// Get an entity-type rooted subgraph by versioned URL.
///
/// When the type is unknown to the Graph but hosted externally, it is loaded
/// on demand and the query retried once.
pub async fn get_entity_type_subgraph_by_id(
    ctx: &GraphContext,
    authentication: Authentication,
    request: GetEntityTypeSubgraphByIdRequest,
) -> DomainResult<Subgraph> {
    let query = GetEntityTypeSubgraphRequest {
        filter: Filter::for_versioned_url(&request.entity_type_id),
        graph_resolve_depths: request.graph_resolve_depths,
        temporal_axes: request.temporal_axes,
    };

    let subgraph = get_entity_type_subgraph(ctx, authentication, query.clone()).await?;
    if !subgraph.roots.is_empty()
        || !is_external_type_id(&ctx.instance.frontend_url, &request.entity_type_id)
    {
        return Ok(subgraph);
    }

    ctx.graph
        .load_external_entity_type(authentication.actor_id, &request.entity_type_id)
        .await?;

    get_entity_type_subgraph(ctx, authentication, query).await
}

#[derive(Debug, Clone)]
pub struct UpdateEntityTypeParams {
    /// The entity type being updated; the Graph assigns the next version.
    pub entity_type_id: VersionedUrl,
    pub schema: EntityTypeDefinition,
    pub provenance: Option<EditionProvenance>,
}

fn update_request(ctx: &GraphContext, params: UpdateEntityTypeParams) -> UpdateEntityTypeRequest {
    let UpdateEntityTypeParams {
        entity_type_id,
        schema,
        provenance,
    } = params;
    UpdateEntityTypeRequest {
        schema: EntityTypeSchema::from_definition(entity_type_id.clone(), schema),
        type_to_update: entity_type_id,
        provenance: ctx.provenance_for(provenance),
    }
}

/// Update an entity type, returning the schema stamped with the new
/// versioned URL the Graph assigned.
pub async fn update_entity_type(
    ctx: &GraphContext,
    authentication: Authentication,
    params: UpdateEntityTypeParams,
) -> DomainResult<EntityTypeWithMetadata> {
    let request = update_request(ctx, params);
    let metadata = ctx
        .graph
        .update_entity_type(authentication.actor_id, &request)
        .await?;

    let mut schema = request.schema;
    schema.id = metadata.record_id.to_versioned_url();

    Ok(EntityTypeWithMetadata { schema, metadata })
}

/// Update multiple entity types in one call.
pub async fn update_entity_types(
    ctx: &GraphContext,
    authentication: Authentication,
    updates: Vec<UpdateEntityTypeParams>,
) -> DomainResult<Vec<EntityTypeWithMetadata>> {
    let requests: Vec<_> = updates
        .into_iter()
        .map(|params| update_request(ctx, params))
        .collect();

    let metadatas = ctx
        .graph
        .update_entity_types(authentication.actor_id, &requests)
        .await?;

    if metadatas.len() != requests.len() {
        return Err(DomainError::UnexpectedResponse(format!(
            "{} update results for {} requests",
            metadatas.len(),
            requests.len()
        )));
    }

    Ok(requests
        .into_iter()
        .zip(metadatas)
        .map(|(request, metadata)| {
            let mut schema = request.schema;
            schema.id = metadata.record_id.to_versioned_url();
            EntityTypeWithMetadata { schema, metadata }
        })
        .collect())
}

/// Whether any ancestor of the given `allOf` references is the link entity
/// type. Parents are fetched concurrently; the walk stops at the first hit.
pub async fn is_entity_type_link_entity_type(
    ctx: &GraphContext,
    authentication: Authentication,
    all_of: Option<&[EntityTypeReference]>,
) -> DomainResult<bool> {
    is_link_type_inner(ctx, authentication, all_of.unwrap_or_default().to_vec()).await
}

fn is_link_type_inner(
    ctx: &GraphContext,
    authentication: Authentication,
    references: Vec<EntityTypeReference>,
) -> BoxFuture<'_, DomainResult<bool>> {
    async move {
        if references
            .iter()
            .any(|reference| reference.url.as_str() == LINK_ENTITY_TYPE_ID)
        {
            return Ok(true);
        }

        let parents = futures::future::try_join_all(
            references
                .iter()
                .map(|reference| get_entity_type_by_id(ctx, authentication, &reference.url)),
        )
        .await?;

        for parent in parents {
            let parent_refs = parent.schema.definition.all_of.unwrap_or_default();
            if is_link_type_inner(ctx, authentication, parent_refs).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }
    .boxed()
}

/// Archive an entity type.
pub async fn archive_entity_type(
    ctx: &GraphContext,
    authentication: Authentication,
    entity_type_id: VersionedUrl,
) -> DomainResult<OntologyTemporalMetadata> {
    Ok(ctx
        .graph
        .archive_entity_type(
            authentication.actor_id,
            &ArchiveEntityTypeParams {
                type_to_archive: entity_type_id,
            },
        )
        .await?)
}

/// Unarchive an entity type.
pub async fn unarchive_entity_type(
    ctx: &GraphContext,
    authentication: Authentication,
    entity_type_id: VersionedUrl,
) -> DomainResult<OntologyTemporalMetadata> {
    Ok(ctx
        .graph
        .unarchive_entity_type(
            authentication.actor_id,
            &UnarchiveEntityTypeParams {
                type_to_unarchive: entity_type_id,
                provenance: ctx.provenance.clone(),
            },
        )
        .await?)
}
