//! Entity update, the operation that drives the before-update hooks.

use trellis_graph::client::{PatchEntityParams, QueryEntitiesParams};
use trellis_graph::filter::{Filter, QueryTemporalAxes};
use trellis_graph::patches::PropertyPatch;
use trellis_graph::types::{BaseUrl, EditionProvenance, Entity, EntityId, VersionedUrl};

use super::update_hooks::UpdateHookRegistry;
use crate::context::{Authentication, GraphContext};
use crate::error::{DomainError, DomainResult};

/// Load the latest edition of an entity.
pub async fn get_latest_entity_by_id(
    ctx: &GraphContext,
    authentication: Authentication,
    entity_id: &EntityId,
) -> DomainResult<Entity> {
    let mut entities = ctx
        .graph
        .query_entities(
            authentication.actor_id,
            &QueryEntitiesParams {
                filter: Filter::All(vec![
                    Filter::equal(["webId"], entity_id.web_id.to_string()),
                    Filter::equal(["uuid"], entity_id.entity_uuid.to_string()),
                ]),
                temporal_axes: QueryTemporalAxes::current_time_instant(),
                include_drafts: false,
            },
        )
        .await?;

    if entities.is_empty() {
        return Err(DomainError::NotFound(format!(
            "Could not find entity with ID \"{entity_id}\""
        )));
    }
    Ok(entities.swap_remove(0))
}

#[derive(Debug, Clone)]
pub struct UpdateEntityParams {
    pub entity_id: EntityId,
    /// The entity's type, selecting which before-update hook applies.
    pub entity_type_id: VersionedUrl,
    pub property_patches: Vec<PropertyPatch>,
    pub provenance: Option<EditionProvenance>,
}

/// Update an entity's properties.
///
/// The previous edition is loaded first so the type's before-update hook
/// can validate the patches against it; only then is the patch forwarded.
pub async fn update_entity(
    ctx: &GraphContext,
    authentication: Authentication,
    hooks: &UpdateHookRegistry,
    params: UpdateEntityParams,
) -> DomainResult<Entity> {
    let previous_entity = get_latest_entity_by_id(ctx, authentication, &params.entity_id).await?;

    let type_base_url: BaseUrl = params.entity_type_id.base_url();
    hooks
        .run_before_update(
            ctx,
            authentication,
            &type_base_url,
            &previous_entity,
            &params.property_patches,
        )
        .await?;

    Ok(ctx
        .graph
        .patch_entity(
            authentication.actor_id,
            &PatchEntityParams {
                entity_id: params.entity_id,
                property_patches: params.property_patches,
                provenance: ctx.provenance_for(params.provenance),
            },
        )
        .await?)
}
