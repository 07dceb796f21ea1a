//! Entity update route; this is the path the before-update hooks guard.

use axum::extract::State;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use trellis_core::knowledge::entity::{update_entity, UpdateEntityParams};
use trellis_core::Authentication;
use trellis_graph::patches::PropertyPatch;
use trellis_graph::types::{EntityId, VersionedUrl};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEntityBody {
    pub entity_id: EntityId,
    pub entity_type_id: VersionedUrl,
    pub property_patches: Vec<PropertyPatch>,
}

pub async fn update(
    State(state): State<AppState>,
    Extension(authentication): Extension<Authentication>,
    Json(body): Json<UpdateEntityBody>,
) -> Result<Json<Value>, ApiError> {
    if authentication.is_public() {
        return Err(ApiError::Unauthenticated(
            "This request requires authentication".to_string(),
        ));
    }

    let entity = update_entity(
        &state.ctx,
        authentication,
        &state.hooks,
        UpdateEntityParams {
            entity_id: body.entity_id,
            entity_type_id: body.entity_type_id,
            property_patches: body.property_patches,
            provenance: None,
        },
    )
    .await?;
    Ok(Json(json!(entity)))
}
