//! Wire types shared with the Graph API.
//!
//! Identifiers are thin newtypes; schema bodies the front door never
//! inspects are carried as raw `serde_json::Value`.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Meta-schema every entity type schema declares via `$schema`.
pub const ENTITY_TYPE_META_SCHEMA: &str =
    "https://blockprotocol.org/types/modules/graph/0.3/schema/entity-type";

/// The `$ref` target marking a type as a link entity type.
pub const LINK_ENTITY_TYPE_ID: &str =
    "https://blockprotocol.org/@blockprotocol/types/entity-type/link/v/1";

/// Account id of an actor (user or machine) known to the Graph API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub Uuid);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Id of a web (an account or account group that owns types and entities).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WebId(pub Uuid);

impl fmt::Display for WebId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Versioned ontology type URL, e.g. `https://…/types/entity-type/user/v/3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionedUrl(pub String);

impl VersionedUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The base URL, i.e. everything up to and including the trailing slash
    /// before the `v/{version}` suffix.
    pub fn base_url(&self) -> BaseUrl {
        match self.0.rsplit_once("v/") {
            Some((base, _)) => BaseUrl(base.to_string()),
            None => BaseUrl(self.0.clone()),
        }
    }

    pub fn version(&self) -> Option<u32> {
        self.0.rsplit_once("v/").and_then(|(_, v)| v.parse().ok())
    }
}

impl fmt::Display for VersionedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unversioned ontology type or property URL, always ending in `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BaseUrl(pub String);

impl BaseUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Record id the Graph API assigns to an ontology type edition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OntologyTypeRecordId {
    pub base_url: BaseUrl,
    pub version: u32,
}

impl OntologyTypeRecordId {
    /// Recompose the versioned URL for this record.
    pub fn to_versioned_url(&self) -> VersionedUrl {
        VersionedUrl(format!("{}v/{}", self.base_url.0, self.version))
    }
}

/// Who authored an edition and through which surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditionProvenance {
    pub actor_type: ActorType,
    pub origin: ProvenanceOrigin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActorType {
    User,
    Machine,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvenanceOrigin {
    #[serde(rename = "type")]
    pub origin_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl EditionProvenance {
    pub fn api(actor_type: ActorType) -> Self {
        Self {
            actor_type,
            origin: ProvenanceOrigin {
                origin_type: "api".to_string(),
                user_agent: None,
            },
        }
    }
}

/// Reference to another entity type, as it appears in `allOf`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityTypeReference {
    #[serde(rename = "$ref")]
    pub url: VersionedUrl,
}

/// The caller-supplied part of an entity type schema. The front door adds
/// `$schema`, `kind` and `$id` before forwarding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityTypeDefinition {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_of: Option<Vec<EntityTypeReference>>,
    /// `properties`, `required`, `links` and any future keywords, forwarded
    /// untouched.
    #[serde(flatten)]
    pub rest: serde_json::Map<String, Value>,
}

/// A full entity type schema as stored by the Graph API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityTypeSchema {
    #[serde(rename = "$schema")]
    pub meta_schema: String,
    pub kind: String,
    #[serde(rename = "$id")]
    pub id: VersionedUrl,
    #[serde(flatten)]
    pub definition: EntityTypeDefinition,
}

impl EntityTypeSchema {
    /// Wrap a caller-supplied definition into a full schema.
    pub fn from_definition(id: VersionedUrl, definition: EntityTypeDefinition) -> Self {
        Self {
            meta_schema: ENTITY_TYPE_META_SCHEMA.to_string(),
            kind: "entityType".to_string(),
            id,
            definition,
        }
    }
}

/// Metadata the Graph API attaches to an entity type edition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityTypeMetadata {
    pub record_id: OntologyTypeRecordId,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityTypeWithMetadata {
    pub schema: EntityTypeSchema,
    pub metadata: EntityTypeMetadata,
}

/// A closed (ancestor-resolved) entity type schema. Resolution happens in
/// the Graph API; the front door re-shapes but never inspects it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClosedEntityTypeSchema(pub Value);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedEntityTypeWithMetadata {
    pub schema: ClosedEntityTypeSchema,
    pub metadata: EntityTypeMetadata,
}

/// Temporal interval metadata returned by archive/unarchive calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OntologyTemporalMetadata(pub Value);

/// Root of a type-rooted subgraph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OntologyTypeVertexId {
    pub base_id: BaseUrl,
    pub revision_id: u32,
}

/// A subgraph rooted at entity types. Vertices and edges are opaque here;
/// the frontend consumes them as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subgraph {
    pub roots: Vec<OntologyTypeVertexId>,
    pub vertices: Value,
    pub edges: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depths: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporal_axes: Option<Value>,
}

/// An entity as returned by the Graph API knowledge endpoints. Properties
/// are keyed by property base URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub entity_id: EntityId,
    pub properties: HashMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Entity {
    pub fn property(&self, base_url: &str) -> Option<&Value> {
        self.properties.get(base_url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityId {
    pub web_id: WebId,
    pub entity_uuid: Uuid,
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}~{}", self.web_id, self.entity_uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versioned_url_splits_base_and_version() {
        let url = VersionedUrl::new("https://example.com/@acme/types/entity-type/user/v/3");
        assert_eq!(
            url.base_url().as_str(),
            "https://example.com/@acme/types/entity-type/user/"
        );
        assert_eq!(url.version(), Some(3));
    }

    #[test]
    fn record_id_recomposes_versioned_url() {
        let record = OntologyTypeRecordId {
            base_url: BaseUrl::new("https://example.com/@acme/types/entity-type/user/"),
            version: 7,
        };
        assert_eq!(
            record.to_versioned_url().as_str(),
            "https://example.com/@acme/types/entity-type/user/v/7"
        );
    }

    #[test]
    fn entity_type_schema_roundtrips_dollar_keys() {
        let definition = EntityTypeDefinition {
            title: "User".to_string(),
            description: None,
            all_of: None,
            rest: serde_json::Map::new(),
        };
        let schema = EntityTypeSchema::from_definition(
            VersionedUrl::new("https://example.com/@acme/types/entity-type/user/v/1"),
            definition,
        );
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json["$schema"], ENTITY_TYPE_META_SCHEMA);
        assert_eq!(json["kind"], "entityType");
        assert_eq!(
            json["$id"],
            "https://example.com/@acme/types/entity-type/user/v/1"
        );
    }
}
