//! Ontology operations: entity-type CRUD wrappers plus the id-minting and
//! filter-rewriting helpers they share.

pub mod entity_type;

use trellis_graph::filter::{Filter, FilterExpression};
use trellis_graph::types::VersionedUrl;

use crate::context::EmbeddingWorkflow;
use crate::error::{DomainError, DomainResult};

/// Ontology type kinds as they appear in minted URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OntologyTypeKind {
    EntityType,
    PropertyType,
    DataType,
}

impl OntologyTypeKind {
    fn as_path_segment(&self) -> &'static str {
        match self {
            Self::EntityType => "entity-type",
            Self::PropertyType => "property-type",
            Self::DataType => "data-type",
        }
    }
}

/// Kebab-case a type title for use in a type URL.
fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_was_dash = true;
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Mint the versioned URL for a new ontology type owned by a web.
pub fn generate_type_id(
    frontend_url: &str,
    web_shortname: &str,
    kind: OntologyTypeKind,
    title: &str,
) -> VersionedUrl {
    VersionedUrl::new(format!(
        "{}/@{}/types/{}/{}/v/1",
        frontend_url.trim_end_matches('/'),
        web_shortname,
        kind.as_path_segment(),
        slugify(title),
    ))
}

/// Whether a type id is hosted outside this instance.
pub fn is_external_type_id(frontend_url: &str, id: &VersionedUrl) -> bool {
    !id.as_str()
        .starts_with(frontend_url.trim_end_matches('/'))
}

/// Replace natural-language cosine-distance parameters with embedding
/// vectors before the filter is forwarded to the Graph API.
///
/// The Graph API only accepts vectors in cosine-distance leaves; a string
/// parameter is the front door's cue to call the embedding workflow.
pub async fn rewrite_semantic_filter(
    embedder: Option<&dyn EmbeddingWorkflow>,
    filter: &mut Filter,
) -> DomainResult<()> {
    let mut stack: Vec<&mut Filter> = vec![filter];

    while let Some(current) = stack.pop() {
        match current {
            Filter::All(inner) | Filter::Any(inner) => stack.extend(inner.iter_mut()),
            Filter::Not(inner) => stack.push(inner),
            Filter::Equal(_) => {}
            Filter::CosineDistance(expressions) => {
                let Some(FilterExpression::Parameter(parameter)) = expressions.get_mut(1)
                else {
                    continue;
                };
                let Some(text) = parameter.as_str() else {
                    continue;
                };

                let embedder = embedder.ok_or_else(|| {
                    DomainError::Workflow(
                        "semantic search requested but no embedding workflow is configured"
                            .to_string(),
                    )
                })?;
                let embedding = embedder.embed_text(text).await?;
                *parameter = serde_json::to_value(embedding)
                    .map_err(|err| DomainError::Workflow(err.to_string()))?;
            }
        }
    }

    Ok(())
}
