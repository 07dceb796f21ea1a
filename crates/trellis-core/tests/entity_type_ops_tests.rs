//! Entity-type operation wrappers against a mocked Graph API.

use httpmock::prelude::*;
use serde_json::json;
use trellis_core::ontology::entity_type::{
    check_permissions_on_entity_type, create_entity_type, get_entity_type_by_id,
    get_entity_type_subgraph_by_id, is_entity_type_link_entity_type, update_entity_types,
    CreateEntityTypeParams, GetEntityTypeSubgraphByIdRequest, UpdateEntityTypeParams,
};
use trellis_core::{Authentication, DomainError, GraphContext, InstanceSettings};
use trellis_graph::client::{GraphApiClient, GraphApiConfig};
use trellis_graph::types::{
    ActorId, ActorType, EditionProvenance, EntityTypeDefinition, EntityTypeReference,
    VersionedUrl, WebId, LINK_ENTITY_TYPE_ID,
};
use trellis_graph::QueryTemporalAxes;
use uuid::Uuid;

const FRONTEND_URL: &str = "https://app.trellis.dev";

fn context(server: &MockServer) -> GraphContext {
    GraphContext {
        graph: GraphApiClient::new(&GraphApiConfig {
            host: server.host(),
            port: server.port(),
        }),
        provenance: EditionProvenance::api(ActorType::User),
        system_account: ActorId(Uuid::new_v4()),
        instance: InstanceSettings {
            frontend_url: FRONTEND_URL.to_string(),
            self_hosted: true,
            email_allowlist: None,
        },
        embedder: None,
    }
}

fn auth() -> Authentication {
    Authentication {
        actor_id: ActorId(Uuid::new_v4()),
    }
}

fn definition(title: &str) -> EntityTypeDefinition {
    EntityTypeDefinition {
        title: title.to_string(),
        description: None,
        all_of: None,
        rest: serde_json::Map::new(),
    }
}

#[tokio::test]
async fn create_resolves_web_shortname_and_mints_the_type_id() {
    let server = MockServer::start();
    let web_id = WebId(Uuid::new_v4());

    let shortname = server.mock(|when, then| {
        when.method(GET).path(format!("/webs/{web_id}"));
        then.status(200)
            .json_body(json!({ "shortname": "acme" }));
    });
    let create = server.mock(|when, then| {
        when.method(POST).path("/entity-types").json_body_partial(
            r#"{ "schema": {
                "$id": "https://app.trellis.dev/@acme/types/entity-type/github-issue/v/1"
            } }"#,
        );
        then.status(200).json_body(json!({
            "recordId": {
                "baseUrl": "https://app.trellis.dev/@acme/types/entity-type/github-issue/",
                "version": 1
            }
        }));
    });

    let created = create_entity_type(
        &context(&server),
        auth(),
        CreateEntityTypeParams {
            web_id,
            schema: definition("GitHub Issue"),
            web_shortname: None,
            provenance: None,
        },
    )
    .await
    .unwrap();

    shortname.assert();
    create.assert();
    assert_eq!(
        created.schema.id.as_str(),
        "https://app.trellis.dev/@acme/types/entity-type/github-issue/v/1"
    );
}

#[tokio::test]
async fn explicit_web_shortname_skips_the_lookup() {
    let server = MockServer::start();
    let shortname = server.mock(|when, then| {
        when.method(GET).path_contains("/webs/");
        then.status(200).json_body(json!({ "shortname": "acme" }));
    });
    server.mock(|when, then| {
        when.method(POST).path("/entity-types");
        then.status(200).json_body(json!({
            "recordId": {
                "baseUrl": "https://app.trellis.dev/@seeded/types/entity-type/note/",
                "version": 1
            }
        }));
    });

    create_entity_type(
        &context(&server),
        auth(),
        CreateEntityTypeParams {
            web_id: WebId(Uuid::new_v4()),
            schema: definition("Note"),
            web_shortname: Some("seeded".to_string()),
            provenance: None,
        },
    )
    .await
    .unwrap();

    shortname.assert_hits(0);
}

#[tokio::test]
async fn missing_entity_type_is_not_found() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/entity-types/query");
        then.status(200).json_body(json!({ "entityTypes": [] }));
    });

    let err = get_entity_type_by_id(
        &context(&server),
        auth(),
        &VersionedUrl::new("https://app.trellis.dev/@acme/types/entity-type/gone/v/1"),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, DomainError::NotFound(_)));
}

#[tokio::test]
async fn external_type_is_loaded_when_subgraph_has_no_roots() {
    let server = MockServer::start();
    let query = server.mock(|when, then| {
        when.method(POST).path("/entity-types/query/subgraph");
        then.status(200).json_body(json!({
            "subgraph": { "roots": [], "vertices": {}, "edges": {} }
        }));
    });
    let load = server.mock(|when, then| {
        when.method(POST).path("/entity-types/load-external");
        then.status(200).json_body(json!({
            "recordId": {
                "baseUrl": "https://blockprotocol.org/@alice/types/entity-type/thing/",
                "version": 2
            }
        }));
    });

    let subgraph = get_entity_type_subgraph_by_id(
        &context(&server),
        auth(),
        GetEntityTypeSubgraphByIdRequest {
            entity_type_id: VersionedUrl::new(
                "https://blockprotocol.org/@alice/types/entity-type/thing/v/2",
            ),
            graph_resolve_depths: json!({}),
            temporal_axes: QueryTemporalAxes::current_time_instant(),
        },
    )
    .await
    .unwrap();

    load.assert();
    query.assert_hits(2);
    assert!(subgraph.roots.is_empty());
}

#[tokio::test]
async fn internal_type_is_never_loaded_externally() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/entity-types/query/subgraph");
        then.status(200).json_body(json!({
            "subgraph": { "roots": [], "vertices": {}, "edges": {} }
        }));
    });
    let load = server.mock(|when, then| {
        when.method(POST).path("/entity-types/load-external");
        then.status(200).json_body(json!({}));
    });

    get_entity_type_subgraph_by_id(
        &context(&server),
        auth(),
        GetEntityTypeSubgraphByIdRequest {
            entity_type_id: VersionedUrl::new(
                "https://app.trellis.dev/@acme/types/entity-type/draftless/v/1",
            ),
            graph_resolve_depths: json!({}),
            temporal_axes: QueryTemporalAxes::current_time_instant(),
        },
    )
    .await
    .unwrap();

    load.assert_hits(0);
}

#[tokio::test]
async fn public_actor_has_view_only_permissions() {
    let server = MockServer::start();
    let permissions = server.mock(|when, then| {
        when.method(POST).path("/permissions/entity-types");
        then.status(200).json_body(json!({ "permitted": [] }));
    });

    let result = check_permissions_on_entity_type(
        &context(&server),
        Authentication::public(),
        &VersionedUrl::new("https://app.trellis.dev/@acme/types/entity-type/user/v/1"),
    )
    .await
    .unwrap();

    permissions.assert_hits(0);
    assert!(!result.edit);
    assert!(!result.instantiate);
    assert!(result.view);
}

#[tokio::test]
async fn batch_update_result_count_must_match_inputs() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(PUT).path("/entity-types/bulk");
        then.status(200).json_body(json!([]));
    });

    let err = update_entity_types(
        &context(&server),
        auth(),
        vec![UpdateEntityTypeParams {
            entity_type_id: VersionedUrl::new(
                "https://app.trellis.dev/@acme/types/entity-type/note/v/1",
            ),
            schema: definition("Note"),
            provenance: None,
        }],
    )
    .await
    .unwrap_err();

    assert!(matches!(err, DomainError::UnexpectedResponse(_)));
}

#[tokio::test]
async fn direct_link_parent_needs_no_graph_calls() {
    let server = MockServer::start();
    let query = server.mock(|when, then| {
        when.method(POST).path("/entity-types/query");
        then.status(200).json_body(json!({ "entityTypes": [] }));
    });

    let references = vec![EntityTypeReference {
        url: VersionedUrl::new(LINK_ENTITY_TYPE_ID),
    }];
    let is_link =
        is_entity_type_link_entity_type(&context(&server), auth(), Some(&references))
            .await
            .unwrap();

    query.assert_hits(0);
    assert!(is_link);
}

#[tokio::test]
async fn link_ancestry_is_resolved_through_parents() {
    let server = MockServer::start();
    let parent_id = "https://app.trellis.dev/@acme/types/entity-type/connection/v/1";
    server.mock(|when, then| {
        when.method(POST).path("/entity-types/query");
        then.status(200).json_body(json!({
            "entityTypes": [{
                "schema": {
                    "$schema": "https://blockprotocol.org/types/modules/graph/0.3/schema/entity-type",
                    "kind": "entityType",
                    "$id": parent_id,
                    "title": "Connection",
                    "allOf": [{ "$ref": LINK_ENTITY_TYPE_ID }]
                },
                "metadata": {
                    "recordId": {
                        "baseUrl": "https://app.trellis.dev/@acme/types/entity-type/connection/",
                        "version": 1
                    }
                }
            }]
        }));
    });

    let references = vec![EntityTypeReference {
        url: VersionedUrl::new(parent_id),
    }];
    let is_link =
        is_entity_type_link_entity_type(&context(&server), auth(), Some(&references))
            .await
            .unwrap();

    assert!(is_link);
}
