use httpmock::prelude::*;
use serde_json::json;
use trellis_graph::client::{
    ArchiveEntityTypeParams, CreateEntityTypeRequest, GetEntityTypesParams, GraphApiClient,
    GraphApiConfig,
};
use trellis_graph::types::{
    ActorId, ActorType, EditionProvenance, EntityTypeDefinition, EntityTypeSchema, VersionedUrl,
    WebId,
};
use trellis_graph::{Filter, QueryTemporalAxes};
use uuid::Uuid;

fn client_for(server: &MockServer) -> GraphApiClient {
    GraphApiClient::new(&GraphApiConfig {
        host: server.host(),
        port: server.port(),
    })
}

fn actor() -> ActorId {
    ActorId(Uuid::new_v4())
}

fn user_schema(id: &str) -> EntityTypeSchema {
    EntityTypeSchema::from_definition(
        VersionedUrl::new(id),
        EntityTypeDefinition {
            title: "User".to_string(),
            description: Some("A person".to_string()),
            all_of: None,
            rest: serde_json::Map::new(),
        },
    )
}

#[tokio::test]
async fn create_entity_type_posts_schema_with_actor_header() {
    let server = MockServer::start();
    let actor = actor();

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/entity-types")
            .header("x-authenticated-actor-id", actor.to_string())
            .json_body_partial(
                r#"{ "schema": { "kind": "entityType", "title": "User" } }"#,
            );
        then.status(200).json_body(json!({
            "recordId": {
                "baseUrl": "https://example.com/@acme/types/entity-type/user/",
                "version": 1
            }
        }));
    });

    let metadata = client_for(&server)
        .create_entity_type(
            actor,
            &CreateEntityTypeRequest {
                web_id: WebId(Uuid::new_v4()),
                schema: user_schema("https://example.com/@acme/types/entity-type/user/v/1"),
                provenance: EditionProvenance::api(ActorType::User),
            },
        )
        .await
        .unwrap();

    mock.assert();
    assert_eq!(metadata.record_id.version, 1);
    assert_eq!(
        metadata.record_id.to_versioned_url().as_str(),
        "https://example.com/@acme/types/entity-type/user/v/1"
    );
}

#[tokio::test]
async fn get_entity_types_decodes_schema_and_metadata() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(POST).path("/entity-types/query");
        then.status(200).json_body(json!({
            "entityTypes": [{
                "schema": {
                    "$schema": "https://blockprotocol.org/types/modules/graph/0.3/schema/entity-type",
                    "kind": "entityType",
                    "$id": "https://example.com/@acme/types/entity-type/user/v/2",
                    "title": "User",
                    "properties": {}
                },
                "metadata": {
                    "recordId": {
                        "baseUrl": "https://example.com/@acme/types/entity-type/user/",
                        "version": 2
                    }
                }
            }]
        }));
    });

    let response = client_for(&server)
        .get_entity_types(
            actor(),
            &GetEntityTypesParams {
                filter: Filter::for_versioned_url(&VersionedUrl::new(
                    "https://example.com/@acme/types/entity-type/user/v/2",
                )),
                temporal_axes: QueryTemporalAxes::current_time_instant(),
                include_drafts: false,
                include_entity_types: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(response.entity_types.len(), 1);
    let entity_type = &response.entity_types[0];
    assert_eq!(entity_type.schema.definition.title, "User");
    assert_eq!(entity_type.metadata.record_id.version, 2);
    assert!(response.closed_entity_types.is_none());
}

#[tokio::test]
async fn non_success_status_surfaces_as_api_error() {
    let server = MockServer::start();

    server.mock(|when, then| {
        when.method(PUT).path("/entity-types/archive");
        then.status(404).body("entity type not found");
    });

    let err = client_for(&server)
        .archive_entity_type(
            actor(),
            &ArchiveEntityTypeParams {
                type_to_archive: VersionedUrl::new(
                    "https://example.com/@acme/types/entity-type/gone/v/1",
                ),
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.status().map(|s| s.as_u16()), Some(404));
    assert!(err.to_string().contains("entity type not found"));
}

#[tokio::test]
async fn permission_check_returns_permitted_ids() {
    let server = MockServer::start();
    let id = VersionedUrl::new("https://example.com/@acme/types/entity-type/user/v/1");

    server.mock(|when, then| {
        when.method(POST)
            .path("/permissions/entity-types")
            .json_body(json!({
                "entityTypeIds": [id.as_str()],
                "action": "instantiate"
            }));
        then.status(200)
            .json_body(json!({ "permitted": [id.as_str()] }));
    });

    let permitted = client_for(&server)
        .has_permission_for_entity_types(actor(), std::slice::from_ref(&id), "instantiate")
        .await
        .unwrap();

    assert_eq!(permitted, vec![id]);
}

#[tokio::test]
async fn system_account_is_resolved_without_actor_header() {
    let server = MockServer::start();
    let system = Uuid::new_v4();

    server.mock(|when, then| {
        when.method(GET).path("/accounts/system");
        then.status(200).json_body(json!({ "actorId": system }));
    });

    let resolved = client_for(&server)
        .get_or_create_system_account()
        .await
        .unwrap();
    assert_eq!(resolved, ActorId(system));
}
