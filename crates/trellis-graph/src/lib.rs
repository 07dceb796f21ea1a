//! # Trellis Graph
//!
//! Typed HTTP client for the remote Graph API.
//!
//! The Graph API owns storage, permission checks and temporal versioning.
//! This crate only models the call/response contracts the front door
//! depends on; everything else stays opaque JSON.

pub mod client;
pub mod filter;
pub mod patches;
pub mod types;

pub use client::{GraphApiClient, GraphApiConfig, GraphApiError, GraphResult};
pub use filter::{Filter, FilterExpression, QueryTemporalAxes};
pub use types::{
    ActorId, BaseUrl, Entity, EntityTypeMetadata, EntityTypeSchema, EntityTypeWithMetadata,
    VersionedUrl, WebId,
};
