//! # Trellis Core
//!
//! Domain operations of the knowledge-graph front door: ontology CRUD
//! wrappers, entity update hooks and the validation rules around them.
//! Storage, permissions and versioning live in the remote Graph API;
//! everything here validates, forwards and re-shapes.

pub mod context;
pub mod error;
pub mod knowledge;
pub mod ontology;

pub use context::{Authentication, GraphContext, InstanceSettings, PUBLIC_ACTOR_ID};
pub use error::{DomainError, DomainResult};
pub use knowledge::update_hooks::UpdateHookRegistry;
