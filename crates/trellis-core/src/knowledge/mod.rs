//! Knowledge operations: entities and the hooks that guard their updates.

pub mod entity;
pub mod update_hooks;
pub mod user;
