//! Session resolution against Ory Kratos and the OAuth2 consent flow
//! against Ory Hydra.

pub mod hydra;
pub mod kratos;
pub mod session;

pub use hydra::HydraClient;
pub use kratos::KratosClient;
pub use session::{session_auth, AuthenticatedUser};
