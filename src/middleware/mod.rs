pub mod auth;
pub mod ownership;

pub use auth::{FirebaseAuth, SESSION_COOKIE};
pub use ownership::OwnershipGuard;
