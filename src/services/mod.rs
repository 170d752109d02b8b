pub mod identity_service;
pub mod memory_store;
pub mod query_service;
pub mod recommendation_service;

pub use identity_service::{bearer_token, AuthError, FirebaseClaims, FirebaseVerifier, IdentityVerifier};
pub use memory_store::MemoryStore;
pub use query_service::QueryStore;
pub use recommendation_service::RecommendationStore;
