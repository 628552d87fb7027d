pub mod client;
pub mod resources;

pub use client::{CredentialTier, StoreClient, StoreResponse};
