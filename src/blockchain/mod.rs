mod base_identity;
mod client;
mod identity;
mod reputation;
mod validation;

pub use base_identity::BaseIdentityClient;
pub use client::{Erc8004Client, RegistryAddresses};
pub use identity::IdentityClient;
pub use reputation::{encode_feedback_auth, feedback_auth_hash, ReputationClient};
pub use validation::ValidationClient;
