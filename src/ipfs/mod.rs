mod client;

pub use client::{resolve_uri, RegistrationFetcher, DEFAULT_IPFS_GATEWAY};
