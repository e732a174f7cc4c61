//! Client library for the ERC-8004 trustless agent registries.
//!
//! The crate talks to the three registries (Identity, Reputation, Validation)
//! through a pluggable chain transport:
//!
//! - [`BlockchainAdapter`]: one fused read/write/sign interface, implemented by
//!   [`EthersAdapter`] (ethers-rs) and [`AlloyAdapter`] (alloy).
//! - [`AccountProvider`]: the ports decomposition into [`ReadClient`],
//!   [`Signer`] and [`TxSender`], implemented by [`AlloyAccountProvider`].
//!
//! Domain clients ([`IdentityClient`], [`BaseIdentityClient`],
//! [`ReputationClient`], [`ValidationClient`]) and the [`Erc8004Client`]
//! facade sit on top of those.

pub mod abi;
pub mod adapters;
pub mod blockchain;
pub mod chains;
pub mod config;
pub mod encoding;
pub mod inspect;
pub mod ipfs;
pub mod ports;
pub mod status;
pub mod types;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testing;

pub use abi::{AbiConfig, IdentityAbi, ReputationAbi, ValidationAbi};
pub use adapters::{AlloyAdapter, BlockchainAdapter, EthersAdapter};
pub use blockchain::{
    BaseIdentityClient, Erc8004Client, IdentityClient, RegistryAddresses, ReputationClient,
    ValidationClient,
};
pub use ports::{AccountProvider, AlloyAccountProvider, ReadClient, Signer, TxSender};
pub use status::{StatusSink, StatusUpdate, TracingStatusSink};
pub use types::*;
