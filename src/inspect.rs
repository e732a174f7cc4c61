//! Agent lookup with RPC failover

use alloy::primitives::{Address, U256};
use alloy::providers::Provider;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::abi::IdentityAbi;
use crate::adapters::AlloyAdapter;
use crate::blockchain::IdentityClient;
use crate::chains::{get_all_rpcs, get_chain};
use crate::types::{Erc8004Error, Result};

/// On-chain state of one agent as seen by a single RPC
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInspection {
    pub chain_id: u64,
    pub agent_id: U256,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
    pub block_number: u64,
    pub rpc_url: String,
    pub checked_at: DateTime<Utc>,
}

/// Inspect an agent on a known chain, trying each RPC until one answers
pub async fn inspect_agent(
    chain_id: u64,
    agent_id: U256,
    abi: IdentityAbi,
) -> Result<AgentInspection> {
    let registry = get_chain(chain_id)
        .and_then(|c| c.identity_registry)
        .ok_or_else(|| {
            Erc8004Error::InvalidArgument(format!(
                "No identity registry known for chain {}",
                chain_id
            ))
        })?;

    let rpcs = get_all_rpcs(chain_id);
    inspect_with_failover(chain_id, &rpcs, registry, agent_id, abi).await
}

pub async fn inspect_with_failover(
    chain_id: u64,
    rpcs: &[String],
    registry: Address,
    agent_id: U256,
    abi: IdentityAbi,
) -> Result<AgentInspection> {
    debug!(
        "Inspecting agent {} on registry {} (chain {})",
        agent_id, registry, chain_id
    );

    if rpcs.is_empty() {
        return Err(Erc8004Error::InvalidArgument(format!(
            "No RPC URLs available for chain {}",
            chain_id
        )));
    }

    let mut last_error = String::new();

    for (i, rpc_url) in rpcs.iter().enumerate() {
        debug!("Trying RPC {}/{}: {}", i + 1, rpcs.len(), rpc_url);

        match inspect_at(chain_id, rpc_url, registry, agent_id, abi).await {
            Ok(inspection) => {
                if i > 0 {
                    info!("RPC {} succeeded after {} failures", rpc_url, i);
                }
                return Ok(inspection);
            }
            Err(e) => {
                warn!("RPC {} failed: {}", rpc_url, e);
                last_error = e.to_string();
            }
        }
    }

    Err(Erc8004Error::BlockchainError(format!(
        "All {} RPCs failed for chain {}. Last error: {}",
        rpcs.len(),
        chain_id,
        last_error
    )))
}

async fn inspect_at(
    chain_id: u64,
    rpc_url: &str,
    registry: Address,
    agent_id: U256,
    abi: IdentityAbi,
) -> Result<AgentInspection> {
    let adapter = AlloyAdapter::connect(rpc_url, None)?;
    let block_number = adapter
        .provider()
        .get_block_number()
        .await
        .map_err(|e| Erc8004Error::BlockchainError(e.to_string()))?;

    let identity = IdentityClient::new(Arc::new(adapter), registry, abi)?;

    let (owner, token_uri) = match identity.get_owner(agent_id).await {
        Ok(owner) => (Some(owner), Some(identity.get_token_uri(agent_id).await?)),
        Err(Erc8004Error::AgentNotFound(_)) => (None, None),
        Err(e) => return Err(e),
    };

    Ok(AgentInspection {
        chain_id,
        agent_id,
        exists: owner.is_some(),
        owner,
        token_uri,
        block_number,
        rpc_url: rpc_url.to_string(),
        checked_at: Utc::now(),
    })
}
