use alloy::primitives::{hex, Address, B256, U256};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use erc8004::config::Config;
use erc8004::inspect::inspect_agent;
use erc8004::ipfs::RegistrationFetcher;
use erc8004::{
    chains, AlloyAdapter, BlockchainAdapter, ContractCallResult, Erc8004Client, EthersAdapter,
    GiveFeedbackParams, MetadataEntry,
};

/// ERC-8004 registry client
#[derive(Parser, Debug)]
#[command(name = "erc8004", version)]
#[command(about = "Read and write the ERC-8004 identity, reputation and validation registries")]
struct Cli {
    /// Chain library used to talk to the RPC
    #[arg(long, value_enum, default_value = "alloy", global = true)]
    backend: Backend,

    /// Overrides RPC_URL
    #[arg(long, global = true)]
    rpc_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Backend {
    Alloy,
    Ethers,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Owner of an agent
    Owner { agent_id: U256 },
    /// Agent tokenURI
    Uri { agent_id: U256 },
    /// On-chain metadata value
    Metadata { agent_id: U256, key: String },
    /// Fetch and parse the registration file behind the tokenURI
    Registration { agent_id: U256 },
    /// Look an agent up with RPC failover across the chain's known RPCs
    Inspect { agent_id: U256 },
    /// Reputation summary
    Summary {
        agent_id: U256,
        #[arg(long = "client")]
        clients: Vec<Address>,
        #[arg(long)]
        tag1: Option<String>,
        #[arg(long)]
        tag2: Option<String>,
    },
    /// Status of a validation request
    ValidationStatus { request_hash: B256 },
    /// Register a new agent
    Register {
        #[arg(long)]
        uri: Option<String>,
        /// key=value, repeatable
        #[arg(long = "metadata", value_parser = parse_metadata)]
        metadata: Vec<MetadataEntry>,
    },
    /// Point an agent at a new registration file
    SetUri { agent_id: U256, uri: String },
    /// Sign a feedback authorization for a client (agent owner side)
    FeedbackAuth {
        agent_id: U256,
        #[arg(long)]
        client: Address,
        #[arg(long)]
        index_limit: u64,
        /// Validity in seconds from now
        #[arg(long, default_value = "3600")]
        expires_in: u64,
    },
    /// Submit feedback using an authorization from `feedback-auth`
    GiveFeedback {
        agent_id: U256,
        #[arg(long)]
        score: i64,
        #[arg(long)]
        tag1: Option<String>,
        #[arg(long)]
        tag2: Option<String>,
        #[arg(long)]
        feedback_uri: Option<String>,
        /// Hex-encoded signed authorization
        #[arg(long)]
        auth: String,
    },
}

fn parse_metadata(s: &str) -> std::result::Result<MetadataEntry, String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    Ok(MetadataEntry::new(key, value))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the JSON result
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("erc8004=debug".parse()?),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(rpc_url) = &cli.rpc_url {
        config.rpc_url = rpc_url.parse().context("Invalid --rpc-url")?;
    }

    info!("erc8004 v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Chain: {} ({}), backend: {:?}",
        chains::get_chain(config.chain_id)
            .map(|c| c.name)
            .unwrap_or("custom"),
        config.chain_id,
        cli.backend
    );
    info!(
        "Wallet mode: {} (address: {:?})",
        config.key_mode().as_str(),
        config.signer_address()
    );

    let output = run(cli, &config).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn build_adapter(backend: Backend, config: &Config) -> Result<Arc<dyn BlockchainAdapter>> {
    let rpc_url = config.rpc_url.as_str();
    Ok(match backend {
        Backend::Alloy => Arc::new(AlloyAdapter::connect(rpc_url, config.wallet.signer()?)?),
        Backend::Ethers => Arc::new(EthersAdapter::connect(
            rpc_url,
            config.private_key(),
            config.chain_id,
        )?),
    })
}

fn tx_json(config: &Config, result: &ContractCallResult) -> Value {
    let hash = result.hash.to_string();
    json!({
        "txHash": hash,
        "blockNumber": result.block_number,
        "events": result.events.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
        "explorer": chains::get_chain(config.chain_id).map(|c| c.tx_url(&hash)),
    })
}

async fn run(cli: Cli, config: &Config) -> Result<Value> {
    let adapter = build_adapter(cli.backend, config)?;
    let client = Erc8004Client::new(adapter, config.registries, config.abi)?;
    let identity = client.identity();

    let output = match cli.command {
        Command::Owner { agent_id } => json!({ "owner": identity.get_owner(agent_id).await? }),
        Command::Uri { agent_id } => json!({ "tokenUri": identity.get_token_uri(agent_id).await? }),
        Command::Metadata { agent_id, key } => {
            let value = identity.get_metadata(agent_id, &key).await?;
            json!({ "key": key, "value": value })
        }
        // Manages its own RPC connections
        Command::Inspect { agent_id } => {
            serde_json::to_value(inspect_agent(config.chain_id, agent_id, config.abi.identity).await?)?
        }
        Command::Registration { agent_id } => {
            let file = identity
                .clone()
                .with_fetcher(RegistrationFetcher::new(config.ipfs_gateway.clone()))
                .get_registration_file(agent_id)
                .await?;
            serde_json::to_value(file)?
        }
        Command::Summary {
            agent_id,
            clients,
            tag1,
            tag2,
        } => {
            let summary = client
                .reputation()
                .get_summary(agent_id, &clients, tag1.as_deref(), tag2.as_deref())
                .await?;
            serde_json::to_value(summary)?
        }
        Command::ValidationStatus { request_hash } => {
            let validation = client
                .validation()
                .context("No validation registry configured for this chain")?;
            serde_json::to_value(validation.get_validation_status(request_hash).await?)?
        }
        Command::Register { uri, metadata } => {
            let result = match (uri.as_deref(), metadata.is_empty()) {
                (None, true) => identity.register().await?,
                (Some(uri), true) => identity.register_with_uri(uri).await?,
                (uri, false) => {
                    identity
                        .register_with_metadata(uri.unwrap_or_default(), &metadata)
                        .await?
                }
            };
            serde_json::to_value(result)?
        }
        Command::SetUri { agent_id, uri } => {
            tx_json(config, &identity.set_agent_uri(agent_id, &uri).await?)
        }
        Command::FeedbackAuth {
            agent_id,
            client: client_address,
            index_limit,
            expires_in,
        } => {
            let signer = client
                .signer_address()
                .context("Signing a feedback auth needs PRIVATE_KEY or MNEMONIC")?;
            let expiry = chrono::Utc::now().timestamp() as u64 + expires_in;
            let reputation = client.reputation();

            let auth = reputation.create_feedback_auth(
                agent_id,
                client_address,
                U256::from(index_limit),
                U256::from(expiry),
                U256::from(client.chain_id().await?),
                signer,
            );
            let signed = reputation.sign_feedback_auth(&auth).await?;
            json!({ "auth": auth, "signed": hex::encode_prefixed(&signed) })
        }
        Command::GiveFeedback {
            agent_id,
            score,
            tag1,
            tag2,
            feedback_uri,
            auth,
        } => {
            let result = client
                .reputation()
                .give_feedback(GiveFeedbackParams {
                    agent_id,
                    score: erc8004::encoding::score_from_i64(score, "score")?,
                    tag1,
                    tag2,
                    endpoint: None,
                    feedback_uri,
                    feedback_hash: None,
                    feedback_auth: hex::decode(auth.trim()).context("Invalid --auth hex")?,
                })
                .await?;
            tx_json(config, &result)
        }
    };

    Ok(output)
}
