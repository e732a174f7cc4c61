use alloy::dyn_abi::DynSolValue;
use alloy::json_abi::JsonAbi;
use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::abi::codec::{
    self, address_array, bytes32, expect_address, expect_bool, expect_u64, expect_u8, expect_vec,
    field, flatten_outputs, single, uint256, uint64, uint8,
};
use crate::abi::{reputation_registry, ReputationAbi};
use crate::adapters::BlockchainAdapter;
use crate::encoding::{tag_to_value, validate_score, value_to_tag};
use crate::types::{
    AllFeedback, AppendResponseParams, ContractCallResult, Erc8004Error, Feedback, FeedbackAuth,
    FeedbackSummary, GiveFeedbackParams, Result,
};

/// Reputation Registry client
///
/// Based on the ERC-8004 reputation system:
/// - Feedback carries a score (0-100) and two free-form tags
/// - Clients post feedback under an authorization signed by the agent side
/// - Anyone may append responses to a feedback entry
#[derive(Clone)]
pub struct ReputationClient {
    adapter: Arc<dyn BlockchainAdapter>,
    registry_address: Address,
    identity_registry: Address,
    version: ReputationAbi,
    abi: &'static JsonAbi,
}

/// ABI encoding of `(uint256,address,uint256,uint256,uint256,address,address)`
pub fn encode_feedback_auth(auth: &FeedbackAuth) -> Bytes {
    DynSolValue::Tuple(vec![
        uint256(auth.agent_id),
        DynSolValue::Address(auth.client_address),
        uint256(auth.index_limit),
        uint256(auth.expiry),
        uint256(auth.chain_id),
        DynSolValue::Address(auth.identity_registry),
        DynSolValue::Address(auth.signer_address),
    ])
    .abi_encode_params()
    .into()
}

pub fn feedback_auth_hash(auth: &FeedbackAuth) -> B256 {
    keccak256(encode_feedback_auth(auth))
}

impl ReputationClient {
    pub fn new(
        adapter: Arc<dyn BlockchainAdapter>,
        registry_address: Address,
        identity_registry: Address,
        version: ReputationAbi,
    ) -> Result<Self> {
        Ok(Self {
            adapter,
            registry_address,
            identity_registry,
            version,
            abi: reputation_registry(version)?,
        })
    }

    pub fn registry_address(&self) -> Address {
        self.registry_address
    }

    pub fn abi_version(&self) -> ReputationAbi {
        self.version
    }

    /// Build an authorization bound to this client's identity registry
    pub fn create_feedback_auth(
        &self,
        agent_id: U256,
        client_address: Address,
        index_limit: U256,
        expiry: U256,
        chain_id: U256,
        signer_address: Address,
    ) -> FeedbackAuth {
        FeedbackAuth {
            agent_id,
            client_address,
            index_limit,
            expiry,
            chain_id,
            identity_registry: self.identity_registry,
            signer_address,
        }
    }

    pub fn encode_feedback_auth(&self, auth: &FeedbackAuth) -> Bytes {
        encode_feedback_auth(auth)
    }

    pub fn feedback_auth_hash(&self, auth: &FeedbackAuth) -> B256 {
        feedback_auth_hash(auth)
    }

    /// Encoded authorization followed by the adapter signer's 65-byte
    /// EIP-191 signature over its keccak256 hash.
    pub async fn sign_feedback_auth(&self, auth: &FeedbackAuth) -> Result<Bytes> {
        let encoded = encode_feedback_auth(auth);
        let hash = keccak256(&encoded);
        let signature = self.adapter.sign_message(hash.as_slice()).await?;

        if signature.len() != 65 {
            return Err(Erc8004Error::SigningFailed(format!(
                "expected a 65-byte signature, got {} bytes",
                signature.len()
            )));
        }

        debug!("Signed feedback auth for agent {} (hash: {})", auth.agent_id, hash);

        let mut out = encoded.to_vec();
        out.extend_from_slice(&signature);
        Ok(out.into())
    }

    fn tag(&self, tag: Option<&str>) -> Result<DynSolValue> {
        tag_to_value(tag.unwrap_or(""), self.version.tag_type())
    }

    /// Submit reputation feedback for an agent
    pub async fn give_feedback(&self, params: GiveFeedbackParams) -> Result<ContractCallResult> {
        let score = validate_score(params.score, "score")?;

        let mut args = vec![
            uint256(params.agent_id),
            uint8(score),
            self.tag(params.tag1.as_deref())?,
            self.tag(params.tag2.as_deref())?,
        ];
        if self.version.has_endpoint() {
            args.push(codec::string(params.endpoint.unwrap_or_default()));
        }
        args.push(codec::string(params.feedback_uri.unwrap_or_default()));
        args.push(bytes32(params.feedback_hash.unwrap_or(B256::ZERO)));
        args.push(DynSolValue::Bytes(params.feedback_auth));

        info!(
            "Submitting feedback for agent {} (score: {})",
            params.agent_id, score
        );

        self.adapter
            .send(self.registry_address, self.abi, "giveFeedback", &args, None)
            .await
    }

    pub async fn revoke_feedback(
        &self,
        agent_id: U256,
        feedback_index: u64,
    ) -> Result<ContractCallResult> {
        info!("Revoking feedback {} for agent {}", feedback_index, agent_id);

        self.adapter
            .send(
                self.registry_address,
                self.abi,
                "revokeFeedback",
                &[uint256(agent_id), uint64(feedback_index)],
                None,
            )
            .await
    }

    pub async fn append_response(&self, params: AppendResponseParams) -> Result<ContractCallResult> {
        info!(
            "Appending response to feedback {} of {} on agent {}",
            params.feedback_index, params.client_address, params.agent_id
        );

        let args = [
            uint256(params.agent_id),
            DynSolValue::Address(params.client_address),
            uint64(params.feedback_index),
            codec::string(params.response_uri),
            bytes32(params.response_hash.unwrap_or(B256::ZERO)),
        ];

        self.adapter
            .send(self.registry_address, self.abi, "appendResponse", &args, None)
            .await
    }

    /// Feedback count and average score, optionally filtered.
    ///
    /// Chain or transport failures degrade to
    /// [`FeedbackSummary::unavailable`]; argument and ABI errors propagate.
    pub async fn get_summary(
        &self,
        agent_id: U256,
        client_addresses: &[Address],
        tag1: Option<&str>,
        tag2: Option<&str>,
    ) -> Result<FeedbackSummary> {
        let args = [
            uint256(agent_id),
            address_array(client_addresses),
            self.tag(tag1)?,
            self.tag(tag2)?,
        ];

        let out = match self
            .adapter
            .call(self.registry_address, self.abi, "getSummary", &args)
            .await
        {
            Ok(out) => flatten_outputs(out),
            Err(e) if e.is_chain_failure() => {
                warn!("getSummary failed for agent {}: {}", agent_id, e);
                return Ok(FeedbackSummary::unavailable());
            }
            Err(e) => return Err(e),
        };

        Ok(FeedbackSummary {
            count: expect_u64(field(&out, 0, "count")?, "count")?,
            average_score: expect_u8(field(&out, 1, "averageScore")?, "averageScore")?,
        })
    }

    pub async fn read_feedback(
        &self,
        agent_id: U256,
        client_address: Address,
        index: u64,
    ) -> Result<Feedback> {
        debug!(
            "Reading feedback {} from {} on agent {}",
            index, client_address, agent_id
        );

        let out = self
            .adapter
            .call(
                self.registry_address,
                self.abi,
                "readFeedback",
                &[
                    uint256(agent_id),
                    DynSolValue::Address(client_address),
                    uint64(index),
                ],
            )
            .await?;
        let out = flatten_outputs(out);

        Ok(Feedback {
            agent_id,
            client_address,
            index,
            score: expect_u8(field(&out, 0, "score")?, "score")?,
            tag1: value_to_tag(field(&out, 1, "tag1")?)?,
            tag2: value_to_tag(field(&out, 2, "tag2")?)?,
            is_revoked: expect_bool(field(&out, 3, "isRevoked")?, "isRevoked")?,
        })
    }

    pub async fn read_all_feedback(
        &self,
        agent_id: U256,
        client_addresses: &[Address],
        tag1: Option<&str>,
        tag2: Option<&str>,
        include_revoked: bool,
    ) -> Result<AllFeedback> {
        let args = [
            uint256(agent_id),
            address_array(client_addresses),
            self.tag(tag1)?,
            self.tag(tag2)?,
            DynSolValue::Bool(include_revoked),
        ];

        let out = self
            .adapter
            .call(self.registry_address, self.abi, "readAllFeedback", &args)
            .await?;
        parse_all_feedback(flatten_outputs(out))
    }

    pub async fn get_response_count(
        &self,
        agent_id: U256,
        client_address: Address,
        feedback_index: u64,
        responders: &[Address],
    ) -> Result<u64> {
        let out = self
            .adapter
            .call(
                self.registry_address,
                self.abi,
                "getResponseCount",
                &[
                    uint256(agent_id),
                    DynSolValue::Address(client_address),
                    uint64(feedback_index),
                    address_array(responders),
                ],
            )
            .await?;
        expect_u64(single(&out, "getResponseCount")?, "count")
    }

    pub async fn get_clients(&self, agent_id: U256) -> Result<Vec<Address>> {
        let out = self
            .adapter
            .call(self.registry_address, self.abi, "getClients", &[uint256(agent_id)])
            .await?;
        expect_vec(single(&out, "getClients")?, "clients", expect_address)
    }

    pub async fn get_last_index(&self, agent_id: U256, client_address: Address) -> Result<u64> {
        let out = self
            .adapter
            .call(
                self.registry_address,
                self.abi,
                "getLastIndex",
                &[uint256(agent_id), DynSolValue::Address(client_address)],
            )
            .await?;
        expect_u64(single(&out, "getLastIndex")?, "lastIndex")
    }

    /// Identity registry the reputation contract is bound to (on-chain)
    pub async fn get_identity_registry(&self) -> Result<Address> {
        let out = self
            .adapter
            .call(self.registry_address, self.abi, "getIdentityRegistry", &[])
            .await?;
        expect_address(single(&out, "getIdentityRegistry")?, "identityRegistry")
    }
}

fn parse_all_feedback(out: Vec<DynSolValue>) -> Result<AllFeedback> {
    let all = AllFeedback {
        clients: expect_vec(field(&out, 0, "clients")?, "clients", expect_address)?,
        indexes: expect_vec(field(&out, 1, "feedbackIndexes")?, "feedbackIndexes", expect_u64)?,
        scores: expect_vec(field(&out, 2, "scores")?, "scores", expect_u8)?,
        tag1s: expect_vec(field(&out, 3, "tag1s")?, "tag1s", |v, _| value_to_tag(v))?,
        tag2s: expect_vec(field(&out, 4, "tag2s")?, "tag2s", |v, _| value_to_tag(v))?,
        revoked_statuses: expect_vec(field(&out, 5, "revokedStatuses")?, "revokedStatuses", expect_bool)?,
    };

    let n = all.clients.len();
    if [all.indexes.len(), all.scores.len(), all.tag1s.len(), all.tag2s.len(), all.revoked_statuses.len()]
        .iter()
        .any(|len| *len != n)
    {
        return Err(Erc8004Error::UnexpectedOutput(
            "readAllFeedback returned arrays of different lengths".to_string(),
        ));
    }
    Ok(all)
}
