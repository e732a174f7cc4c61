use alloy::dyn_abi::DynSolValue;
use alloy::json_abi::JsonAbi;
use alloy::primitives::{Address, B256, U256};
use std::sync::Arc;
use tracing::{debug, info};

use crate::abi::codec::{
    self, address_array, bytes32, expect_address, expect_b256, expect_u64, expect_u8,
    expect_uint, expect_vec, field, flatten_outputs, single, uint256, uint8,
};
use crate::abi::{validation_registry, ValidationAbi};
use crate::adapters::BlockchainAdapter;
use crate::encoding::{tag_to_value, validate_score, value_to_tag};
use crate::types::{
    ContractCallResult, Erc8004Error, Result, ValidationRequestParams, ValidationRequestResult,
    ValidationResponseParams, ValidationStatus, ValidationSummary,
};

/// Validation Registry client
///
/// An agent owner asks a validator to attest to some work
/// (`validationRequest`); the validator answers with a 0-100 response,
/// possibly several times for the same request.
#[derive(Clone)]
pub struct ValidationClient {
    adapter: Arc<dyn BlockchainAdapter>,
    registry_address: Address,
    version: ValidationAbi,
    abi: &'static JsonAbi,
}

impl ValidationClient {
    pub fn new(
        adapter: Arc<dyn BlockchainAdapter>,
        registry_address: Address,
        version: ValidationAbi,
    ) -> Result<Self> {
        Ok(Self {
            adapter,
            registry_address,
            version,
            abi: validation_registry(version)?,
        })
    }

    pub fn registry_address(&self) -> Address {
        self.registry_address
    }

    pub fn abi_version(&self) -> ValidationAbi {
        self.version
    }

    /// Open a validation request.
    ///
    /// `request_hash` must be the keccak256 of the content at `request_uri`;
    /// it is forwarded as given.
    pub async fn validation_request(
        &self,
        params: ValidationRequestParams,
    ) -> Result<ValidationRequestResult> {
        info!(
            "Requesting validation of agent {} from {} (request: {})",
            params.agent_id, params.validator_address, params.request_hash
        );

        let args = [
            DynSolValue::Address(params.validator_address),
            uint256(params.agent_id),
            codec::string(params.request_uri),
            bytes32(params.request_hash),
        ];
        let result = self
            .adapter
            .send(self.registry_address, self.abi, "validationRequest", &args, None)
            .await?;

        Ok(ValidationRequestResult {
            tx_hash: result.hash,
            request_hash: params.request_hash,
        })
    }

    /// Post (or revise) a validator's response to a request
    pub async fn validation_response(
        &self,
        params: ValidationResponseParams,
    ) -> Result<ContractCallResult> {
        let response = validate_score(params.response, "response")?;

        let args = [
            bytes32(params.request_hash),
            uint8(response),
            codec::string(params.response_uri.unwrap_or_default()),
            bytes32(params.response_hash.unwrap_or(B256::ZERO)),
            tag_to_value(
                params.tag.as_deref().unwrap_or(""),
                self.version.tag_type(),
            )?,
        ];

        info!(
            "Responding {} to validation request {}",
            response, params.request_hash
        );

        self.adapter
            .send(self.registry_address, self.abi, "validationResponse", &args, None)
            .await
    }

    /// Current state of a request, normalised across registry versions.
    ///
    /// `response_hash` is `None` when the registry does not report one.
    pub async fn get_validation_status(&self, request_hash: B256) -> Result<ValidationStatus> {
        let out = self
            .adapter
            .call(
                self.registry_address,
                self.abi,
                "getValidationStatus",
                &[bytes32(request_hash)],
            )
            .await?;
        parse_validation_status(flatten_outputs(out))
    }

    pub async fn get_summary(
        &self,
        agent_id: U256,
        validator_addresses: &[Address],
        tag: Option<&str>,
    ) -> Result<ValidationSummary> {
        let args = [
            uint256(agent_id),
            address_array(validator_addresses),
            tag_to_value(tag.unwrap_or(""), self.version.tag_type())?,
        ];

        let out = self
            .adapter
            .call(self.registry_address, self.abi, "getSummary", &args)
            .await?;
        let out = flatten_outputs(out);

        Ok(ValidationSummary {
            count: expect_u64(field(&out, 0, "count")?, "count")?,
            avg_response: expect_u8(field(&out, 1, "avgResponse")?, "avgResponse")?,
        })
    }

    pub async fn get_agent_validations(&self, agent_id: U256) -> Result<Vec<B256>> {
        let out = self
            .adapter
            .call(
                self.registry_address,
                self.abi,
                "getAgentValidations",
                &[uint256(agent_id)],
            )
            .await?;
        let hashes = expect_vec(single(&out, "getAgentValidations")?, "requestHashes", expect_b256)?;
        debug!("Agent {} has {} validation requests", agent_id, hashes.len());
        Ok(hashes)
    }

    pub async fn get_validator_requests(&self, validator_address: Address) -> Result<Vec<B256>> {
        let out = self
            .adapter
            .call(
                self.registry_address,
                self.abi,
                "getValidatorRequests",
                &[DynSolValue::Address(validator_address)],
            )
            .await?;
        expect_vec(single(&out, "getValidatorRequests")?, "requestHashes", expect_b256)
    }

    pub async fn get_identity_registry(&self) -> Result<Address> {
        let out = self
            .adapter
            .call(self.registry_address, self.abi, "getIdentityRegistry", &[])
            .await?;
        expect_address(single(&out, "getIdentityRegistry")?, "identityRegistry")
    }
}

/// Accepts `(validator, agentId, response, tag, lastUpdate)` and
/// `(validator, agentId, response, responseHash, tag, lastUpdate)`.
fn parse_validation_status(out: Vec<DynSolValue>) -> Result<ValidationStatus> {
    let (response_hash, tag_index, update_index) = match out.len() {
        5 => (None, 3, 4),
        6 => (Some(expect_b256(&out[3], "responseHash")?), 4, 5),
        n => {
            return Err(Erc8004Error::UnexpectedOutput(format!(
                "getValidationStatus returned {} fields, expected 5 or 6",
                n
            )))
        }
    };

    Ok(ValidationStatus {
        validator_address: expect_address(field(&out, 0, "validatorAddress")?, "validatorAddress")?,
        agent_id: expect_uint(field(&out, 1, "agentId")?, "agentId")?,
        response: expect_u8(field(&out, 2, "response")?, "response")?,
        response_hash,
        tag: value_to_tag(field(&out, tag_index, "tag")?)?,
        last_update: expect_uint(field(&out, update_index, "lastUpdate")?, "lastUpdate")?,
    })
}
