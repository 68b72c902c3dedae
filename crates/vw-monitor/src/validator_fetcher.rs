use tracing::info;
use vw_types::error::ValidatorFetchError;
use vw_types::ValidatorInfo;

use crate::abci::{
    abci_query, QueryParamsRequest, QueryParamsResponse, QuerySigningInfoRequest,
    QuerySigningInfoResponse, QueryValidatorRequest, QueryValidatorResponse, BOND_STATUS_BONDED,
    PATH_SIGNING_INFO, PATH_SLASHING_PARAMS, PATH_VALIDATOR,
};
use crate::address::derive_consensus_address;

/// Refreshes `ValidatorInfo` from the staking/slashing modules of the chain
/// reachable at `base_url`, on a slow timer driven by the Chain Monitor's
/// L2 loop.
pub struct ValidatorFetcher {
    client: reqwest::Client,
    operator_address: String,
    consensus_address_override: Option<String>,
    bech32_overrides: Vec<(String, String)>,
    window: Option<i64>,
}

impl ValidatorFetcher {
    pub fn new(
        operator_address: String,
        consensus_address_override: Option<String>,
        bech32_overrides: Vec<(String, String)>,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            operator_address,
            consensus_address_override,
            bech32_overrides,
            window: None,
        }
    }

    pub async fn refresh(
        &mut self,
        base_url: &str,
        first_call: bool,
    ) -> Result<ValidatorInfo, ValidatorFetchError> {
        let validator_resp: QueryValidatorResponse = abci_query(
            &self.client,
            base_url,
            PATH_VALIDATOR,
            QueryValidatorRequest {
                validator_addr: self.operator_address.clone(),
            }
            .into_bytes(),
        )
        .await
        .map_err(ValidatorFetchError::Rpc)?;

        let validator = validator_resp.validator.ok_or_else(|| ValidatorFetchError::NotFound {
            operator_address: self.operator_address.clone(),
        })?;

        let pubkey_bytes = validator
            .consensus_pubkey
            .map(|any| any.value)
            .ok_or_else(|| ValidatorFetchError::BadPubkey("missing consensus_pubkey".to_string()))?;

        let consensus_address = match &self.consensus_address_override {
            Some(addr) => addr.clone(),
            None => derive_consensus_address(
                &self.operator_address,
                &pubkey_bytes,
                &self.bech32_overrides,
            )?,
        };

        let signing_resp: QuerySigningInfoResponse = abci_query(
            &self.client,
            base_url,
            PATH_SIGNING_INFO,
            QuerySigningInfoRequest {
                cons_address: consensus_address.clone(),
            }
            .into_bytes(),
        )
        .await
        .map_err(ValidatorFetchError::Rpc)?;

        let signing_info = signing_resp.val_signing_info.unwrap_or_default();

        if self.window.is_none() {
            let params_resp: QueryParamsResponse = abci_query(
                &self.client,
                base_url,
                PATH_SLASHING_PARAMS,
                QueryParamsRequest {}.into_bytes(),
            )
            .await
            .map_err(ValidatorFetchError::Rpc)?;
            self.window = params_resp.params.map(|p| p.signed_blocks_window);
        }

        let info = ValidatorInfo {
            moniker: validator.description_moniker,
            bonded: validator.status == BOND_STATUS_BONDED,
            jailed: validator.jailed,
            tombstoned: signing_info.tombstoned,
            missed: signing_info.missed_blocks_counter,
            window: self.window.unwrap_or(0),
            consensus_pubkey_bytes: pubkey_bytes,
            consensus_address_bech32: consensus_address.clone(),
        };

        if first_call {
            info!(
                consensus_address = %consensus_address,
                bonded = info.bonded,
                "validator consensus address resolved"
            );
        }

        Ok(info)
    }
}

trait IntoBytes {
    fn into_bytes(self) -> Vec<u8>;
}

impl<M: prost::Message> IntoBytes for M {
    fn into_bytes(self) -> Vec<u8> {
        self.encode_to_vec()
    }
}
