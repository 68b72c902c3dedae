use bech32::{FromBase32, ToBase32};
use sha2::{Digest, Sha256};
use vw_types::error::ValidatorFetchError;

use crate::bech32_overrides;

/// Derives the bech32 consensus (`valcons`) address for a validator from its
/// operator address and consensus pubkey bytes, following
/// `GetValInfo`'s three-step fallback: direct use, `valoper`-substring
/// split, then the override table.
pub fn derive_consensus_address(
    operator_address: &str,
    consensus_pubkey_bytes: &[u8],
    extra_overrides: &[(String, String)],
) -> Result<String, ValidatorFetchError> {
    if operator_address.contains("valcons") {
        return Ok(operator_address.to_string());
    }

    let hrp = if let Some(idx) = operator_address.find("valoper") {
        let prefix = &operator_address[..idx];
        format!("{prefix}valcons")
    } else {
        let account_prefix = account_prefix(operator_address)?;
        bech32_overrides::lookup(&account_prefix, extra_overrides).ok_or_else(|| {
            ValidatorFetchError::UnknownPrefix(operator_address.to_string())
        })?
    };

    let payload = consensus_address_payload(consensus_pubkey_bytes);
    bech32::encode(&hrp, payload.to_base32(), bech32::Variant::Bech32)
        .map_err(|e| ValidatorFetchError::Bech32(e.to_string()))
}

/// First 20 bytes of the SHA-256 hash of the consensus pubkey — the
/// Tendermint address-from-pubkey convention.
pub fn consensus_address_payload(consensus_pubkey_bytes: &[u8]) -> [u8; 20] {
    let digest = Sha256::digest(consensus_pubkey_bytes);
    let mut out = [0u8; 20];
    out.copy_from_slice(&digest[..20]);
    out
}

fn account_prefix(address: &str) -> Result<String, ValidatorFetchError> {
    let (hrp, _data, _variant) = bech32::decode(address)
        .map_err(|e| ValidatorFetchError::Bech32(format!("decoding {address}: {e}")))?;
    Ok(hrp)
}

/// Decodes a bech32 address back to raw bytes (used by tests and by any
/// caller that needs to compare payloads rather than strings).
pub fn decode_payload(address: &str) -> Result<Vec<u8>, ValidatorFetchError> {
    let (_hrp, data, _variant) = bech32::decode(address)
        .map_err(|e| ValidatorFetchError::Bech32(format!("decoding {address}: {e}")))?;
    Vec::<u8>::from_base32(&data).map_err(|e| ValidatorFetchError::Bech32(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn derives_by_splitting_on_valoper() {
        let operator = "cosmosvaloper1p7lxyv6rv0ns6e7zgsxmswfhh6uecc9y4phv9s";
        let pubkey = [1u8; 32];
        let addr = derive_consensus_address(operator, &pubkey, &[]).unwrap();
        assert!(addr.starts_with("cosmosvalcons1"));
    }

    #[test]
    fn round_trips_payload() {
        let pubkey = [7u8; 32];
        let payload = consensus_address_payload(&pubkey);
        let encoded = bech32::encode("cosmosvalcons", payload.to_base32(), bech32::Variant::Bech32).unwrap();
        let decoded = decode_payload(&encoded).unwrap();
        assert_eq!(decoded, payload.to_vec());
    }

    #[test]
    fn extra_override_takes_precedence_over_built_in() {
        let extra = vec![("terra".to_string(), "terravalconsoverride".to_string())];
        let operator = "terra1p7lxyv6rv0ns6e7zgsxmswfhh6uecc9w6hrzg";
        let pubkey = [3u8; 32];
        let addr = derive_consensus_address(operator, &pubkey, &extra).unwrap();
        assert!(addr.starts_with("terravalconsoverride1"));
    }

    proptest! {
        #[test]
        fn derivation_by_valoper_split_never_panics(
            prefix in "[a-z]{2,12}",
            suffix in "[a-z0-9]{10,40}",
            pubkey in prop::collection::vec(any::<u8>(), 32)
        ) {
            let operator = format!("{prefix}valoper1{suffix}");
            let addr = derive_consensus_address(&operator, &pubkey, &[]).unwrap();
            prop_assert!(addr.starts_with(&format!("{prefix}valcons1")));
        }

        #[test]
        fn payload_round_trips_through_bech32(bytes in prop::collection::vec(any::<u8>(), 32)) {
            let payload = consensus_address_payload(&bytes);
            let encoded = bech32::encode("cosmosvalcons", payload.to_base32(), bech32::Variant::Bech32).unwrap();
            let decoded = decode_payload(&encoded).unwrap();
            prop_assert_eq!(decoded, payload.to_vec());
        }
    }
}
