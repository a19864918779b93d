//! Lock mechanism codec.
//!
//! Converts typed [`LockDescriptor`] / [`ClaimDescriptor`] values to and
//! from their wire envelopes, checks mechanism payloads for completeness,
//! and verifies claim evidence against a stored lock. Stateless apart from
//! the configured digest.

use assetlock_types::{
    AssetLockError, ClaimDescriptor, EncodedClaim, EncodedLock, HashFunction, HtlcClaim, HtlcLock,
    LockDescriptor, LockMechanism, LockRecord, Result,
};
use sha2::{Digest, Sha256, Sha512};

/// Mechanism payload codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct LockCodec {
    hash_function: HashFunction,
}

impl LockCodec {
    #[must_use]
    pub fn new(hash_function: HashFunction) -> Self {
        Self { hash_function }
    }

    #[must_use]
    pub fn hash_function(&self) -> HashFunction {
        self.hash_function
    }

    /// Digest `data` with the configured hash function.
    #[must_use]
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self.hash_function {
            HashFunction::Sha256 => Sha256::digest(data).to_vec(),
            HashFunction::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    /// Build the HTLC lock a recipient can later open with `preimage`.
    #[must_use]
    pub fn htlc_lock(&self, preimage: &[u8], expiry_secs: u64) -> LockDescriptor {
        LockDescriptor::htlc(self.digest(preimage), expiry_secs)
    }

    // -----------------------------------------------------------------
    // Encoding
    // -----------------------------------------------------------------

    pub fn encode_lock(&self, lock: &LockDescriptor) -> Result<EncodedLock> {
        let payload = match lock {
            LockDescriptor::Htlc(htlc) => serde_json::to_vec(htlc)?,
        };
        Ok(EncodedLock {
            mechanism: lock.mechanism(),
            payload,
        })
    }

    pub fn decode_lock(&self, encoded: &EncodedLock) -> Result<LockDescriptor> {
        self.decode_lock_payload(encoded.mechanism, &encoded.payload)
    }

    /// Decode a stored lock payload for `mechanism`.
    pub fn decode_lock_payload(
        &self,
        mechanism: LockMechanism,
        payload: &[u8],
    ) -> Result<LockDescriptor> {
        match mechanism {
            LockMechanism::Htlc => Ok(LockDescriptor::Htlc(serde_json::from_slice::<HtlcLock>(
                payload,
            )?)),
        }
    }

    /// Decode the lock condition stored in `record`.
    pub fn decode_record(&self, record: &LockRecord) -> Result<LockDescriptor> {
        self.decode_lock_payload(record.mechanism, &record.lock_payload)
    }

    pub fn encode_claim(&self, claim: &ClaimDescriptor) -> Result<EncodedClaim> {
        let payload = match claim {
            ClaimDescriptor::Htlc(htlc) => serde_json::to_vec(htlc)?,
        };
        Ok(EncodedClaim {
            mechanism: claim.mechanism(),
            payload,
        })
    }

    pub fn decode_claim(&self, encoded: &EncodedClaim) -> Result<ClaimDescriptor> {
        match encoded.mechanism {
            LockMechanism::Htlc => Ok(ClaimDescriptor::Htlc(serde_json::from_slice::<HtlcClaim>(
                &encoded.payload,
            )?)),
        }
    }

    // -----------------------------------------------------------------
    // Payload checks
    // -----------------------------------------------------------------

    /// Structural check of a lock payload.
    pub fn validate_lock(&self, lock: &LockDescriptor) -> Result<()> {
        match lock {
            LockDescriptor::Htlc(htlc) if htlc.hash_digest.is_empty() => {
                Err(AssetLockError::MissingField {
                    field: "hash_digest",
                })
            }
            LockDescriptor::Htlc(_) => Ok(()),
        }
    }

    /// Structural check of claim evidence.
    pub fn validate_claim(&self, claim: &ClaimDescriptor) -> Result<()> {
        match claim {
            ClaimDescriptor::Htlc(htlc) if htlc.preimage.is_empty() => {
                Err(AssetLockError::MissingField { field: "preimage" })
            }
            ClaimDescriptor::Htlc(_) => Ok(()),
        }
    }

    /// Check that `claim` opens `lock`.
    ///
    /// # Errors
    /// - `UnsupportedMechanism` if the claim is for a different mechanism
    /// - `InvalidPreimage` if the HTLC preimage doesn't hash to the stored digest
    pub fn verify_claim(&self, lock: &LockDescriptor, claim: &ClaimDescriptor) -> Result<()> {
        if lock.mechanism() != claim.mechanism() {
            return Err(AssetLockError::UnsupportedMechanism {
                expected: lock.mechanism(),
                actual: claim.mechanism(),
            });
        }
        match (lock, claim) {
            (LockDescriptor::Htlc(htlc_lock), ClaimDescriptor::Htlc(htlc_claim)) => {
                if self.digest(&htlc_claim.preimage) == htlc_lock.hash_digest {
                    Ok(())
                } else {
                    Err(AssetLockError::InvalidPreimage)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_digest_known_vector() {
        let codec = LockCodec::default();
        assert_eq!(
            hex::encode(codec.digest(b"abc")),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn sha512_digest_length() {
        let codec = LockCodec::new(HashFunction::Sha512);
        assert_eq!(codec.digest(b"abc").len(), 64);
    }

    #[test]
    fn lock_envelope_roundtrip() {
        let codec = LockCodec::default();
        let lock = codec.htlc_lock(b"secret", 1_700_000_000);
        let encoded = codec.encode_lock(&lock).unwrap();
        assert_eq!(encoded.mechanism, LockMechanism::Htlc);
        assert_eq!(codec.decode_lock(&encoded).unwrap(), lock);
    }

    #[test]
    fn claim_envelope_roundtrip() {
        let codec = LockCodec::default();
        let claim = ClaimDescriptor::htlc(b"secret".to_vec());
        let encoded = codec.encode_claim(&claim).unwrap();
        assert_eq!(codec.decode_claim(&encoded).unwrap(), claim);
    }

    #[test]
    fn garbage_payload_is_codec_error() {
        let codec = LockCodec::default();
        let err = codec
            .decode_lock_payload(LockMechanism::Htlc, b"not json")
            .unwrap_err();
        assert!(matches!(err, AssetLockError::Codec(_)));
    }

    #[test]
    fn empty_hash_rejected() {
        let codec = LockCodec::default();
        let err = codec
            .validate_lock(&LockDescriptor::htlc(Vec::new(), 10))
            .unwrap_err();
        assert!(matches!(
            err,
            AssetLockError::MissingField {
                field: "hash_digest"
            }
        ));
        assert!(codec.validate_lock(&codec.htlc_lock(b"x", 10)).is_ok());
    }

    #[test]
    fn empty_preimage_rejected() {
        let codec = LockCodec::default();
        let err = codec
            .validate_claim(&ClaimDescriptor::htlc(Vec::new()))
            .unwrap_err();
        assert!(matches!(err, AssetLockError::MissingField { field: "preimage" }));
    }

    #[test]
    fn verify_claim_matches_preimage() {
        let codec = LockCodec::default();
        let lock = codec.htlc_lock(b"open sesame", 10);
        assert!(
            codec
                .verify_claim(&lock, &ClaimDescriptor::htlc(b"open sesame".to_vec()))
                .is_ok()
        );
        let err = codec
            .verify_claim(&lock, &ClaimDescriptor::htlc(b"wrong".to_vec()))
            .unwrap_err();
        assert!(matches!(err, AssetLockError::InvalidPreimage));
    }

    #[test]
    fn digest_function_must_match_lock() {
        let preimage = b"cross-chain";
        let lock = LockCodec::new(HashFunction::Sha512).htlc_lock(preimage, 10);
        let err = LockCodec::new(HashFunction::Sha256)
            .verify_claim(&lock, &ClaimDescriptor::htlc(preimage.to_vec()))
            .unwrap_err();
        assert!(matches!(err, AssetLockError::InvalidPreimage));
    }
}
