//! HMAC-SHA512 verification of run task deliveries.
//!
//! The platform signs the raw request body with the run task's HMAC key and
//! sends the lowercase hex digest in `X-TFC-Task-Signature`. The digest is
//! compared in constant time and is never logged.

use std::sync::Arc;

use autoapply::Signature;
use hmac::{Hmac, Mac};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// Header carrying the hex digest of the request body.
pub const SIGNATURE_HEADER: &str = "x-tfc-task-signature";

/// Verifies delivery signatures against a shared secret.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Arc<[u8]>,
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier").finish_non_exhaustive()
    }
}

impl SignatureVerifier {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            secret: Arc::from(secret.as_ref()),
        }
    }

    /// Checks `signature` (hex, as sent by the platform) against `body`.
    ///
    /// A missing or non-hex signature is treated the same as a mismatch.
    pub fn verify(&self, body: &[u8], signature: Option<&str>) -> Signature {
        let Some(expected) = signature.and_then(|s| hex::decode(s.trim()).ok()) else {
            return Signature::Invalid;
        };
        let Ok(mut mac) = HmacSha512::new_from_slice(&self.secret) else {
            return Signature::Invalid;
        };
        mac.update(body);
        match mac.verify_slice(&expected) {
            Ok(()) => Signature::Valid,
            Err(_) => Signature::Invalid,
        }
    }

    /// Computes the hex signature the platform would send for `body`.
    pub fn sign(&self, body: &[u8]) -> String {
        // HMAC accepts keys of any length, so construction cannot fail.
        let mut mac = match HmacSha512::new_from_slice(&self.secret) {
            Ok(mac) => mac,
            Err(_) => return String::new(),
        };
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &[u8] = br#"{"stage":"post_plan","run_id":"run-1"}"#;

    #[test]
    fn matching_signature_is_valid() {
        let verifier = SignatureVerifier::new("hmac-secret");
        let signature = verifier.sign(BODY);

        assert_eq!(signature.len(), 128);
        assert_eq!(verifier.verify(BODY, Some(&signature)), Signature::Valid);
    }

    #[test]
    fn uppercase_hex_is_accepted() {
        let verifier = SignatureVerifier::new("hmac-secret");
        let signature = verifier.sign(BODY).to_uppercase();

        assert_eq!(verifier.verify(BODY, Some(&signature)), Signature::Valid);
    }

    #[test]
    fn tampered_body_is_invalid() {
        let verifier = SignatureVerifier::new("hmac-secret");
        let signature = verifier.sign(BODY);
        let tampered = br#"{"stage":"post_plan","run_id":"run-2"}"#;

        assert_eq!(verifier.verify(tampered, Some(&signature)), Signature::Invalid);
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let signature = SignatureVerifier::new("other-secret").sign(BODY);

        assert_eq!(
            SignatureVerifier::new("hmac-secret").verify(BODY, Some(&signature)),
            Signature::Invalid
        );
    }

    #[test]
    fn missing_or_garbage_signature_is_invalid() {
        let verifier = SignatureVerifier::new("hmac-secret");

        assert_eq!(verifier.verify(BODY, None), Signature::Invalid);
        assert_eq!(verifier.verify(BODY, Some("not-hex")), Signature::Invalid);
        assert_eq!(verifier.verify(BODY, Some("")), Signature::Invalid);
    }

    #[test]
    fn debug_output_hides_secret() {
        let verifier = SignatureVerifier::new("hmac-secret");
        assert!(!format!("{verifier:?}").contains("hmac-secret"));
    }
}
