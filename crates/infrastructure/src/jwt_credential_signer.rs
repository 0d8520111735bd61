//! HS256-signed credential tokens.
//!
//! The token payload is the claim snapshot itself; the signature makes it
//! tamper-evident, not secret. Verification enforces expiry with zero
//! leeway so a credential is invalid from the first second past `exp`.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use nutrack_application::CredentialSigner;
use nutrack_core::{AppError, AppResult};
use nutrack_domain::CredentialClaims;

/// Minimum accepted signing secret length in bytes.
const MIN_SECRET_BYTES: usize = 32;

/// Credential signer backed by an HMAC-SHA256 shared secret.
pub struct JwtCredentialSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtCredentialSigner {
    /// Creates a signer from the shared secret.
    ///
    /// Rejects secrets shorter than 32 bytes; a short HMAC key undermines
    /// every credential signed with it.
    pub fn new(secret: &str) -> AppResult<Self> {
        if secret.len() < MIN_SECRET_BYTES {
            return Err(AppError::Validation(format!(
                "credential secret must be at least {MIN_SECRET_BYTES} bytes"
            )));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }
}

impl CredentialSigner for JwtCredentialSigner {
    fn sign(&self, claims: &CredentialClaims) -> AppResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|error| AppError::Internal(format!("failed to sign credential: {error}")))
    }

    fn verify(&self, token: &str) -> AppResult<CredentialClaims> {
        decode::<CredentialClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|error| AppError::Unauthorized(format!("invalid credential: {error}")))
    }
}
