use base64::engine::general_purpose::{ STANDARD, URL_SAFE_NO_PAD };
use base64::Engine as _;
use chrono::Utc;
use hmac::{ Hmac, Mac };
use serde_json::json;
use sha2::Sha256;

use super::ChatError;

type HmacSha256 = Hmac<Sha256>;

const TOKEN_TTL_MS: i64 = 3_600_000;

/// Builds the compact `header.payload.signature` credential some vendors
/// require in place of a plain Bearer key. The compound key is split on the
/// first `.` into a key id and a signing secret.
///
/// Header and payload are base64url without padding; the HMAC-SHA256
/// signature is standard base64 with padding, matching what the service
/// verifies. Tokens carry a one-hour expiry but are rebuilt for every
/// request anyway.
pub struct TokenSigner {
    api_key_id: String,
    secret: String,
}

impl TokenSigner {
    pub fn from_compound_key(key: &str) -> Result<Self, ChatError> {
        let (id, secret) = key.split_once('.').ok_or(ChatError::MalformedKey)?;
        if id.is_empty() || secret.is_empty() {
            return Err(ChatError::MalformedKey);
        }
        Ok(Self {
            api_key_id: id.to_string(),
            secret: secret.to_string(),
        })
    }

    pub fn sign(&self) -> String {
        let now = Utc::now().timestamp_millis();
        self.sign_at(now, now + TOKEN_TTL_MS)
    }

    fn sign_at(&self, timestamp_ms: i64, expires_ms: i64) -> String {
        let header = json!({ "alg": "HS256", "sign_type": "SIGN" });
        let payload = json!({
            "api_key": self.api_key_id,
            "exp": expires_ms,
            "timestamp": timestamp_ms,
        });

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(payload.to_string())
        );

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(signing_input.as_bytes());
        let signature = STANDARD.encode(mac.finalize().into_bytes());

        format!("{}.{}", signing_input, signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn token_has_three_dot_separated_parts() {
        let signer = TokenSigner::from_compound_key("AK123.SK456").unwrap();
        let token = signer.sign();
        assert_eq!(token.matches('.').count(), 2);
        let parts: Vec<&str> = token.split('.').collect();
        assert!(parts.iter().all(|p| !p.is_empty()));
    }

    #[test]
    fn header_and_payload_decode_to_expected_json() {
        let signer = TokenSigner::from_compound_key("AK123.SK456").unwrap();
        let token = signer.sign_at(1_700_000_000_000, 1_700_003_600_000);
        let parts: Vec<&str> = token.split('.').collect();

        let header: Value = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[0]).unwrap()).unwrap();
        assert_eq!(header["alg"], "HS256");
        assert_eq!(header["sign_type"], "SIGN");

        let payload: Value = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap();
        assert_eq!(payload["api_key"], "AK123");
        assert_eq!(payload["exp"], 1_700_003_600_000i64);
        assert_eq!(payload["timestamp"], 1_700_000_000_000i64);
    }

    #[test]
    fn signature_is_deterministic_for_fixed_timestamps() {
        let signer = TokenSigner::from_compound_key("AK123.SK456").unwrap();
        let a = signer.sign_at(1_700_000_000_000, 1_700_003_600_000);
        let b = signer.sign_at(1_700_000_000_000, 1_700_003_600_000);
        assert_eq!(a, b);
    }

    #[test]
    fn malformed_compound_keys_are_rejected() {
        assert!(matches!(TokenSigner::from_compound_key("nodot"), Err(ChatError::MalformedKey)));
        assert!(matches!(TokenSigner::from_compound_key(".secret"), Err(ChatError::MalformedKey)));
        assert!(matches!(TokenSigner::from_compound_key("id."), Err(ChatError::MalformedKey)));
    }
}
