use base64::{engine::general_purpose, Engine as _};
use ed25519_dalek::{Signer as _, SigningKey, SECRET_KEY_LENGTH};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::ExchangeError;

type HmacSha256 = Hmac<Sha256>;

/// Accepts either a raw 32-byte seed or a PKCS#8 DER blob, both base64 encoded.
pub fn load_signing_key(key_b64: &str) -> anyhow::Result<SigningKey> {
    let key_bytes = general_purpose::STANDARD.decode(key_b64.trim())?;

    let private_key_bytes = if key_bytes.len() == 48 && key_bytes[0] == 0x30 {
        &key_bytes[16..48]
    } else if key_bytes.len() == SECRET_KEY_LENGTH {
        &key_bytes[..]
    } else {
        anyhow::bail!("Invalid Ed25519 private key format");
    };

    Ok(SigningKey::from_bytes(private_key_bytes.try_into()?))
}

/// Request signer for the two key types Binance issues.
pub enum RequestSigner {
    Hmac(String),
    Ed25519(SigningKey),
}

impl RequestSigner {
    /// Signs a query string. HMAC keys produce lowercase hex, Ed25519 keys base64.
    pub fn sign(&self, payload: &str) -> Result<String, ExchangeError> {
        match self {
            RequestSigner::Hmac(secret) => {
                let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
                    .map_err(|e| ExchangeError::Request(format!("invalid HMAC key: {}", e)))?;
                mac.update(payload.as_bytes());
                Ok(hex::encode(mac.finalize().into_bytes()))
            }
            RequestSigner::Ed25519(key) => {
                let sig = key.sign(payload.as_bytes());
                Ok(general_purpose::STANDARD.encode(sig.to_bytes()))
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RequestSigner::Hmac(_) => "HMAC-SHA256",
            RequestSigner::Ed25519(_) => "Ed25519",
        }
    }
}

/// API key plus the signer matching it.
pub struct Credentials {
    pub api_key: String,
    pub signer: RequestSigner,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("signer", &self.signer.kind())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_signature_matches_binance_docs_example() {
        let signer = RequestSigner::Hmac(
            "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j".to_string(),
        );
        let payload = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";

        assert_eq!(
            signer.sign(payload).unwrap(),
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    #[test]
    fn hmac_signs_with_an_empty_secret() {
        let signature = RequestSigner::Hmac(String::new()).sign("timestamp=1").unwrap();
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn ed25519_signature_verifies() {
        use ed25519_dalek::{Signature, Verifier};

        let seed = [7u8; SECRET_KEY_LENGTH];
        let key = load_signing_key(&general_purpose::STANDARD.encode(seed)).unwrap();
        let verifying = key.verifying_key();
        let signer = RequestSigner::Ed25519(key);

        let sig_b64 = signer.sign("symbol=ETHUSDT&timestamp=1").unwrap();
        let sig_bytes = general_purpose::STANDARD.decode(sig_b64).unwrap();
        let sig = Signature::from_slice(&sig_bytes).unwrap();

        assert!(verifying.verify(b"symbol=ETHUSDT&timestamp=1", &sig).is_ok());
    }

    #[test]
    fn pkcs8_wrapped_key_is_unwrapped() {
        let seed = [9u8; SECRET_KEY_LENGTH];
        let mut der = vec![
            0x30, 0x2e, 0x02, 0x01, 0x00, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x04, 0x22,
            0x04, 0x20,
        ];
        der.extend_from_slice(&seed);

        let key = load_signing_key(&general_purpose::STANDARD.encode(&der)).unwrap();
        assert_eq!(key.to_bytes(), seed);
    }

    #[test]
    fn rejects_wrong_length_key() {
        let err = load_signing_key(&general_purpose::STANDARD.encode([1u8; 10]));
        assert!(err.is_err());
    }

    #[test]
    fn debug_output_hides_key() {
        let creds = Credentials {
            api_key: "super-secret".to_string(),
            signer: RequestSigner::Hmac("also-secret".to_string()),
        };
        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("HMAC-SHA256"));
    }
}
