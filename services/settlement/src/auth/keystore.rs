use std::boxed::Box;
use std::result::Result;
use std::sync::Arc;

use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;

use carshare_common::confidentiality::AbstractConfidentiality;
use carshare_common::config::AppAuthCfg;

#[derive(Debug, Clone)]
pub enum AuthKeystoreError {
    MissingSecret,
    CorruptedSecret(String),
    MissingKey(String),
    UnknownKeyType(String),
    BadKeyComponent(String),
}

#[derive(Deserialize)]
struct JwksEntry {
    kty: String,
    kid: Option<String>,
    alg: Option<String>,
    // RSA public components
    n: Option<String>,
    e: Option<String>,
    // symmetric secret
    k: Option<String>,
}

#[derive(Deserialize)]
struct JwksDocument {
    keys: Vec<JwksEntry>,
}

// The user-management service issues the tokens and owns the key pairs,
// this service only verifies signatures against a replicated JWKS kept
// in the confidentiality store. Token issuance never happens at here.
pub trait AbstractAuthKeystore: Send + Sync {
    fn resolve(&self, kid: Option<&str>) -> Result<(DecodingKey, Algorithm), AuthKeystoreError>;
    fn audience(&self) -> &[String];
}

pub struct AppAuthKeystore {
    _keys: Vec<JwksEntry>,
    _audience: Vec<String>,
}

impl AppAuthKeystore {
    pub fn try_build(
        cfg: &AppAuthCfg,
        cfdntl: Arc<Box<dyn AbstractConfidentiality>>,
    ) -> Result<Self, AuthKeystoreError> {
        let serial = cfdntl
            .try_get_payload(cfg.keystore_confidential_path.as_str())
            .map_err(|_e| AuthKeystoreError::MissingSecret)?;
        let doc = serde_json::from_str::<JwksDocument>(serial.as_str())
            .map_err(|e| AuthKeystoreError::CorruptedSecret(e.to_string()))?;
        if doc.keys.is_empty() {
            return Err(AuthKeystoreError::MissingKey("empty-jwks".to_string()));
        }
        Ok(Self {
            _keys: doc.keys,
            _audience: cfg.audience.clone(),
        })
    }

    fn build_key(entry: &JwksEntry) -> Result<(DecodingKey, Algorithm), AuthKeystoreError> {
        match entry.kty.as_str() {
            "RSA" => {
                let n = entry.n.as_deref().ok_or(AuthKeystoreError::BadKeyComponent(
                    "rsa-modulus-missing".to_string(),
                ))?;
                let e = entry.e.as_deref().ok_or(AuthKeystoreError::BadKeyComponent(
                    "rsa-exponent-missing".to_string(),
                ))?;
                let key = DecodingKey::from_rsa_components(n, e)
                    .map_err(|e| AuthKeystoreError::BadKeyComponent(e.to_string()))?;
                let alg = match entry.alg.as_deref() {
                    Some("RS384") => Algorithm::RS384,
                    Some("RS512") => Algorithm::RS512,
                    _default => Algorithm::RS256,
                };
                Ok((key, alg))
            }
            "oct" => {
                let k = entry.k.as_deref().ok_or(AuthKeystoreError::BadKeyComponent(
                    "symmetric-secret-missing".to_string(),
                ))?;
                let key = DecodingKey::from_base64_secret(k)
                    .map_err(|e| AuthKeystoreError::BadKeyComponent(e.to_string()))?;
                Ok((key, Algorithm::HS256))
            }
            _others => Err(AuthKeystoreError::UnknownKeyType(entry.kty.clone())),
        }
    }
} // end of impl AppAuthKeystore

impl AbstractAuthKeystore for AppAuthKeystore {
    fn resolve(&self, kid: Option<&str>) -> Result<(DecodingKey, Algorithm), AuthKeystoreError> {
        let found = match kid {
            Some(k) => self
                ._keys
                .iter()
                .find(|entry| entry.kid.as_deref() == Some(k)),
            None => self._keys.first(),
        };
        let entry = found.ok_or(AuthKeystoreError::MissingKey(
            kid.unwrap_or("unspecified").to_string(),
        ))?;
        Self::build_key(entry)
    }

    fn audience(&self) -> &[String] {
        self._audience.as_slice()
    }
}
