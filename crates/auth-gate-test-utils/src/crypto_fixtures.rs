//! Deterministic cryptographic fixtures.
//!
//! Each keypair is derived from a one-byte seed, so the same seed always
//! yields the same key and tests stay reproducible. Keys sign tokens the
//! way a real provider would (EdDSA with a `kid` header) and publish
//! themselves as JWK/JWKS JSON for mock endpoints.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use ring::signature::{Ed25519KeyPair, KeyPair};

/// A deterministic Ed25519 signing keypair for tests.
pub struct TestKeypair {
    kid: String,
    public_key_bytes: Vec<u8>,
    private_key_pkcs8: Vec<u8>,
}

impl TestKeypair {
    /// Derive a keypair from `seed`, published under `kid`.
    ///
    /// # Panics
    ///
    /// Panics when key generation fails; test fixtures fail loudly.
    #[must_use]
    pub fn new(seed: u8, kid: &str) -> Self {
        let seed_bytes = expand_seed(seed);

        let key_pair = Ed25519KeyPair::from_seed_unchecked(&seed_bytes)
            .expect("failed to derive test keypair from seed");

        Self {
            kid: kid.to_string(),
            public_key_bytes: key_pair.public_key().as_ref().to_vec(),
            private_key_pkcs8: build_pkcs8_from_seed(&seed_bytes),
        }
    }

    /// The key ID this keypair publishes under.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Sign a claims document into a compact JWT.
    ///
    /// # Panics
    ///
    /// Panics when signing fails.
    #[must_use]
    pub fn sign(&self, claims: &serde_json::Value) -> String {
        let encoding_key = EncodingKey::from_ed_der(&self.private_key_pkcs8);
        let mut header = Header::new(Algorithm::EdDSA);
        header.typ = Some("JWT".to_string());
        header.kid = Some(self.kid.clone());

        jsonwebtoken::encode(&header, claims, &encoding_key).expect("failed to sign test token")
    }

    /// This key as provider-published JWK JSON.
    #[must_use]
    pub fn jwk_json(&self) -> serde_json::Value {
        serde_json::json!({
            "kty": "OKP",
            "kid": self.kid,
            "crv": "Ed25519",
            "x": URL_SAFE_NO_PAD.encode(&self.public_key_bytes),
            "alg": "EdDSA",
            "use": "sig"
        })
    }

    /// A JWKS document containing only this key.
    #[must_use]
    pub fn jwks_json(&self) -> serde_json::Value {
        serde_json::json!({ "keys": [self.jwk_json()] })
    }
}

/// Expand a one-byte seed into a deterministic 32-byte Ed25519 seed.
fn expand_seed(seed: u8) -> [u8; 32] {
    let mut seed_bytes = [0u8; 32];
    seed_bytes[0] = seed;
    for (i, byte) in seed_bytes.iter_mut().enumerate().skip(1) {
        *byte = seed.wrapping_mul(i as u8).wrapping_add(i as u8);
    }
    seed_bytes
}

/// Build a PKCS#8 v1 document from an Ed25519 seed.
///
/// Ring does not expose PKCS#8 for a keypair built from a raw seed, so
/// the document is assembled by hand (RFC 5208 layout, Ed25519 OID
/// 1.3.101.112). Test-only; production keys never take this path.
fn build_pkcs8_from_seed(seed: &[u8; 32]) -> Vec<u8> {
    let mut pkcs8 = Vec::new();

    // Outer SEQUENCE, 46 bytes
    pkcs8.push(0x30);
    pkcs8.push(0x2e);

    // Version: INTEGER 0
    pkcs8.extend_from_slice(&[0x02, 0x01, 0x00]);

    // AlgorithmIdentifier: SEQUENCE { OID 1.3.101.112 }
    pkcs8.push(0x30);
    pkcs8.push(0x05);
    pkcs8.extend_from_slice(&[0x06, 0x03, 0x2b, 0x65, 0x70]);

    // PrivateKey: OCTET STRING wrapping OCTET STRING with the seed
    pkcs8.push(0x04);
    pkcs8.push(0x22);
    pkcs8.push(0x04);
    pkcs8.push(0x20);
    pkcs8.extend_from_slice(seed);

    pkcs8
}
