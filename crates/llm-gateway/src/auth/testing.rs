//! Shared fixtures for auth tests

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use parking_lot::Mutex;
use serde_json::{Value, json};

use super::config::AuthConfig;
use super::error::KeyFetchError;
use super::jwks::{Jwk, JwkSet, KeySetSource};

pub const TEST_KID: &str = "test-key-1";
pub const TEST_DOMAIN: &str = "tenant.example.com";
pub const TEST_ISSUER: &str = "https://tenant.example.com/";
pub const TEST_AUDIENCE: &str = "https://tenant.example.com/api/v2/";
pub const TEST_SECRET: &str = "internal-shared-secret";

/// Private key whose public half is `RSA_N`/`RSA_E`
pub const RSA_SIGNING_PEM: &[u8] = include_bytes!("testdata/rsa_signing.pem");
/// Unrelated private key, for forged signatures
pub const RSA_FOREIGN_PEM: &[u8] = include_bytes!("testdata/rsa_foreign.pem");

pub const RSA_N: &str = "0_iFE2tWtZOhEsMBVuLIFgpAohlLSVBMc50Yn18VEdDccaunSxuvksEbB7rZsHaBNl2LS5Ih6GfO0jLr7UlPEJBzinU2r-khCM7hwz7HzSK5PjmymRrjf53rObRJ8trEgceczksROM4nPgrB405JK72jrSHBoopmYb-USkHhe2rhYacTvtUiLUm8h5aVxrdxhSwofqlYJhYkx6q9sFzOERJDczUL-I1SBZPVfPrje1mjXXsyVImwIJnJfR2gQvDPoCooMqTU29MXOaVdFj5zfTSXms5ca1-IPl1-JXzfDxs9Q7WV8p0Www1vn7CbknLxEYRVNsClOqwmxchQRHXjDw";
pub const RSA_E: &str = "AQAB";

pub fn rsa_jwk(kid: &str) -> Jwk {
    Jwk {
        kid: Some(kid.to_string()),
        kty: "RSA".to_string(),
        alg: Some("RS256".to_string()),
        r#use: Some("sig".to_string()),
        n: Some(RSA_N.to_string()),
        e: Some(RSA_E.to_string()),
    }
}

/// Key set where every `kid` maps to the test signing key
pub fn jwk_set(kids: &[&str]) -> JwkSet {
    JwkSet {
        keys: kids.iter().map(|kid| rsa_jwk(kid)).collect(),
    }
}

pub fn jwk_set_json(kids: &[&str]) -> Value {
    let keys: Vec<Value> = kids
        .iter()
        .map(|kid| {
            json!({
                "kid": kid,
                "kty": "RSA",
                "alg": "RS256",
                "use": "sig",
                "n": RSA_N,
                "e": RSA_E,
            })
        })
        .collect();
    json!({ "keys": keys })
}

pub fn test_auth_config() -> AuthConfig {
    AuthConfig::for_domain(TEST_DOMAIN).unwrap()
}

pub fn now_secs() -> i64 {
    i64::try_from(
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs(),
    )
    .unwrap()
}

/// Standard claims valid for the test issuer and audience
pub fn valid_claims() -> Value {
    json!({
        "sub": "client@clients",
        "iss": TEST_ISSUER,
        "aud": TEST_AUDIENCE,
        "iat": now_secs(),
        "exp": now_secs() + 3600,
    })
}

pub fn mint_rs256(kid: Option<&str>, claims: &Value) -> String {
    mint_rs256_with(RSA_SIGNING_PEM, kid, claims)
}

pub fn mint_rs256_with(pem: &[u8], kid: Option<&str>, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = kid.map(str::to_string);
    let key = EncodingKey::from_rsa_pem(pem).unwrap();
    jsonwebtoken::encode(&header, claims, &key).unwrap()
}

pub fn mint_hs256(secret: &str, kid: Option<&str>, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::HS256);
    header.kid = kid.map(str::to_string);
    jsonwebtoken::encode(&header, claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
}

enum Behavior {
    Serve(JwkSet),
    Fail(KeyFetchError),
}

/// In-memory key source that counts fetches
pub struct CountingSource {
    behavior: Mutex<Behavior>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl CountingSource {
    pub fn new(set: JwkSet) -> Self {
        Self {
            behavior: Mutex::new(Behavior::Serve(set)),
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(error: KeyFetchError) -> Self {
        Self {
            behavior: Mutex::new(Behavior::Fail(error)),
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_keys(&self, set: JwkSet) {
        *self.behavior.lock() = Behavior::Serve(set);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl KeySetSource for CountingSource {
    async fn fetch(&self) -> Result<JwkSet, KeyFetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &*self.behavior.lock() {
            Behavior::Serve(set) => Ok(set.clone()),
            Behavior::Fail(e) => Err(e.clone()),
        }
    }
}
