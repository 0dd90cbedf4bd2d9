//! NDM challenge-response hashing
//!
//! ```text
//! h1       = hex(md5(username ":" realm ":" password))
//! response = hex(sha256(challenge || h1))
//! ```
//!
//! Field order and separators are fixed by the firmware.

use crate::error::{ManagerError, Result};
use reqwest::header::HeaderMap;
use sha2::{Digest, Sha256};

pub const REALM_HEADER: &str = "X-NDM-Realm";
pub const CHALLENGE_HEADER: &str = "X-NDM-Challenge";

/// Realm and nonce from a single `401` response.
///
/// Consumed by [`Challenge::respond`]; never stored or reused.
#[derive(Debug, PartialEq, Eq)]
pub struct Challenge {
    pub realm: String,
    pub nonce: String,
}

impl Challenge {
    /// Extract both challenge headers; either one missing is a protocol error
    pub fn from_headers(headers: &HeaderMap) -> Result<Self> {
        let realm = header_value(headers, REALM_HEADER);
        let nonce = header_value(headers, CHALLENGE_HEADER);
        match (realm, nonce) {
            (Some(realm), Some(nonce)) => Ok(Self { realm, nonce }),
            (realm, nonce) => Err(ManagerError::protocol(format!(
                "router did not return an auth challenge (realm present: {}, challenge present: {})",
                realm.is_some(),
                nonce.is_some()
            ))),
        }
    }

    /// Compute the POST password for these credentials
    pub fn respond(self, username: &str, password: &str) -> String {
        let h1 = credential_hash(username, &self.realm, password);
        challenge_response(&self.nonce, &h1)
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// `hex(md5(username:realm:password))`
pub fn credential_hash(username: &str, realm: &str, password: &str) -> String {
    let digest = md5::compute(format!("{username}:{realm}:{password}"));
    format!("{digest:x}")
}

/// `hex(sha256(challenge + h1))`
pub fn challenge_response(challenge: &str, h1: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(challenge.as_bytes());
    hasher.update(h1.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_reference_vector() {
        let h1 = credential_hash("alice", "example", "secret");
        assert_eq!(h1, "a110383056f556b818bd7026fed7451b");
        assert_eq!(
            challenge_response("abc123", &h1),
            "84c6556a839355ff32b59228139f41b1cdc8d6f970fd2796d9f33d4a5ec59539"
        );
    }

    #[test]
    fn test_respond_is_deterministic() {
        let make = || Challenge {
            realm: "example".to_string(),
            nonce: "abc123".to_string(),
        };
        let first = make().respond("alice", "secret");
        let second = make().respond("alice", "secret");
        assert_eq!(first, second);
        assert_eq!(
            first,
            "84c6556a839355ff32b59228139f41b1cdc8d6f970fd2796d9f33d4a5ec59539"
        );
        assert_ne!(first, make().respond("alice", "Secret"));
    }

    #[test]
    fn test_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(REALM_HEADER, HeaderValue::from_static("example"));
        assert!(matches!(
            Challenge::from_headers(&headers),
            Err(ManagerError::Protocol(_))
        ));

        headers.insert(CHALLENGE_HEADER, HeaderValue::from_static("abc123"));
        let challenge = Challenge::from_headers(&headers).unwrap();
        assert_eq!(challenge.realm, "example");
        assert_eq!(challenge.nonce, "abc123");
    }

    #[test]
    fn test_empty_header_counts_as_missing() {
        let mut headers = HeaderMap::new();
        headers.insert(REALM_HEADER, HeaderValue::from_static("example"));
        headers.insert(CHALLENGE_HEADER, HeaderValue::from_static(""));
        assert!(Challenge::from_headers(&headers).is_err());
    }
}
