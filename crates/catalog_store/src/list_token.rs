//! Unsigned pagination token used by the Tag/View list endpoints.
//!
//! Distinct from the signed search page token in `catalog_search`: list
//! endpoints are simple keyset scans with no query to bind the token to, so
//! there's nothing worth signing.

use anyhow::Context;
use base64::{
    engine::general_purpose::URL_SAFE_NO_PAD,
    Engine,
};
use errors::ErrorMetadata;
use serde::{
    Deserialize,
    Serialize,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListToken {
    #[serde(rename = "u")]
    pub last_updated: i64,
    #[serde(rename = "i")]
    pub last_id: String,
}

impl ListToken {
    pub fn encode(&self) -> String {
        let payload = serde_json::to_vec(self).expect("ListToken always serializes");
        URL_SAFE_NO_PAD.encode(payload)
    }

    pub fn decode(token: &str) -> anyhow::Result<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| ErrorMetadata::invalid_argument("InvalidPageToken", "invalid page_token"))?;
        serde_json::from_slice(&bytes)
            .map_err(|_| ErrorMetadata::invalid_argument("InvalidPageToken", "invalid page_token"))
            .with_context(|| "decoding list token")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let token = ListToken {
            last_updated: 1_700_000_000_000,
            last_id: "01HZZZ".to_string(),
        };
        let encoded = token.encode();
        assert!(!encoded.contains('='));
        assert_eq!(ListToken::decode(&encoded).unwrap(), token);
    }

    #[test]
    fn rejects_garbage() {
        assert!(ListToken::decode("not-a-token!!").is_err());
    }
}
