//! Signed, versioned search page token.
//!
//! The payload is base64url-encoded JSON; when a secret is configured a
//! second base64url part carries an HMAC-SHA256 over the first, separated by
//! a `.`. Mixing signed and unsigned tokens is rejected outright rather than
//! silently trusting an unsigned token when a secret is configured.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use errors::ErrorMetadata;
use hmac::{
    Hmac,
    Mac,
};
use serde::{
    Deserialize,
    Serialize,
};
use sha2::{
    Digest,
    Sha256,
};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageTokenPayload {
    #[serde(rename = "v", default = "default_version")]
    pub version: i32,
    #[serde(rename = "a")]
    pub anchor: i64,
    #[serde(rename = "u")]
    pub last_updated: i64,
    #[serde(rename = "i")]
    pub last_id: String,
    #[serde(rename = "h")]
    pub tags_hash: String,
    #[serde(rename = "app")]
    pub app_id: String,
    #[serde(rename = "team")]
    pub team_id: String,
}

fn default_version() -> i32 {
    1
}

fn invalid_token() -> anyhow::Error {
    anyhow::anyhow!(ErrorMetadata::invalid_argument(
        "InvalidPageToken",
        "invalid page_token"
    ))
}

pub fn encode_page_token(secret: &[u8], payload: &PageTokenPayload) -> anyhow::Result<String> {
    let raw = serde_json::to_vec(payload)?;
    let encoded = URL_SAFE_NO_PAD.encode(raw);
    if secret.is_empty() {
        return Ok(encoded);
    }
    let mut mac = HmacSha256::new_from_slice(secret).expect("hmac accepts any key length");
    mac.update(encoded.as_bytes());
    let sig = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    Ok(format!("{encoded}.{sig}"))
}

pub fn decode_page_token(secret: &[u8], token: &str) -> anyhow::Result<PageTokenPayload> {
    if token.is_empty() {
        anyhow::bail!(ErrorMetadata::invalid_argument(
            "PageTokenRequired",
            "page_token required"
        ));
    }
    let parts: Vec<&str> = token.split('.').collect();
    let payload_part = parts[0];

    if secret.is_empty() {
        if parts.len() != 1 {
            return Err(invalid_token());
        }
        return decode_payload(payload_part);
    }

    if parts.len() != 2 {
        return Err(invalid_token());
    }
    let mut mac = HmacSha256::new_from_slice(secret).expect("hmac accepts any key length");
    mac.update(payload_part.as_bytes());
    let expected = mac.finalize().into_bytes();
    let sig = URL_SAFE_NO_PAD.decode(parts[1]).map_err(|_| invalid_token())?;
    if expected.as_slice().ct_eq(&sig).unwrap_u8() != 1 {
        return Err(invalid_token());
    }
    decode_payload(payload_part)
}

fn decode_payload(payload_part: &str) -> anyhow::Result<PageTokenPayload> {
    let raw = URL_SAFE_NO_PAD
        .decode(payload_part)
        .map_err(|_| invalid_token())?;
    serde_json::from_slice(&raw).map_err(|_| invalid_token())
}

pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out: Vec<String> = tags
        .iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty() && seen.insert(tag.clone()))
        .collect();
    out.sort();
    out
}

pub fn normalize_groups(groups: &[Vec<String>]) -> Vec<Vec<String>> {
    let mut out: Vec<Vec<String>> = groups
        .iter()
        .map(|group| normalize_tags(group))
        .filter(|group| !group.is_empty())
        .collect();
    out.sort_by_key(|group| group.join(","));
    out
}

pub fn hash_query(groups: &[Vec<String>], user_tags: &[String], name: &str) -> String {
    let mut parts: Vec<String> = groups.iter().map(|group| group.join(",")).collect();
    parts.push("|".to_string());
    parts.push(user_tags.join(","));
    parts.push("|".to_string());
    parts.push(name.to_string());
    let raw = parts.join(";");
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_round_trip() {
        let payload = PageTokenPayload {
            version: 1,
            anchor: 100,
            last_updated: 90,
            last_id: "a1".into(),
            tags_hash: "hash".into(),
            app_id: "acme".into(),
            team_id: "team1".into(),
        };
        let token = encode_page_token(b"", &payload).unwrap();
        assert!(!token.contains('.'));
        assert_eq!(decode_page_token(b"", &token).unwrap(), payload);
    }

    #[test]
    fn signed_round_trip() {
        let payload = PageTokenPayload {
            version: 1,
            anchor: 100,
            last_updated: 90,
            last_id: "a1".into(),
            tags_hash: "hash".into(),
            app_id: "acme".into(),
            team_id: "team1".into(),
        };
        let token = encode_page_token(b"secret", &payload).unwrap();
        assert!(token.contains('.'));
        assert_eq!(decode_page_token(b"secret", &token).unwrap(), payload);
    }

    #[test]
    fn rejects_signed_token_without_secret() {
        let payload = PageTokenPayload {
            version: 1,
            anchor: 1,
            last_updated: 1,
            last_id: "x".into(),
            tags_hash: "h".into(),
            app_id: "a".into(),
            team_id: "t".into(),
        };
        let token = encode_page_token(b"secret", &payload).unwrap();
        assert!(decode_page_token(b"", &token).is_err());
    }

    #[test]
    fn rejects_unsigned_token_when_secret_configured() {
        let payload = PageTokenPayload {
            version: 1,
            anchor: 1,
            last_updated: 1,
            last_id: "x".into(),
            tags_hash: "h".into(),
            app_id: "a".into(),
            team_id: "t".into(),
        };
        let token = encode_page_token(b"", &payload).unwrap();
        assert!(decode_page_token(b"secret", &token).is_err());
    }

    #[test]
    fn rejects_tampered_signature() {
        let payload = PageTokenPayload {
            version: 1,
            anchor: 1,
            last_updated: 1,
            last_id: "x".into(),
            tags_hash: "h".into(),
            app_id: "a".into(),
            team_id: "t".into(),
        };
        let token = encode_page_token(b"secret", &payload).unwrap();
        let mut tampered = token.clone();
        tampered.push('x');
        assert!(decode_page_token(b"secret", &tampered).is_err());
    }

    #[test]
    fn group_and_tag_normalization_is_order_independent() {
        let groups = vec![
            vec!["b".to_string(), "a".to_string(), "a".to_string()],
            vec![],
        ];
        let normalized = normalize_groups(&groups);
        assert_eq!(normalized, vec![vec!["a".to_string(), "b".to_string()]]);
    }
}
