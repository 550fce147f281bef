use std::sync::LazyLock;

use anyhow::Context;
use errors::ErrorMetadata;
use regex::Regex;

static APP_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("static pattern compiles"));

pub const OUTBOX_TABLE_SUFFIX: &str = "_data_outbox_events_v2";

/// Validates a tenant identifier. This is the sole defense against SQL
/// injection for the per-tenant physical table names below, so every
/// table-name call site must route through it first.
pub fn validate_app_id(app_id: &str) -> anyhow::Result<()> {
    if app_id.is_empty() {
        anyhow::bail!(ErrorMetadata::invalid_argument(
            "AppIdRequired",
            "app_id required"
        ));
    }
    if !APP_ID_PATTERN.is_match(app_id) {
        anyhow::bail!(ErrorMetadata::invalid_argument(
            "InvalidAppId",
            "invalid app_id"
        ));
    }
    Ok(())
}

/// Composes the quoted physical table name `"<app_id>_<base>"` for a tenant.
pub fn table_name(app_id: &str, base: &str) -> anyhow::Result<String> {
    validate_app_id(app_id.trim())
        .with_context(|| format!("deriving table name for base {base}"))?;
    Ok(format!("\"{}_{base}\"", app_id.trim()))
}

pub fn app_id_from_outbox_table(table_name: &str) -> Option<String> {
    let app_id = table_name.strip_suffix(OUTBOX_TABLE_SUFFIX)?;
    if app_id.is_empty() || !APP_ID_PATTERN.is_match(app_id) {
        return None;
    }
    Some(app_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_alnum_and_underscore() {
        assert!(validate_app_id("acme_123").is_ok());
    }

    #[test]
    fn rejects_empty_and_special_chars() {
        assert!(validate_app_id("").is_err());
        assert!(validate_app_id("acme-beta").is_err());
        assert!(validate_app_id("acme; DROP TABLE x;").is_err());
    }

    #[test]
    fn table_name_is_quoted_and_suffixed() {
        assert_eq!(
            table_name("acme", "data_assets_v2").unwrap(),
            "\"acme_data_assets_v2\""
        );
    }

    #[test]
    fn table_name_trims_whitespace() {
        assert_eq!(
            table_name(" acme ", "data_assets_v2").unwrap(),
            "\"acme_data_assets_v2\""
        );
    }

    #[test]
    fn app_id_from_outbox_table_roundtrips() {
        assert_eq!(
            app_id_from_outbox_table("acme_data_outbox_events_v2"),
            Some("acme".to_string())
        );
        assert_eq!(app_id_from_outbox_table("_data_outbox_events_v2"), None);
        assert_eq!(app_id_from_outbox_table("acme_data_assets_v2"), None);
    }
}
