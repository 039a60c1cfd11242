//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`DdigSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply `DDIG_*` environment overrides (highest priority)
//! 4. Validate

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::{DdigSettings, MailTransport, StoreBackend};

/// Env var naming an alternative settings file.
pub const SETTINGS_PATH_ENV: &str = "DDIG_SETTINGS";

/// Resolve the settings file path (`$DDIG_SETTINGS` or `./ddig.json`).
pub fn settings_path() -> PathBuf {
    std::env::var(SETTINGS_PATH_ENV)
        .ok()
        .filter(|v| !v.is_empty())
        .map_or_else(|| PathBuf::from("ddig.json"), PathBuf::from)
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<DdigSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<DdigSettings> {
    let mut settings = read_layers(path)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

fn read_layers(path: &Path) -> Result<DdigSettings> {
    let defaults = serde_json::to_value(DdigSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_owned(),
            source,
        })?;
        let user: Value = serde_json::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_owned(),
            source,
        })?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Check invariants that serde cannot express.
pub fn validate(settings: &DdigSettings) -> Result<()> {
    if settings.site.admin_email.trim().is_empty() {
        return Err(SettingsError::invalid("site.admin_email", "must not be empty"));
    }
    if settings.server.port == 0 {
        return Err(SettingsError::invalid("server.port", "must be non-zero"));
    }
    let mail_timeout = settings.mail.timeout_secs;
    if !(1..=60).contains(&mail_timeout) {
        return Err(SettingsError::invalid(
            "mail.timeout_secs",
            format!("must be within 1..=60, got {mail_timeout}"),
        ));
    }
    let handler_timeout = settings.server.handler_timeout_secs;
    if handler_timeout == 0 {
        return Err(SettingsError::invalid("server.handler_timeout_secs", "must be non-zero"));
    }
    // A request waits for persistence and then for its notifications.
    if mail_timeout >= handler_timeout {
        return Err(SettingsError::invalid(
            "mail.timeout_secs",
            format!(
                "must be shorter than server.handler_timeout_secs ({handler_timeout}), got {mail_timeout}"
            ),
        ));
    }
    Ok(())
}

/// Apply environment variable overrides to loaded settings.
///
/// Invalid values are ignored with a warning (the file/default value stays).
pub fn apply_env_overrides(settings: &mut DdigSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Override application against an arbitrary variable source.
pub fn apply_overrides_from<F>(settings: &mut DdigSettings, var: F)
where
    F: Fn(&str) -> Option<String>,
{
    let string = |name: &str| var(name).filter(|v| !v.is_empty());

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = string("DDIG_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = parsed(&var, "DDIG_PORT", |s| parse_u16_range(s, 1, 65535)) {
        settings.server.port = v;
    }

    // ── Store ───────────────────────────────────────────────────────
    if let Some(v) = string("DDIG_DATA_DIR") {
        settings.store.data_dir = PathBuf::from(v);
    }
    if let Some(v) = parsed(&var, "DDIG_STORE_BACKEND", parse_backend) {
        settings.store.backend = v;
    }

    // ── Site / admin ────────────────────────────────────────────────
    if let Some(v) = string("DDIG_ADMIN_EMAIL") {
        settings.site.admin_email = v;
    }
    if let Some(v) = string("DDIG_ADMIN_TOKEN") {
        settings.admin.api_token = Some(v);
    }

    // ── Mail ────────────────────────────────────────────────────────
    if let Some(v) = parsed(&var, "DDIG_MAIL_TRANSPORT", parse_transport) {
        settings.mail.transport = v;
    }
    if let Some(v) = string("DDIG_SMTP_HOST") {
        settings.mail.smtp_host = v;
    }
    if let Some(v) = parsed(&var, "DDIG_SMTP_PORT", |s| parse_u16_range(s, 1, 65535)) {
        settings.mail.smtp_port = v;
    }
    if let Some(v) = string("DDIG_SMTP_USERNAME") {
        settings.mail.username = Some(v);
    }
    if let Some(v) = string("DDIG_SMTP_PASSWORD") {
        settings.mail.password = Some(v);
    }
    if let Some(v) = parsed(&var, "DDIG_MAIL_TIMEOUT_SECS", |s| parse_u64_range(s, 1, 60)) {
        settings.mail.timeout_secs = v;
    }

    // ── Telemetry ───────────────────────────────────────────────────
    if let Some(v) = parsed(&var, "DDIG_LOG_JSON", parse_bool) {
        settings.telemetry.json = v;
    }
}

fn parsed<F, P, T>(var: &F, name: &str, parse: P) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    P: Fn(&str) -> Option<T>,
{
    let val = var(name)?;
    let result = parse(&val);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid env var, ignoring");
    }
    result
}

// ── Pure parsing functions ──────────────────────────────────────────

/// Accepts (case-insensitive) `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

fn parse_backend(val: &str) -> Option<StoreBackend> {
    match val.to_lowercase().as_str() {
        "jsonl" => Some(StoreBackend::Jsonl),
        "sqlite" => Some(StoreBackend::Sqlite),
        _ => None,
    }
}

fn parse_transport(val: &str) -> Option<MailTransport> {
    match val.to_lowercase().as_str() {
        "smtp" => Some(MailTransport::Smtp),
        "log" => Some(MailTransport::Log),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn deep_merge_nested_objects() {
        let target = json!({"mail": {"smtp_host": "localhost", "smtp_port": 587}});
        let source = json!({"mail": {"smtp_host": "smtp.example.com"}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["mail"]["smtp_host"], "smtp.example.com");
        assert_eq!(merged["mail"]["smtp_port"], 587);
    }

    #[test]
    fn deep_merge_replaces_arrays_and_skips_nulls() {
        let target = json!({"events": [1, 2], "name": "a"});
        let source = json!({"events": [3], "name": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["events"], json!([3]));
        assert_eq!(merged["name"], "a");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = read_layers(&dir.path().join("absent.json")).unwrap();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.site.name, "DDIG Ghana");
        assert_eq!(settings.events.len(), 2);
    }

    #[test]
    fn file_values_merge_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ddig.json");
        std::fs::write(
            &path,
            r#"{"server": {"port": 9000}, "store": {"backend": "sqlite"}, "events": []}"#,
        )
        .unwrap();

        let settings = read_layers(&path).unwrap();
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.store.backend, StoreBackend::Sqlite);
        assert!(settings.events.is_empty());
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ddig.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(read_layers(&path), Err(SettingsError::Parse { .. })));
    }

    #[test]
    fn env_overrides_apply() {
        let mut settings = DdigSettings::default();
        apply_overrides_from(
            &mut settings,
            vars(&[
                ("DDIG_PORT", "9191"),
                ("DDIG_ADMIN_TOKEN", "s3cret"),
                ("DDIG_MAIL_TRANSPORT", "SMTP"),
                ("DDIG_SMTP_HOST", "smtp.example.com"),
                ("DDIG_DATA_DIR", "/var/lib/ddig"),
                ("DDIG_LOG_JSON", "off"),
            ]),
        );
        assert_eq!(settings.server.port, 9191);
        assert_eq!(settings.admin.api_token.as_deref(), Some("s3cret"));
        assert_eq!(settings.mail.transport, MailTransport::Smtp);
        assert_eq!(settings.mail.smtp_host, "smtp.example.com");
        assert_eq!(settings.store.data_dir, PathBuf::from("/var/lib/ddig"));
        assert!(!settings.telemetry.json);
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let mut settings = DdigSettings::default();
        apply_overrides_from(
            &mut settings,
            vars(&[
                ("DDIG_PORT", "0"),
                ("DDIG_MAIL_TIMEOUT_SECS", "600"),
                ("DDIG_STORE_BACKEND", "postgres"),
                ("DDIG_HOST", ""),
            ]),
        );
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.mail.timeout_secs, 5);
        assert_eq!(settings.store.backend, StoreBackend::Jsonl);
        assert_eq!(settings.server.host, "0.0.0.0");
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut settings = DdigSettings::default();
        assert!(validate(&settings).is_ok());

        settings.site.admin_email = "  ".into();
        assert!(validate(&settings).is_err());

        let mut settings = DdigSettings::default();
        settings.mail.timeout_secs = 0;
        assert!(validate(&settings).is_err());

        let mut settings = DdigSettings::default();
        settings.server.port = 0;
        assert!(validate(&settings).is_err());
    }

    #[test]
    fn mail_timeout_must_fit_inside_handler_timeout() {
        let mut settings = DdigSettings::default();
        settings.mail.timeout_secs = 3;
        settings.server.handler_timeout_secs = 1;
        let err = validate(&settings).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { key: "mail.timeout_secs", .. }));

        settings.server.handler_timeout_secs = 3;
        assert!(validate(&settings).is_err());

        settings.server.handler_timeout_secs = 4;
        assert!(validate(&settings).is_ok());
    }

    #[test]
    fn parse_helpers() {
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_u16_range("80", 1, 65535), Some(80));
        assert_eq!(parse_u16_range("70000", 1, 65535), None);
        assert_eq!(parse_u64_range("61", 1, 60), None);
    }
}
