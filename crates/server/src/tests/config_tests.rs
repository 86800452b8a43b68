use super::{resolve_settings, Settings};

use std::{collections::HashMap, path::PathBuf};

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn defaults_without_file_or_env() {
    assert_eq!(resolve_settings(None, env_from(&[])), Settings::default());
}

#[test]
fn file_values_override_defaults() {
    let raw = r#"
bind_addr = "0.0.0.0:9000"
data_dir = "/var/lib/halo"
body_limit_bytes = "2048"
"#;
    let settings = resolve_settings(Some(raw), env_from(&[]));
    assert_eq!(settings.server_bind, "0.0.0.0:9000");
    assert_eq!(settings.data_dir, PathBuf::from("/var/lib/halo"));
    assert_eq!(settings.body_limit_bytes, 2048);
}

#[test]
fn app_prefixed_env_wins_over_legacy_and_file() {
    let raw = r#"bind_addr = "0.0.0.0:9000""#;
    let settings = resolve_settings(
        Some(raw),
        env_from(&[
            ("SERVER_BIND", "127.0.0.1:7000"),
            ("APP__BIND_ADDR", "127.0.0.1:7100"),
            ("DATA_DIR", "legacy"),
        ]),
    );
    assert_eq!(settings.server_bind, "127.0.0.1:7100");
    assert_eq!(settings.data_dir, PathBuf::from("legacy"));
}

#[test]
fn malformed_file_and_numbers_are_ignored() {
    let settings = resolve_settings(
        Some("this is not toml ["),
        env_from(&[("APP__BODY_LIMIT_BYTES", "lots")]),
    );
    assert_eq!(settings, Settings::default());
}
