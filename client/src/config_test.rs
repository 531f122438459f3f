use super::*;
use std::collections::HashMap;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn client_defaults_when_nothing_set() {
    let config = ClientConfig::from_lookup(lookup_from(&[])).unwrap();
    assert_eq!(config, ClientConfig::default());
    assert_eq!(config.relay_url, DEFAULT_RELAY_URL);
    assert_eq!(config.reconnect_attempts, 2);
}

#[test]
fn client_reads_overrides_and_trims_execution_slash() {
    let config = ClientConfig::from_lookup(lookup_from(&[
        ("COLLAB_RELAY_URL", "ws://relay.example:9000/ws"),
        ("COLLAB_EXECUTION_URL", "http://localhost:2000/api/v2/piston/"),
        ("COLLAB_RECONNECT_ATTEMPTS", " 5 "),
    ]))
    .unwrap();
    assert_eq!(config.relay_url, "ws://relay.example:9000/ws");
    assert_eq!(config.execution_url, "http://localhost:2000/api/v2/piston");
    assert_eq!(config.reconnect_attempts, 5);
}

#[test]
fn client_rejects_unparseable_attempts() {
    let err = ClientConfig::from_lookup(lookup_from(&[("COLLAB_RECONNECT_ATTEMPTS", "lots")])).unwrap_err();
    assert_eq!(err, ConfigError::Invalid { key: "COLLAB_RECONNECT_ATTEMPTS", value: "lots".into() });
}

#[test]
fn ai_requires_key_in_default_var() {
    let err = AiConfig::from_lookup(lookup_from(&[])).unwrap_err();
    assert_eq!(err, ConfigError::MissingApiKey { var: "GOOGLE_API_KEY".into() });
}

#[test]
fn ai_key_var_is_indirect() {
    let err = AiConfig::from_lookup(lookup_from(&[("AI_API_KEY_ENV", "MY_KEY"), ("GOOGLE_API_KEY", "unused")]))
        .unwrap_err();
    assert_eq!(err, ConfigError::MissingApiKey { var: "MY_KEY".into() });

    let config = AiConfig::from_lookup(lookup_from(&[("AI_API_KEY_ENV", "MY_KEY"), ("MY_KEY", "secret")])).unwrap();
    assert_eq!(config.api_key, "secret");
}

#[test]
fn ai_defaults_and_overrides() {
    let config = AiConfig::from_lookup(lookup_from(&[("GOOGLE_API_KEY", "k")])).unwrap();
    assert_eq!(config.model, DEFAULT_AI_MODEL);
    assert_eq!(config.base_url, DEFAULT_AI_BASE_URL);
    assert_eq!(config.timeouts, AiTimeouts { request_secs: 120, connect_secs: 10 });

    let config = AiConfig::from_lookup(lookup_from(&[
        ("GOOGLE_API_KEY", "k"),
        ("AI_MODEL", "gemini-2.0-flash"),
        ("AI_BASE_URL", "http://localhost:8080/v1/"),
        ("AI_REQUEST_TIMEOUT_SECS", "30"),
    ]))
    .unwrap();
    assert_eq!(config.model, "gemini-2.0-flash");
    assert_eq!(config.base_url, "http://localhost:8080/v1");
    assert_eq!(config.timeouts.request_secs, 30);
    assert_eq!(config.timeouts.connect_secs, 10);
}

#[test]
fn ai_rejects_unparseable_timeout() {
    let err = AiConfig::from_lookup(lookup_from(&[("GOOGLE_API_KEY", "k"), ("AI_CONNECT_TIMEOUT_SECS", "soon")]))
        .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { key: "AI_CONNECT_TIMEOUT_SECS", .. }));
}
