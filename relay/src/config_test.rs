use super::*;
use std::collections::HashMap;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn from_lookup_uses_defaults_when_unset() {
    let cfg = RelayConfig::from_lookup(lookup(&[])).unwrap();
    assert_eq!(cfg, RelayConfig::default());
    assert_eq!(cfg.bind_addr(), "0.0.0.0:3001");
}

#[test]
fn from_lookup_parses_overrides() {
    let cfg = RelayConfig::from_lookup(lookup(&[
        ("RELAY_HOST", "127.0.0.1"),
        ("PORT", "4100"),
        ("RELAY_CHANNEL_CAPACITY", " 32 "),
    ]))
    .unwrap();

    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.port, 4100);
    assert_eq!(cfg.channel_capacity, 32);
    assert_eq!(cfg.bind_addr(), "127.0.0.1:4100");
}

#[test]
fn from_lookup_rejects_bad_port() {
    let err = RelayConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
    assert_eq!(err, ConfigError::Invalid { key: "PORT", value: "eighty".into() });
}

#[test]
fn from_lookup_rejects_zero_capacity() {
    let err = RelayConfig::from_lookup(lookup(&[("RELAY_CHANNEL_CAPACITY", "0")])).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { key: "RELAY_CHANNEL_CAPACITY", .. }));
}

#[test]
fn blank_host_falls_back_to_default() {
    let cfg = RelayConfig::from_lookup(lookup(&[("RELAY_HOST", "  ")])).unwrap();
    assert_eq!(cfg.host, DEFAULT_HOST);
}
