mod common;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use common::*;
use dnsprove::config::{ProverConfig, TransportKind};
use dnsprove::dns::enums::DNSResourceType;
use dnsprove::dnssec::ChainResolver;
use dnsprove::error::ConfigError;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_config_file() {
    let file = write_config(
        r#"
transport = "udp"
udp_server = "127.0.0.1:5353"
query_timeout_secs = 2
max_retries = 0
include_dummy_anchor = true

[[anchors]]
zone = "."
key_tag = 4242
algorithm = 13
digest_type = 2
digest = "00112233"
"#,
    );

    let config = ProverConfig::from_toml_file(file.path()).unwrap();
    assert_eq!(config.transport, TransportKind::Udp);
    assert_eq!(config.udp_server.port(), 5353);
    assert_eq!(config.query_timeout, Duration::from_secs(2));
    assert_eq!(config.max_retries, 0);

    let anchors = config.trust_anchors().unwrap();
    assert_eq!(anchors.len(), 4);
    let extra = anchors.iter().last().unwrap();
    assert!(extra.zone.is_root());
    assert_eq!(extra.ds.key_tag, 4242);
    assert_eq!(extra.ds.digest, vec![0x00, 0x11, 0x22, 0x33]);
}

#[test]
fn test_unknown_key_rejected() {
    let file = write_config("dns_server = \"8.8.8.8\"\n");
    assert!(matches!(
        ProverConfig::from_toml_file(file.path()),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn test_non_root_anchor_rejected() {
    let file = write_config(
        r#"
[[anchors]]
zone = "xyz"
key_tag = 1278
algorithm = 253
digest_type = 253
"#,
    );
    assert!(matches!(
        ProverConfig::from_toml_file(file.path()),
        Err(ConfigError::InvalidValue { field, .. }) if field == "anchor zone"
    ));
}

#[test]
fn test_missing_file_is_io_error() {
    assert!(matches!(
        ProverConfig::from_toml_file("/nonexistent/dnsprove.toml"),
        Err(ConfigError::Io(_))
    ));
}

#[test]
fn test_zero_timeout_rejected() {
    let file = write_config("query_timeout_secs = 0\n");
    assert!(matches!(
        ProverConfig::from_toml_file(file.path()),
        Err(ConfigError::InvalidValue { .. })
    ));
}

#[tokio::test]
async fn test_configured_anchors_drive_resolution() {
    let file = write_config("include_dummy_anchor = true\n");
    let config = ProverConfig::from_toml_file(file.path()).unwrap();

    let stub = Arc::new(matoken_chain());
    let result = ChainResolver::new(stub, config.trust_anchors().unwrap())
        .resolve(DNSResourceType::TXT, &name("_ens.matoken.xyz"))
        .await
        .unwrap();
    assert_eq!(result.proofs.len(), 6);
}

#[tokio::test]
async fn test_udp_config_end_to_end() {
    let stub = Arc::new(matoken_chain());
    let (addr, server) = serve_udp(stub.clone()).await;

    let file = write_config(&format!(
        "transport = \"udp\"\nudp_server = \"{}\"\nmax_retries = 1\ninclude_dummy_anchor = true\n",
        addr
    ));
    let config = ProverConfig::from_toml_file(file.path()).unwrap();
    let resolver = ChainResolver::new(
        config.build_transport().unwrap(),
        config.trust_anchors().unwrap(),
    );

    let result = resolver
        .resolve(DNSResourceType::TXT, &name("_ens.matoken.xyz"))
        .await
        .unwrap();
    assert!(result.found);
    assert_eq!(result.proofs.len(), 6);
    assert_eq!(stub.query_count(), 6);

    server.abort();
}
