use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::dns::{Ds, Name};
use crate::dnssec::{TrustAnchor, TrustAnchorSet};
use crate::error::{ConfigError, ProveError};
use crate::transport::{DohTransport, QueryTransport, RetryingTransport, UdpTransport};

pub const DEFAULT_DOH_URL: &str = "https://dns.google/dns-query";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Doh,
    Udp,
}

impl FromStr for TransportKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "doh" | "https" => Ok(TransportKind::Doh),
            "udp" => Ok(TransportKind::Udp),
            other => Err(invalid("transport", format!("unknown transport '{}'", other))),
        }
    }
}

/// An additional trust anchor, as written in config files and
/// `DNSPROVE_EXTRA_ANCHORS`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AnchorConfig {
    #[serde(default = "root_zone")]
    pub zone: String,
    pub key_tag: u16,
    pub algorithm: u8,
    pub digest_type: u8,
    /// Hex digest; may be empty for private digest types
    #[serde(default)]
    pub digest: String,
}

fn root_zone() -> String {
    ".".to_string()
}

impl AnchorConfig {
    pub fn to_anchor(&self) -> Result<TrustAnchor, ConfigError> {
        let zone: Name = self
            .zone
            .parse()
            .map_err(|e| invalid("anchor zone", format!("{}: {}", self.zone, e)))?;
        // The chain always starts at the root key set
        if !zone.is_root() {
            return Err(invalid(
                "anchor zone",
                format!("{}: only root anchors are supported", self.zone),
            ));
        }
        let digest = hex::decode(&self.digest)
            .map_err(|e| invalid("anchor digest", format!("{}: {}", self.digest, e)))?;
        Ok(TrustAnchor::new(
            zone,
            Ds {
                key_tag: self.key_tag,
                algorithm: self.algorithm,
                digest_type: self.digest_type,
                digest,
            },
            format!("configured anchor {}", self.key_tag),
        ))
    }
}

impl FromStr for AnchorConfig {
    type Err = ConfigError;

    /// `zone:key_tag:algorithm:digest_type:hexdigest`, digest optional
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() < 4 || parts.len() > 5 {
            return Err(invalid("anchor", format!("expected zone:tag:alg:digest_type[:digest], got '{}'", s)));
        }
        let number = |field: &str, value: &str| {
            value
                .parse::<u16>()
                .map_err(|_| invalid(field, value.to_string()))
        };
        let byte = |field: &str, value: &str| {
            value
                .parse::<u8>()
                .map_err(|_| invalid(field, value.to_string()))
        };
        Ok(AnchorConfig {
            zone: parts[0].to_string(),
            key_tag: number("anchor key tag", parts[1])?,
            algorithm: byte("anchor algorithm", parts[2])?,
            digest_type: byte("anchor digest type", parts[3])?,
            digest: parts.get(4).unwrap_or(&"").to_string(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ProverConfig {
    /// Which transport carries queries
    pub transport: TransportKind,

    /// DNS-over-HTTPS endpoint
    pub doh_url: String,

    /// Recursive resolver for the UDP transport
    pub udp_server: SocketAddr,

    /// Timeout for a single query
    pub query_timeout: Duration,

    /// Extra attempts after a failed query (0 disables retrying)
    pub max_retries: u8,

    /// First retry delay; later ones double
    pub retry_base_delay: Duration,

    /// Trust the dummy anchor used by test deployments of the oracle
    pub include_dummy_anchor: bool,

    /// Anchors trusted in addition to the IANA root keys
    pub extra_anchors: Vec<AnchorConfig>,

    /// Oracle contract address, passed through to callers
    pub oracle_address: Option<String>,
}

impl Default for ProverConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::Doh,
            doh_url: DEFAULT_DOH_URL.to_string(),
            udp_server: SocketAddr::from(([8, 8, 8, 8], 53)),
            query_timeout: Duration::from_secs(5),
            max_retries: 2,
            retry_base_delay: Duration::from_millis(100),
            include_dummy_anchor: false,
            extra_anchors: Vec::new(),
            oracle_address: None,
        }
    }
}

/// On-disk form of [`ProverConfig`]. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    transport: Option<TransportKind>,
    doh_url: Option<String>,
    udp_server: Option<SocketAddr>,
    query_timeout_secs: Option<u64>,
    max_retries: Option<u8>,
    retry_base_delay_ms: Option<u64>,
    include_dummy_anchor: Option<bool>,
    anchors: Vec<AnchorConfig>,
    oracle_address: Option<String>,
}

impl ProverConfig {
    /// Create a ProverConfig from `DNSPROVE_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Same as [`ProverConfig::from_env`], reading variables through `var`.
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(transport) = var("DNSPROVE_TRANSPORT") {
            config.transport = transport.parse()?;
        }

        if let Some(doh_url) = var("DNSPROVE_DOH_URL") {
            config.doh_url = doh_url;
        }

        if let Some(server) = var("DNSPROVE_UDP_SERVER") {
            config.udp_server = server
                .parse()
                .map_err(|_| invalid("DNSPROVE_UDP_SERVER", server.clone()))?;
        }

        if let Some(timeout_str) = var("DNSPROVE_QUERY_TIMEOUT") {
            let secs = timeout_str
                .parse::<u64>()
                .map_err(|_| invalid("DNSPROVE_QUERY_TIMEOUT", timeout_str.clone()))?;
            config.query_timeout = Duration::from_secs(secs);
        }

        if let Some(retries) = var("DNSPROVE_MAX_RETRIES") {
            config.max_retries = retries
                .parse()
                .map_err(|_| invalid("DNSPROVE_MAX_RETRIES", retries.clone()))?;
        }

        if let Some(delay) = var("DNSPROVE_RETRY_BASE_DELAY_MS") {
            let millis = delay
                .parse::<u64>()
                .map_err(|_| invalid("DNSPROVE_RETRY_BASE_DELAY_MS", delay.clone()))?;
            config.retry_base_delay = Duration::from_millis(millis);
        }

        if let Some(dummy) = var("DNSPROVE_DUMMY_ANCHOR") {
            config.include_dummy_anchor = parse_bool(&dummy, config.include_dummy_anchor);
        }

        if let Some(anchors) = var("DNSPROVE_EXTRA_ANCHORS") {
            config.extra_anchors = anchors
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(str::parse)
                .collect::<Result<_, _>>()?;
        }

        if let Some(address) = var("DNSPROVE_ORACLE_ADDRESS") {
            config.oracle_address = Some(address);
        }

        config.validate()?;

        Ok(config)
    }

    /// Load a TOML config file. Absent keys keep their defaults.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(contents)?;
        let mut config = Self::default();

        if let Some(transport) = file.transport {
            config.transport = transport;
        }
        if let Some(doh_url) = file.doh_url {
            config.doh_url = doh_url;
        }
        if let Some(server) = file.udp_server {
            config.udp_server = server;
        }
        if let Some(secs) = file.query_timeout_secs {
            config.query_timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = file.max_retries {
            config.max_retries = retries;
        }
        if let Some(millis) = file.retry_base_delay_ms {
            config.retry_base_delay = Duration::from_millis(millis);
        }
        if let Some(dummy) = file.include_dummy_anchor {
            config.include_dummy_anchor = dummy;
        }
        config.extra_anchors = file.anchors;
        config.oracle_address = file.oracle_address;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query_timeout.is_zero() {
            return Err(invalid("query_timeout", "must be greater than 0".to_string()));
        }
        if self.query_timeout.as_secs() > 300 {
            return Err(invalid("query_timeout", "too large (max 300 seconds)".to_string()));
        }
        if self.max_retries > 10 {
            return Err(invalid("max_retries", "too large (max 10)".to_string()));
        }
        if self.transport == TransportKind::Doh
            && !(self.doh_url.starts_with("https://") || self.doh_url.starts_with("http://"))
        {
            return Err(invalid("doh_url", format!("not an HTTP(S) URL: {}", self.doh_url)));
        }
        for anchor in &self.extra_anchors {
            anchor.to_anchor()?;
        }
        Ok(())
    }

    /// IANA root anchors, then the dummy anchor if enabled, then any
    /// configured extras.
    pub fn trust_anchors(&self) -> Result<TrustAnchorSet, ConfigError> {
        let mut anchors = vec![TrustAnchor::root_ksk_2017(), TrustAnchor::root_ksk_2010()];
        if self.include_dummy_anchor {
            anchors.push(TrustAnchor::dummy());
        }
        for extra in &self.extra_anchors {
            anchors.push(extra.to_anchor()?);
        }
        Ok(TrustAnchorSet::new(anchors))
    }

    /// The configured transport, wrapped for retries when `max_retries > 0`.
    pub fn build_transport(&self) -> Result<Arc<dyn QueryTransport>, ProveError> {
        let transport: Arc<dyn QueryTransport> = match self.transport {
            TransportKind::Doh => Arc::new(DohTransport::new(self.doh_url.clone(), self.query_timeout)?),
            TransportKind::Udp => Arc::new(UdpTransport::new(self.udp_server, self.query_timeout)),
        };
        if self.max_retries == 0 {
            return Ok(transport);
        }
        Ok(Arc::new(RetryingTransport::new(
            transport,
            self.max_retries as usize,
            self.retry_base_delay,
        )))
    }
}

fn invalid(field: &str, reason: String) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason,
    }
}

/// Parse a boolean from a string, with a default value for invalid input
fn parse_bool(s: &str, default: bool) -> bool {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => default,
    }
}
