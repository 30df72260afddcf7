//! Canonical configuration schema.
//!
//! This module defines the complete configuration tree consumed by the
//! overlay engine. Every struct derives Serde traits and carries
//! `#[serde(default)]`, so partial documents decode and synthesized
//! configs always have a concrete value for every field.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root of the engine configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CanonicalConfig {
    /// Symmetric cipher (`aes` or `chachapoly`).
    pub cipher: String,

    /// Remote sync settings, emitted only when configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<SyncConfig>,

    /// Identity material.
    pub pki: PkiConfig,

    /// Overlay address → reachable endpoints (`host:port`).
    pub points: BTreeMap<String, Vec<String>>,

    pub tower: TowerConfig,

    pub listen: ListenConfig,

    pub punchy: PunchyConfig,

    /// SSH debug console. Written as `sshd`, also read from `ssh`.
    #[serde(rename = "sshd", alias = "ssh")]
    pub ssh: SshConfig,

    pub proxy: ProxyConfig,

    pub tun: TunConfig,

    pub logging: LoggingConfig,

    pub stats: StatsConfig,

    pub handshakes: HandshakesConfig,

    pub timers: TimersConfig,

    pub psk: PskConfig,

    pub firewall: FirewallConfig,
}

impl Default for CanonicalConfig {
    fn default() -> Self {
        Self {
            cipher: "aes".to_string(),
            sync: None,
            pki: PkiConfig::default(),
            points: BTreeMap::new(),
            tower: TowerConfig::default(),
            listen: ListenConfig::default(),
            punchy: PunchyConfig::default(),
            ssh: SshConfig::default(),
            proxy: ProxyConfig::default(),
            tun: TunConfig::default(),
            logging: LoggingConfig::default(),
            stats: StatsConfig::default(),
            handshakes: HandshakesConfig::default(),
            timers: TimersConfig::default(),
            psk: PskConfig::default(),
            firewall: FirewallConfig::default(),
        }
    }
}

impl CanonicalConfig {
    /// Render as the engine's TOML text.
    pub fn to_markup(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }
}

/// Remote settings sync.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncConfig {
    pub enable: bool,
    pub persistent: bool,
    /// Duration between checks (e.g. `15m`).
    pub interval: String,
    /// Base58 identifier or http(s) URL of the full settings document.
    pub source: String,
    pub store: String,
    /// http(s) URL of an overlay merged into the live settings.
    pub addition: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PkiConfig {
    /// CA certificate(s), PEM.
    pub ca: String,
    /// Host certificate, PEM.
    pub cert: String,
    /// Host private key, PEM.
    pub key: String,
    /// Fingerprints of revoked certificates.
    pub blocklist: Vec<String>,
    pub disconnect_invalid: bool,
    pub expiry_check: ExpiryCheckConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExpiryCheckConfig {
    pub enabled: bool,
    pub time_left: String,
    pub log_interval: String,
}

/// Discovery ("tower") settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TowerConfig {
    /// Act as a tower for other points.
    pub service: bool,
    /// Seconds between tower updates; 0 uses the engine default.
    pub interval: u64,
    pub advertise_addrs: Vec<String>,
    pub dns: DnsConfig,
    pub remote_allow_list: BTreeMap<String, bool>,
    pub remote_allow_ranges: BTreeMap<String, BTreeMap<String, bool>>,
    pub local_allow_list: toml::Table,
    pub detection_point: toml::Table,
}

impl Default for TowerConfig {
    fn default() -> Self {
        Self {
            service: false,
            interval: 0,
            advertise_addrs: Vec::new(),
            dns: DnsConfig::default(),
            remote_allow_list: BTreeMap::new(),
            remote_allow_ranges: BTreeMap::new(),
            local_allow_list: toml::Table::new(),
            detection_point: toml::Table::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DnsConfig {
    pub enable: bool,
    pub addr: String,
    pub port: u16,
    /// Seconds between record refreshes.
    pub interval: u64,
    pub mirror: String,
    pub records: BTreeMap<String, String>,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            enable: false,
            addr: String::new(),
            port: 0,
            interval: 60,
            mirror: String::new(),
            records: BTreeMap::new(),
        }
    }
}

/// UDP listener.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenConfig {
    pub addr: String,
    /// 0 picks an ephemeral port.
    pub port: u16,
    pub batch: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_buffer: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_buffer: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_recv_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routines: Option<u32>,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0".to_string(),
            port: 0,
            batch: 64,
            read_buffer: None,
            write_buffer: None,
            send_recv_error: None,
            routines: None,
        }
    }
}

/// NAT hole punching.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PunchyConfig {
    pub enable: bool,
    pub respond: bool,
    pub delay: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub respond_delay: Option<String>,
    pub preferred_ranges: Vec<String>,
}

impl Default for PunchyConfig {
    fn default() -> Self {
        Self {
            enable: true,
            respond: false,
            delay: "1s".to_string(),
            frequency: None,
            respond_delay: None,
            preferred_ranges: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SshConfig {
    pub enabled: bool,
    pub port: u16,
    pub point_key: String,
    pub users: Vec<SshUser>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SshUser {
    pub name: String,
    pub keys: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub socks5: Vec<Socks5Config>,
    pub forward: Vec<ForwardConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Socks5Config {
    pub addr: String,
    pub port: u16,
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwardConfig {
    pub proto: String,
    pub local: String,
    pub remote: String,
}

/// Tunnel device.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TunConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable: Option<bool>,
    pub dev: String,
    pub drop_local_broadcast: bool,
    pub drop_multicast: bool,
    pub tx_queue: u32,
    pub mtu: u32,
    pub routes: Vec<TunRoute>,
    pub route_table: Vec<RouteTableEntry>,
}

impl Default for TunConfig {
    fn default() -> Self {
        Self {
            enable: None,
            dev: "vlan".to_string(),
            drop_local_broadcast: true,
            drop_multicast: true,
            tx_queue: 500,
            mtu: 1300,
            routes: Vec::new(),
            route_table: Vec::new(),
        }
    }
}

/// Route with its own MTU inside the overlay network.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TunRoute {
    pub route: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtu: Option<u32>,
}

/// Static route to a network outside the overlay, reached via a point.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RouteTableEntry {
    pub route: String,
    pub via: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtu: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `text` or `json`.
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_backups: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_age: Option<u32>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            file_path: None,
            max_size: None,
            max_backups: None,
            max_age: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StatsConfig {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listen: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    pub message_metrics: bool,
    pub tower_metrics: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HandshakesConfig {
    pub try_interval: String,
    pub retries: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_buffer: Option<u32>,
    pub churn_limiting: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub churn_num_failures: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub churn_period: Option<String>,
}

impl Default for HandshakesConfig {
    fn default() -> Self {
        Self {
            try_interval: "100ms".to_string(),
            retries: 20,
            trigger_buffer: None,
            churn_limiting: false,
            churn_num_failures: None,
            churn_period: None,
        }
    }
}

/// Tunnel housekeeping, in seconds. Unset values use the engine defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimersConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_alive_interval: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_deletion_interval: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PskConfig {
    pub mode: String,
    pub keys: Vec<String>,
}

impl Default for PskConfig {
    fn default() -> Self {
        Self {
            mode: "none".to_string(),
            keys: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FirewallConfig {
    pub outbound_action: String,
    pub inbound_action: String,
    pub conntrack: ConntrackConfig,
    pub outbound: Vec<FirewallRule>,
    pub inbound: Vec<FirewallRule>,
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self {
            outbound_action: "drop".to_string(),
            inbound_action: "drop".to_string(),
            conntrack: ConntrackConfig::default(),
            outbound: vec![FirewallRule::allow_any()],
            inbound: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConntrackConfig {
    pub tcp_timeout: String,
    pub udp_timeout: String,
    pub default_timeout: String,
}

impl Default for ConntrackConfig {
    fn default() -> Self {
        Self {
            tcp_timeout: "120h".to_string(),
            udp_timeout: "3m".to_string(),
            default_timeout: "10m".to_string(),
        }
    }
}

/// Port selector in a firewall rule: a number or a name such as `any`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PortSpec {
    Number(u16),
    Name(String),
}

impl Default for PortSpec {
    fn default() -> Self {
        PortSpec::Name("any".to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FirewallRule {
    pub port: PortSpec,
    pub proto: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub point: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
}

impl FirewallRule {
    /// Rule matching every port, protocol and point.
    pub fn allow_any() -> Self {
        Self {
            port: PortSpec::default(),
            proto: "any".to_string(),
            point: Some("any".to_string()),
            groups: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_documented_defaults() {
        let config = CanonicalConfig::default();
        assert_eq!(config.listen.addr, "0.0.0.0");
        assert_eq!(config.listen.batch, 64);
        assert_eq!(config.cipher, "aes");
        assert_eq!(config.tun.dev, "vlan");
        assert_eq!(config.tun.mtu, 1300);
        assert!(config.tun.drop_local_broadcast && config.tun.drop_multicast);
        assert_eq!(config.tun.tx_queue, 500);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "text");
        assert_eq!(config.handshakes.try_interval, "100ms");
        assert_eq!(config.handshakes.retries, 20);
        assert_eq!(config.firewall.conntrack.tcp_timeout, "120h");
        assert_eq!(config.firewall.conntrack.udp_timeout, "3m");
        assert_eq!(config.firewall.conntrack.default_timeout, "10m");
        assert_eq!(config.firewall.outbound, vec![FirewallRule::allow_any()]);
        assert!(config.firewall.inbound.is_empty());
        assert!(config.points.is_empty());
        assert!(config.pki.blocklist.is_empty());
    }

    #[test]
    fn test_markup_round_trip() {
        let mut config = CanonicalConfig::default();
        config
            .points
            .insert("6.6.6.6".to_string(), vec!["1.2.3.4:4242".to_string()]);
        config.firewall.inbound.push(FirewallRule {
            port: PortSpec::Number(443),
            proto: "tcp".to_string(),
            point: None,
            groups: vec!["laptop".to_string()],
        });

        let text = config.to_markup().unwrap();
        assert!(text.contains("[sshd]"));
        assert!(!text.contains("[sync]"));

        let decoded: CanonicalConfig = toml::from_str(&text).unwrap();
        assert_eq!(decoded, config);
    }

    #[test]
    fn test_ssh_alias_and_partial_document() {
        let decoded: CanonicalConfig = toml::from_str(
            r#"
            cipher = "chachapoly"

            [ssh]
            enabled = true
            port = 2222

            [listen]
            port = 4242
            "#,
        )
        .unwrap();

        assert_eq!(decoded.cipher, "chachapoly");
        assert!(decoded.ssh.enabled);
        assert_eq!(decoded.ssh.port, 2222);
        assert_eq!(decoded.listen.port, 4242);
        assert_eq!(decoded.listen.batch, 64);
        assert_eq!(decoded.tun.mtu, 1300);
    }

    #[test]
    fn test_port_spec_accepts_number_or_name() {
        let rule: FirewallRule = toml::from_str("port = 443\nproto = \"tcp\"").unwrap();
        assert_eq!(rule.port, PortSpec::Number(443));

        let rule: FirewallRule = toml::from_str("port = \"any\"\nproto = \"any\"").unwrap();
        assert_eq!(rule.port, PortSpec::Name("any".to_string()));
    }
}
