//! Rendering of the mobile apps' JSON documents into engine settings.

use vlan_mobile::config::{
    get_config_setting, render_config, render_config_with, test_config, InputVariant,
    SettingsTree, SynthesisError,
};
use vlan_mobile::pki::{parse_certificates_at, Product};

/// Full engine-shaped document as sent by the VLAN app. Only the top-level
/// mobile keys are read; the nested engine sections are ignored.
const VLAN_DOCUMENT: &str = r#"{
    "name": "Debug Test - unsafe",
    "id": "be9d6756-4099-4b25-a901-9d3b773e7d1a",
    "pki": {
        "ca": "-----BEGIN VLAN CERTIFICATE-----\nCj4KDEhpUGVyIFB1YmxpYyjGs6mXBjDG49GrBzog7+h8wZVKgdU4Fh4pwaLekH6D\nn+J8rTcgwNN7YaxcSFJAARJAIEzWZa79d+2RJ+17pay9oEehsV9coLgP72M0XZkw\nff6hHY99VsTLAiXvExd6eYyKRhcriqlr0O7BR+k6/qcqDQ==\n-----END VLAN CERTIFICATE-----\n",
        "cert": "-----BEGIN VLAN CERTIFICATE-----\nCmEKBHN3YXASCYGCnDiAgIDwDyjlgPyXBjDF49GrBzog0UtIu9+bcam6euyq4qJi\nO5PBr4pxuVc4PLWfTGhtVDdKIG7LJZr9vlShnmxQ1IMlsW0lREpZtd0bMFr3UVMv\nxoHlEkDdOgb49QHZKYfCI33ekvAvaM8VczepReCeQNg2vAmk9FXf8IpVKWTJBssA\ng42SwsBAaH1kpZlYZyqyEQxOTUUB\n-----END VLAN CERTIFICATE-----\n",
        "key": "-----BEGIN VLAN X25519 PRIVATE KEY-----\nCUvpfSbxU0EwVTT85NABo/VagsaXKiw2Uft1bF5M0hU=\n-----END VLAN X25519 PRIVATE KEY-----\n",
        "blocklist": [
            "c99d4e650533b92061b09918e838a5a0a6aaee21eed1d12fd937682865936c72"
        ],
        "disconnect_invalid": true,
        "expiry_check": {
            "enabled": true,
            "time_left": "72h",
            "log_interval": "60m"
        }
    },
    "points": {
        "6.6.6.6": [
            "120.92.140.174:35533"
        ],
        "7.7.7.7": [
            "121.62.22.148:35533"
        ],
        "7.7.1.1": [
            "ddns.xiaomckedou233.top:35533"
        ],
        "6.6.1.1": [
            "160.119.69.222:35533"
        ]
    },
    "tower": {
        "service": false,
        "dns": {
            "enable": true,
            "addr": "0.0.0.0",
            "port": 53,
            "interval": 10,
            "mirror": "1.1.1.1",
            "records": [
                {
                    "example.com": "192.168.1.113"
                }
            ]
        },
        "detection_point": {
            "10.0.10.123/24": [
                {
                    "mask": "192.168.1.123/24",
                    "port": 35533
                }
            ]
        },
        "remote_allow_list": {
            "172.16.0.0/12": false,
            "0.0.0.0/0": true,
            "10.0.0.0/8": false,
            "10.42.42.0/24": true
        },
        "remote_allow_ranges": {
            "10.42.42.0/24": {
                "192.168.0.0/16": true
            },
            "10.42.41.0/24": {
                "123.45.0.0/16": true
            }
        },
        "local_allow_list": {
            "interfaces": {
                "tun0": false,
                "docker.*": false,
                "10.0.0.0/8": true
            }
        },
        "advertise_addrs": [
            "1.1.1.1:35533",
            "1.2.3.4:0"
        ]
    },
    "listen": {
        "addr": [
            {
                ":": null
            }
        ],
        "port": 35533,
        "batch": 64,
        "read_buffer": 104857600,
        "write_buffer": 104857600,
        "send_recv_error": "always",
        "routines": 1
    },
    "punchy": {
        "enable": true,
        "frequency": "10s",
        "respond": true,
        "delay": "1s",
        "respond_delay": "5s",
        "preferred_ranges": [
            "172.16.0.0/24"
        ]
    },
    "cipher": "aes",
    "sshd": {
        "enabled": true,
        "port": 22222,
        "point_key": "/etc/vlan/ssh_point_rsa_key",
        "users": [
            {
                "name": "user1",
                "keys": [
                    "ssh-rsa xxxxx",
                    "ssh-ed25519 xxxx"
                ]
            },
            {
                "name": "user2",
                "keys": [
                    "ssh-rsa xxxxx",
                    "ssh-ed25519 xxxx"
                ]
            }
        ]
    },
    "proxy": {
        "socks5": [
            {
                "addr": "0.0.0.0",
                "port": 10800,
                "user": "username",
                "password": "password"
            }
        ],
        "forward": [
            {
                "proto": "tcp",
                "local": "0.0.0.0:3388",
                "remote": "192.168.1.105:3389"
            },
            {
                "proto": "udp",
                "local": "6.6.9.9:65534",
                "remote": "10.1.253.1:35533"
            }
        ]
    },
    "tun": {
        "enable": false,
        "dev": "vlan_network",
        "drop_local_broadcast": false,
        "drop_multicast": false,
        "tx_queue": 5000,
        "mtu": 1500,
        "routes": [
            {
                "mtu": 8800,
                "route": "10.0.0.0/16"
            }
        ],
        "route_table": [
            {
                "route": "172.16.1.0/24",
                "via": "6.6.6.99",
                "mtu": 1500,
                "metric": 100,
                "enable": true
            }
        ]
    },
    "logging": {
        "level": "info",
        "format": "text",
        "disable_timestamp": false,
        "file_path": "/var/log/vlan/vlan",
        "max_size": 20,
        "max_backups": 100,
        "max_age": 30,
        "timestamp_format": "2006-01-02T15:04:05.000Z07:00"
    },
    "stats": {
        "message_metrics": false,
        "tower_metrics": false
    },
    "handshakes": {
        "try_interval": "100ms",
        "retries": 10,
        "trigger_buffer": 64,
        "churn_limiting": true,
        "churn_num_failures": 1,
        "churn_period": "30s"
    },
    "timers": {
        "connection_alive_interval": 5,
        "pending_deletion_interval": 10
    },
    "psk": {
        "mode": "none",
        "keys": null
    },
    "firewall": {
        "outbound_action": "drop",
        "inbound_action": "drop",
        "conntrack": {
            "tcp_timeout": "12m",
            "udp_timeout": "3m",
            "default_timeout": "10m"
        },
        "outbound": [
            {
                "port": "any",
                "proto": "any",
                "point": "any"
            }
        ],
        "inbound": [
            {
                "port": "any",
                "proto": "any",
                "point": "any"
            },
            {
                "port": 443,
                "proto": "tcp",
                "groups": [
                    "laptop",
                    "home"
                ]
            }
        ]
    }
}"#;

/// Document as sent by the HiPer app.
const HIPER_DOCUMENT: &str = r#"{
  "name": "Debug Test - unsafe",
  "id": "be9d6756-4099-4b25-a901-9d3b773e7d1a",
  "point": {
    "6.6.6.6": {
      "tower": true,
      "destinations": [
        "120.92.140.174:65533"
      ]
    }
  },
  "unsafeRoutes": [
    {
      "route": "10.3.3.3/32",
      "via": "10.1.0.1",
      "mtu": null
    },
    {
      "route": "1.1.1.2/32",
      "via": "10.1.0.1",
      "mtu": null
    }
  ],
  "dns": [
    "6.6.6.6",
    "7.7.7.7"
  ],
  "ca": "-----BEGIN HIPER CERTIFICATE-----\nCj4KDEhpUGVyIFB1YmxpYyjGs6mXBjDG49GrBzog7+h8wZVKgdU4Fh4pwaLekH6D\nn+J8rTcgwNN7YaxcSFJAARJAIEzWZa79d+2RJ+17pay9oEehsV9coLgP72M0XZkw\nff6hHY99VsTLAiXvExd6eYyKRhcriqlr0O7BR+k6/qcqDQ==\n-----END HIPER CERTIFICATE-----\n",
  "cert": "-----BEGIN HIPER CERTIFICATE-----\nCmEKBGRlbW8SCYaMmDCAgIDwDyjn3aeaBjD3+aeaBjogsx61tqk5cAXrc1TExMlp\nCcObDPAVLU94jIhe+HzxV0NKIG7LJZr9vlShnmxQ1IMlsW0lREpZtd0bMFr3UVMv\nxoHlEkDeszjkqz37ZVkH7k3iRwsjdcSvg8bGoiQuvRLgSBizzb+pSmpoHiC7+88/\naJaOxAaYqQ0jTF/g/WhhVG+ctBIH\n-----END HIPER CERTIFICATE-----\n",
  "key": "-----BEGIN HIPER X25519 PRIVATE KEY-----\nersCnJjWfCBJl1M02Wtib/nSQccTqO+INnvOyKKsQwA=\n-----END HIPER X25519 PRIVATE KEY-----\n",
  "lhDuration": 7200,
  "port": 65533,
  "mtu": 1300,
  "cipher": "aes",
  "sortKey": 3,
  "logVerbosity": "info"
}"#;

fn jan_2025() -> time::OffsetDateTime {
    time::OffsetDateTime::from_unix_timestamp(1_735_689_600).unwrap()
}

#[test]
fn test_vlan_document_renders_and_validates() {
    let config = test_config(VLAN_DOCUMENT, "", InputVariant::Vlan).unwrap();

    assert_eq!(config.points.len(), 4);
    assert_eq!(config.points["6.6.6.6"], vec!["120.92.140.174:35533".to_string()]);
    assert_eq!(
        config.points["7.7.1.1"],
        vec!["ddns.xiaomckedou233.top:35533".to_string()]
    );
    assert_eq!(config.cipher, "aes");

    // Nested engine sections in the document are not mobile keys.
    assert_eq!(config.listen.port, 0);
    assert_eq!(config.tun.dev, "vlan");
    assert_eq!(config.tun.mtu, 1300);
    assert!(config.pki.ca.is_empty());
    assert!(config.pki.key.is_empty());
}

#[test]
fn test_vlan_markup_defaults() {
    let markup = render_config(VLAN_DOCUMENT, "").unwrap();

    assert_eq!(get_config_setting(&markup, "listen.addr").as_deref(), Some("0.0.0.0"));
    assert_eq!(get_config_setting(&markup, "listen.batch").as_deref(), Some("64"));
    assert_eq!(get_config_setting(&markup, "tun.tx_queue").as_deref(), Some("500"));
    assert_eq!(get_config_setting(&markup, "tun.drop_multicast").as_deref(), Some("true"));
    assert_eq!(get_config_setting(&markup, "logging.format").as_deref(), Some("text"));
    assert_eq!(
        get_config_setting(&markup, "handshakes.try_interval").as_deref(),
        Some("100ms")
    );
    assert_eq!(get_config_setting(&markup, "handshakes.retries").as_deref(), Some("20"));
    assert_eq!(
        get_config_setting(&markup, "firewall.conntrack.tcp_timeout").as_deref(),
        Some("120h")
    );
    assert_eq!(get_config_setting(&markup, "psk.mode").as_deref(), Some("none"));

    let tree = SettingsTree::from_markup(&markup).unwrap();
    let outbound = tree.get("firewall.outbound").and_then(|v| v.as_array()).unwrap();
    assert_eq!(outbound.len(), 1);
    assert_eq!(outbound[0].get("port").and_then(|v| v.as_str()), Some("any"));
    let inbound = tree.get("firewall.inbound").and_then(|v| v.as_array());
    assert!(inbound.map_or(true, |rules| rules.is_empty()));
}

#[test]
fn test_hiper_document() {
    let config = test_config(HIPER_DOCUMENT, "", InputVariant::Hiper).unwrap();

    assert_eq!(config.listen.port, 65533);
    assert_eq!(config.tower.interval, 7200);
    assert_eq!(config.tun.mtu, 1300);
    assert_eq!(config.tun.dev, "tun1");
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.points["6.6.6.6"], vec!["120.92.140.174:65533".to_string()]);

    assert_eq!(config.tun.route_table.len(), 2);
    assert_eq!(config.tun.route_table[0].route, "10.3.3.3/32");
    assert_eq!(config.tun.route_table[0].via, "10.1.0.1");
    assert_eq!(config.tun.route_table[0].mtu, None);

    // No separate key was supplied, so the document's own key is used.
    assert!(config
        .pki
        .key
        .starts_with("-----BEGIN HIPER X25519 PRIVATE KEY-----"));
}

#[test]
fn test_hiper_ca_survives_rendering() {
    let markup = render_config_with(HIPER_DOCUMENT, "", InputVariant::Hiper).unwrap();
    let ca = get_config_setting(&markup, "pki.ca").unwrap();

    let records = parse_certificates_at(&ca, jan_2025()).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].cert.product, Product::Hiper);
    assert!(records[0].validity.valid);
}

#[test]
fn test_supplied_key_wins_over_document_key() {
    let config = test_config(HIPER_DOCUMENT, "SUPPLIED", InputVariant::Hiper).unwrap();
    assert_eq!(config.pki.key, "SUPPLIED");
}

#[test]
fn test_route_table_requires_strings() {
    let err = render_config(r#"{"routeTable": [{"route": "10.0.0.0/8", "via": 7}]}"#, "")
        .unwrap_err();
    assert!(matches!(
        err,
        SynthesisError::FieldType { ref field, .. } if field == "routeTable[0].via"
    ));

    let markup = render_config(
        r#"{"routeTable": [{"route": "10.0.0.0/8", "via": "10.1.0.1"}]}"#,
        "",
    )
    .unwrap();
    let tree = SettingsTree::from_markup(&markup).unwrap();
    let table = tree.get("tun.route_table").and_then(|v| v.as_array()).unwrap();
    assert_eq!(table[0].get("via").and_then(|v| v.as_str()), Some("10.1.0.1"));
}
