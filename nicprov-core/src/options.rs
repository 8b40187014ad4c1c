//! Network declarations and the provider-scoped option merge.
//!
//! A declaration carries provider-neutral `options` and libvirt-specific
//! overrides. Any override field that is set replaces the base field; the
//! result is validated into an [`InterfaceIntent`].

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

use crate::error::{ProvisionError, Result};
use crate::slots::MAX_SLOT_INDEX;
use crate::types::{ConnectionType, InterfaceIntent, NicModel, DEFAULT_NETMASK};

/// Kind of a declared network entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkKind {
    PrivateNetwork,
    PublicNetwork,
    /// Host port forwarding; not an interface
    ForwardedPort,
}

impl NetworkKind {
    /// Connection type for interface-bearing kinds.
    pub fn connection(&self) -> Option<ConnectionType> {
        match self {
            NetworkKind::PrivateNetwork => Some(ConnectionType::Private),
            NetworkKind::PublicNetwork => Some(ConnectionType::Public),
            NetworkKind::ForwardedPort => None,
        }
    }
}

/// Raw, unvalidated options of one declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkOptions {
    /// Explicit slot index
    pub adapter: Option<u32>,
    pub ip: Option<String>,
    pub netmask: Option<String>,
    pub mac: Option<String>,
    pub network_name: Option<String>,
    /// Host device (public interfaces)
    pub dev: Option<String>,
    /// Passthrough mode (public interfaces)
    pub mode: Option<String>,
    pub model_type: Option<NicModel>,
}

impl NetworkOptions {
    /// Fields set in `overrides` win.
    pub fn overlay(&self, overrides: &NetworkOptions) -> NetworkOptions {
        NetworkOptions {
            adapter: overrides.adapter.or(self.adapter),
            ip: overrides.ip.clone().or_else(|| self.ip.clone()),
            netmask: overrides.netmask.clone().or_else(|| self.netmask.clone()),
            mac: overrides.mac.clone().or_else(|| self.mac.clone()),
            network_name: overrides.network_name.clone().or_else(|| self.network_name.clone()),
            dev: overrides.dev.clone().or_else(|| self.dev.clone()),
            mode: overrides.mode.clone().or_else(|| self.mode.clone()),
            model_type: overrides.model_type.or(self.model_type),
        }
    }
}

/// One network entry of a machine description, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDeclaration {
    pub kind: NetworkKind,
    #[serde(default)]
    pub options: NetworkOptions,
    /// Libvirt-scoped overrides
    #[serde(default)]
    pub libvirt: NetworkOptions,
}

fn parse_ipv4(field: &str, value: &str) -> Result<Ipv4Addr> {
    value.trim().parse::<Ipv4Addr>().map_err(|e| {
        ProvisionError::InvalidConfig(format!("{} '{}': {}", field, value, e))
    })
}

fn normalize_mac(value: &str) -> Result<String> {
    let mac: macaddr::MacAddr6 = value.trim().parse().map_err(|e| {
        ProvisionError::InvalidConfig(format!("mac '{}': {}", value, e))
    })?;
    Ok(mac.to_string().to_lowercase())
}

/// Merge base options with provider overrides into a validated intent.
pub fn merge_options(
    connection: ConnectionType,
    base: &NetworkOptions,
    overrides: &NetworkOptions,
) -> Result<InterfaceIntent> {
    let effective = base.overlay(overrides);

    let slot = match effective.adapter {
        Some(adapter) if adapter > MAX_SLOT_INDEX as u32 => {
            return Err(ProvisionError::SlotOutOfRange {
                slot: adapter,
                max: MAX_SLOT_INDEX,
            });
        }
        Some(adapter) => Some(adapter as u8),
        None => None,
    };

    let ip = effective.ip.as_deref().map(|v| parse_ipv4("ip", v)).transpose()?;

    let netmask = match effective.netmask.as_deref() {
        Some(v) => {
            let netmask = parse_ipv4("netmask", v)?;
            ipnetwork::ipv4_mask_to_prefix(netmask).map_err(|e| {
                ProvisionError::InvalidConfig(format!("netmask '{}': {}", v, e))
            })?;
            netmask
        }
        None => DEFAULT_NETMASK,
    };

    let mac = effective.mac.as_deref().map(normalize_mac).transpose()?;

    // A blank name falls through to address or management resolution
    let network_name = effective
        .network_name
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());

    Ok(InterfaceIntent {
        slot,
        connection,
        ip,
        netmask,
        network_name,
        mac,
        dev: effective.dev,
        mode: effective.mode,
        model: effective.model_type.unwrap_or_default(),
    })
}

/// Intents for every interface-bearing declaration, in declaration order.
/// Forwarded ports are skipped.
pub fn intents_from_declarations(declarations: &[NetworkDeclaration]) -> Result<Vec<InterfaceIntent>> {
    declarations
        .iter()
        .filter_map(|decl| {
            decl.kind
                .connection()
                .map(|connection| merge_options(connection, &decl.options, &decl.libvirt))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_wins() {
        let base = NetworkOptions {
            ip: Some("10.0.0.5".to_string()),
            network_name: Some("base-net".to_string()),
            ..Default::default()
        };
        let overrides = NetworkOptions {
            network_name: Some("libvirt-net".to_string()),
            model_type: Some(NicModel::E1000),
            ..Default::default()
        };

        let intent = merge_options(ConnectionType::Private, &base, &overrides).unwrap();
        assert_eq!(intent.network_name.as_deref(), Some("libvirt-net"));
        assert_eq!(intent.ip, Some(Ipv4Addr::new(10, 0, 0, 5)));
        assert_eq!(intent.model, NicModel::E1000);
        assert_eq!(intent.netmask, DEFAULT_NETMASK);
    }

    #[test]
    fn test_mac_normalized() {
        let base = NetworkOptions {
            mac: Some("52:54:00:AB:CD:EF".to_string()),
            ..Default::default()
        };
        let intent = merge_options(ConnectionType::Private, &base, &NetworkOptions::default()).unwrap();
        assert_eq!(intent.mac.as_deref(), Some("52:54:00:ab:cd:ef"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let bad_ip = NetworkOptions {
            ip: Some("10.0.0.300".to_string()),
            ..Default::default()
        };
        let err = merge_options(ConnectionType::Private, &bad_ip, &NetworkOptions::default()).unwrap_err();
        assert!(matches!(err, ProvisionError::InvalidConfig(msg) if msg.starts_with("ip")));

        let bad_mask = NetworkOptions {
            netmask: Some("255.0.255.0".to_string()),
            ..Default::default()
        };
        let err = merge_options(ConnectionType::Private, &bad_mask, &NetworkOptions::default()).unwrap_err();
        assert!(matches!(err, ProvisionError::InvalidConfig(msg) if msg.starts_with("netmask")));

        let bad_mac = NetworkOptions {
            mac: Some("not-a-mac".to_string()),
            ..Default::default()
        };
        let err = merge_options(ConnectionType::Private, &bad_mac, &NetworkOptions::default()).unwrap_err();
        assert!(matches!(err, ProvisionError::InvalidConfig(msg) if msg.starts_with("mac")));

        let bad_adapter = NetworkOptions {
            adapter: Some(9),
            ..Default::default()
        };
        let err = merge_options(ConnectionType::Private, &bad_adapter, &NetworkOptions::default()).unwrap_err();
        assert!(matches!(err, ProvisionError::SlotOutOfRange { slot: 9, max: 8 }));
    }

    #[test]
    fn test_blank_network_name_is_unset() {
        for blank in ["", "   "] {
            let base = NetworkOptions {
                network_name: Some(blank.to_string()),
                ..Default::default()
            };
            let intent = merge_options(ConnectionType::Private, &base, &NetworkOptions::default()).unwrap();
            assert_eq!(intent.network_name, None);
        }

        let padded = NetworkOptions {
            network_name: Some(" lab-net ".to_string()),
            ..Default::default()
        };
        let intent = merge_options(ConnectionType::Private, &padded, &NetworkOptions::default()).unwrap();
        assert_eq!(intent.network_name.as_deref(), Some("lab-net"));
    }

    #[test]
    fn test_declarations_from_yaml_skip_forwarded_ports() {
        let yaml = r#"
- kind: private_network
  options:
    adapter: 0
- kind: forwarded_port
  options:
    guest: 80
    host: 8080
- kind: private_network
  options:
    ip: 10.0.0.5
- kind: public_network
  options:
    dev: eth0
  libvirt:
    dev: eth1
"#;
        let declarations: Vec<NetworkDeclaration> = serde_yaml::from_str(yaml).unwrap();
        let intents = intents_from_declarations(&declarations).unwrap();

        assert_eq!(intents.len(), 3);
        assert_eq!(intents[0].slot, Some(0));
        assert_eq!(intents[1].ip, Some(Ipv4Addr::new(10, 0, 0, 5)));
        assert_eq!(intents[2].connection, ConnectionType::Public);
        assert_eq!(intents[2].dev.as_deref(), Some("eth1"));
    }
}
