//! Netplan v2 rendering of guest network requests.
//!
//! Interfaces are named `<prefix><slot>`, e.g. `eth1` for slot 1.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

use crate::error::{ProvisionError, Result};
use crate::traits::Guest;
use crate::types::{DomainHandle, GuestNetworkRequest};

/// Guest interface name prefix used when none is configured.
pub const DEFAULT_INTERFACE_PREFIX: &str = "eth";

#[derive(Debug, Serialize)]
struct NetplanDocument {
    network: NetplanNetwork,
}

#[derive(Debug, Serialize)]
struct NetplanNetwork {
    version: u8,
    ethernets: BTreeMap<String, NetplanEthernet>,
}

#[derive(Debug, Default, Serialize)]
struct NetplanEthernet {
    #[serde(skip_serializing_if = "Option::is_none")]
    dhcp4: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    addresses: Vec<String>,
}

/// Render `requests` as a Netplan v2 document.
pub fn render_netplan(interface_prefix: &str, requests: &[GuestNetworkRequest]) -> Result<String> {
    let mut ethernets = BTreeMap::new();

    for request in requests {
        let name = format!("{}{}", interface_prefix, request.interface());
        let ethernet = match request {
            GuestNetworkRequest::Static { ip, netmask, .. } => {
                let prefix = ipnetwork::ipv4_mask_to_prefix(*netmask).map_err(|e| {
                    ProvisionError::GuestConfigure(format!("netmask {}: {}", netmask, e))
                })?;
                NetplanEthernet {
                    addresses: vec![format!("{}/{}", ip, prefix)],
                    ..Default::default()
                }
            }
            GuestNetworkRequest::Dhcp { .. } => NetplanEthernet {
                dhcp4: Some(true),
                ..Default::default()
            },
        };
        ethernets.insert(name, ethernet);
    }

    let document = NetplanDocument {
        network: NetplanNetwork {
            version: 2,
            ethernets,
        },
    };

    serde_yaml::to_string(&document)
        .map_err(|e| ProvisionError::GuestConfigure(format!("Failed to render netplan: {}", e)))
}

/// Guest capability that writes the batch as a Netplan file.
pub struct NetplanGuest {
    path: PathBuf,
    interface_prefix: String,
}

impl NetplanGuest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            interface_prefix: DEFAULT_INTERFACE_PREFIX.to_string(),
        }
    }

    pub fn with_interface_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.interface_prefix = prefix.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Guest for NetplanGuest {
    #[instrument(skip(self, domain, networks), fields(domain_id = %domain.id, path = %self.path.display()))]
    async fn configure_networks(
        &self,
        domain: &DomainHandle,
        networks: &[GuestNetworkRequest],
    ) -> Result<()> {
        let rendered = render_netplan(&self.interface_prefix, networks)?;
        debug!(content = %rendered, "Rendered netplan");

        tokio::fs::write(&self.path, rendered).await.map_err(|e| {
            ProvisionError::GuestConfigure(format!(
                "Failed to write {}: {}",
                self.path.display(),
                e
            ))
        })?;

        info!(interfaces = networks.len(), "Netplan written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn requests() -> Vec<GuestNetworkRequest> {
        vec![
            GuestNetworkRequest::Static {
                interface: 1,
                ip: Ipv4Addr::new(10, 0, 0, 5),
                netmask: Ipv4Addr::new(255, 255, 255, 0),
            },
            GuestNetworkRequest::Dhcp { interface: 2 },
        ]
    }

    #[test]
    fn test_render() {
        let yaml = render_netplan("eth", &requests()).unwrap();
        let value: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(value["network"]["version"], serde_yaml::Value::from(2));
        assert_eq!(
            value["network"]["ethernets"]["eth1"]["addresses"][0],
            serde_yaml::Value::from("10.0.0.5/24")
        );
        assert_eq!(
            value["network"]["ethernets"]["eth2"]["dhcp4"],
            serde_yaml::Value::from(true)
        );
        assert!(value["network"]["ethernets"]["eth2"].get("addresses").is_none());
    }

    #[tokio::test]
    async fn test_guest_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("50-nicprov.yaml");
        let guest = NetplanGuest::new(&path).with_interface_prefix("ens");
        let domain = DomainHandle {
            id: "dom".to_string(),
            name: "dom".to_string(),
        };

        guest.configure_networks(&domain, &requests()).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("ens1:"));
        assert!(written.contains("10.0.0.5/24"));
        assert!(written.contains("ens2:"));
    }

    #[tokio::test]
    async fn test_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let guest = NetplanGuest::new(dir.path().join("missing").join("netplan.yaml"));
        let domain = DomainHandle {
            id: "dom".to_string(),
            name: "dom".to_string(),
        };

        let err = guest.configure_networks(&domain, &requests()).await.unwrap_err();
        assert!(matches!(err, ProvisionError::GuestConfigure(_)));
    }
}
