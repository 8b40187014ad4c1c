//! Network resolution: maps an interface to the hypervisor network it joins.

use ipnetwork::{ipv4_mask_to_prefix, Ipv4Network};
use std::net::Ipv4Addr;
use tracing::debug;

use crate::error::{ProvisionError, Result};
use crate::types::{InterfaceIntent, NetworkDescriptor};

/// Network address of `ip` under `netmask`.
///
/// Fails for non-contiguous masks.
pub fn network_address(ip: Ipv4Addr, netmask: Ipv4Addr) -> Result<Ipv4Addr> {
    let prefix = ipv4_mask_to_prefix(netmask)
        .map_err(|e| ProvisionError::InvalidConfig(format!("netmask {}: {}", netmask, e)))?;
    network_address_with_prefix(ip, prefix)
}

/// Network address of `ip` under a prefix length.
pub fn network_address_with_prefix(ip: Ipv4Addr, prefix: u8) -> Result<Ipv4Addr> {
    let network = Ipv4Network::new(ip, prefix)
        .map_err(|e| ProvisionError::InvalidConfig(format!("{}/{}: {}", ip, prefix, e)))?;
    Ok(network.network())
}

/// Picks the network an interface joins.
///
/// First match wins:
/// 1. the explicit network name, used verbatim;
/// 2. the first catalog network whose network address equals the one
///    computed from the interface IP and netmask;
/// 3. the management network.
#[derive(Debug, Clone)]
pub struct NetworkResolver {
    management_network: String,
}

impl NetworkResolver {
    /// Create a resolver falling back to `management_network`.
    pub fn new(management_network: impl Into<String>) -> Self {
        Self {
            management_network: management_network.into(),
        }
    }

    /// The fallback network name.
    pub fn management_network(&self) -> &str {
        &self.management_network
    }

    /// Resolve the network name for one interface.
    pub fn resolve(&self, intent: &InterfaceIntent, catalog: &[NetworkDescriptor]) -> Result<String> {
        if let Some(name) = intent.network_name.as_deref().filter(|n| !n.trim().is_empty()) {
            return Ok(name.to_string());
        }

        if let Some(ip) = intent.ip {
            let wanted = network_address(ip, intent.netmask)?;
            // Duplicates are not reported: catalog order decides.
            if let Some(network) = catalog
                .iter()
                .find(|n| n.network_address == Some(wanted))
            {
                debug!(
                    ip = %ip,
                    network_address = %wanted,
                    network = %network.name,
                    "Matched network by address"
                );
                return Ok(network.name.clone());
            }
            debug!(ip = %ip, network_address = %wanted, "No network matches address");
        }

        Ok(self.management_network.clone())
    }
}
