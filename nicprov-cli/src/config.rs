//! Machine description loading.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::Ipv4Addr;
use std::path::Path;

use nicprov_core::NetworkDeclaration;

use crate::cli::Args;

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Network every unresolved interface falls back to
    pub management_network_name: String,
    /// UUID of the domain to provision
    pub domain_id: Option<String>,
    /// Hypervisor backend configuration
    pub hypervisor: HypervisorConfig,
    /// Guest configuration output
    pub guest: GuestConfig,
    /// Networks seeded into the mock backend
    pub mock: MockConfig,
    /// Declared networks, in order
    pub networks: Vec<NetworkDeclaration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            management_network_name: "vagrant-libvirt".to_string(),
            domain_id: None,
            hypervisor: HypervisorConfig::default(),
            guest: GuestConfig::default(),
            mock: MockConfig::default(),
            networks: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found: {}", path.display()));
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| "Failed to parse config file")?;

        Ok(config)
    }

    /// Apply CLI argument overrides to the configuration.
    pub fn with_cli_overrides(mut self, args: &Args) -> Self {
        if let Some(ref domain) = args.domain {
            self.domain_id = Some(domain.clone());
        }

        if args.dev {
            self.hypervisor.backend = HypervisorBackend::Mock;
        }

        if let Some(ref uri) = args.libvirt_uri {
            self.hypervisor.libvirt_uri = uri.clone();
        }

        if let Some(ref network) = args.management_network {
            self.management_network_name = network.clone();
        }

        if let Some(ref path) = args.netplan_out {
            self.guest.netplan_path = path.clone();
        }

        self
    }
}

/// Hypervisor backend configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HypervisorConfig {
    /// Backend type
    pub backend: HypervisorBackend,
    /// Libvirt connection URI
    pub libvirt_uri: String,
}

impl Default for HypervisorConfig {
    fn default() -> Self {
        Self {
            backend: HypervisorBackend::Mock,
            libvirt_uri: "qemu:///system".to_string(),
        }
    }
}

/// Hypervisor backend type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HypervisorBackend {
    /// Mock backend for testing/development
    #[default]
    Mock,
    /// Libvirt/QEMU backend
    Libvirt,
}

/// Guest configuration output.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GuestConfig {
    /// Netplan file the guest batch is rendered to
    pub netplan_path: String,
    /// Guest interface name prefix
    pub interface_prefix: String,
}

impl Default for GuestConfig {
    fn default() -> Self {
        Self {
            netplan_path: "50-nicprov.yaml".to_string(),
            interface_prefix: "eth".to_string(),
        }
    }
}

/// Networks the mock backend reports.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    pub networks: Vec<MockNetwork>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MockNetwork {
    pub name: String,
    pub network_address: Option<Ipv4Addr>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use nicprov_core::NetworkKind;
    use std::io::Write;

    #[test]
    fn test_load_machine_description() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
management_network_name: mgmt
domain_id: 4dea22b3-1d52-d8f3-2516-782e98ab3fa0
hypervisor:
  backend: libvirt
networks:
  - kind: private_network
    options:
      ip: 10.0.0.5
  - kind: public_network
    libvirt:
      dev: eth1
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.management_network_name, "mgmt");
        assert_eq!(config.hypervisor.backend, HypervisorBackend::Libvirt);
        assert_eq!(config.hypervisor.libvirt_uri, "qemu:///system");
        assert_eq!(config.networks.len(), 2);
        assert_eq!(config.networks[1].kind, NetworkKind::PublicNetwork);
        assert_eq!(config.guest.interface_prefix, "eth");
    }

    #[test]
    fn test_missing_file() {
        assert!(Config::load("/nonexistent/nicprov.yaml").is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let args = Args::parse_from([
            "nicprov",
            "--dev",
            "--domain",
            "abc",
            "--management-network",
            "other",
        ]);

        let mut config = Config::default();
        config.hypervisor.backend = HypervisorBackend::Libvirt;
        let config = config.with_cli_overrides(&args);

        assert_eq!(config.hypervisor.backend, HypervisorBackend::Mock);
        assert_eq!(config.domain_id.as_deref(), Some("abc"));
        assert_eq!(config.management_network_name, "other");
    }
}
