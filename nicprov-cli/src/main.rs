//! # nicprov
//!
//! Attaches the network interfaces declared in a machine description to a
//! hypervisor domain, boots it, and hands the guest its network
//! configuration.
//!
//! ## Usage
//! ```bash
//! nicprov --config machine.yaml --domain 4dea22b3-1d52-d8f3-2516-782e98ab3fa0
//! nicprov --config machine.yaml --dev
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{error, info};

use nicprov_core::{
    intents_from_declarations, BootStage, Hypervisor, InterfaceIntent, MockBackend,
    NetplanGuest, NetworkDescriptor, ProvisionReport, Provisioner,
};

mod cli;
mod config;

use cli::Args;
use config::{Config, HypervisorBackend};

const DEFAULT_CONFIG_PATH: &str = "/etc/nicprov/machine.yaml";

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    if args.json_logs {
        nicprov_common::init_logging_json(&args.log_level)?;
    } else {
        nicprov_common::init_logging(&args.log_level)?;
    }

    info!(version = env!("CARGO_PKG_VERSION"), "Starting nicprov");

    let config = match &args.config {
        Some(config_path) => match Config::load(config_path) {
            Ok(cfg) => {
                info!(config_path = %config_path, "Configuration loaded");
                cfg.with_cli_overrides(&args)
            }
            Err(e) => {
                error!(error = %e, path = %config_path, "Failed to load configuration");
                return Err(e);
            }
        },
        None => match Config::load(DEFAULT_CONFIG_PATH) {
            Ok(cfg) => {
                info!(config_path = %DEFAULT_CONFIG_PATH, "Configuration loaded from default location");
                cfg.with_cli_overrides(&args)
            }
            Err(_) => {
                info!("No config file found, using CLI arguments and defaults");
                Config::default().with_cli_overrides(&args)
            }
        },
    };

    let intents = intents_from_declarations(&config.networks)
        .context("Invalid network declarations")?;

    info!(
        backend = ?config.hypervisor.backend,
        interfaces = intents.len(),
        management_network = %config.management_network_name,
        "Provisioning configured"
    );

    let report = match config.hypervisor.backend {
        HypervisorBackend::Mock => {
            let backend = Arc::new(mock_backend(&config));
            let domain_id = match &config.domain_id {
                Some(id) => {
                    backend.define_domain_with_id(id, "nicprov-dev");
                    id.clone()
                }
                None => backend.define_domain("nicprov-dev"),
            };
            provision(backend, &domain_id, &config, &intents).await?
        }
        HypervisorBackend::Libvirt => {
            let Some(domain_id) = config.domain_id.clone() else {
                bail!("A domain UUID is required with the libvirt backend (--domain)");
            };
            let backend = libvirt_backend(&config.hypervisor.libvirt_uri).await?;
            provision(backend, &domain_id, &config, &intents).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn mock_backend(config: &Config) -> MockBackend {
    let backend = MockBackend::new();
    if config.mock.networks.is_empty() {
        backend.add_network(NetworkDescriptor::new(
            config.management_network_name.clone(),
            Some(Ipv4Addr::new(192, 168, 121, 0)),
        ));
    }
    for network in &config.mock.networks {
        backend.add_network(NetworkDescriptor::new(network.name.clone(), network.network_address));
    }
    backend
}

#[cfg(feature = "libvirt")]
async fn libvirt_backend(uri: &str) -> Result<Arc<nicprov_core::LibvirtBackend>> {
    let backend = nicprov_core::LibvirtBackend::new(uri)
        .await
        .with_context(|| format!("Failed to connect to {}", uri))?;
    Ok(Arc::new(backend))
}

#[cfg(not(feature = "libvirt"))]
async fn libvirt_backend(_uri: &str) -> Result<Arc<MockBackend>> {
    bail!("nicprov was built without libvirt support (enable the `libvirt` feature)")
}

async fn provision<B>(
    backend: Arc<B>,
    domain_id: &str,
    config: &Config,
    intents: &[InterfaceIntent],
) -> Result<ProvisionReport>
where
    B: Hypervisor + BootStage + 'static,
{
    let guest = NetplanGuest::new(&config.guest.netplan_path)
        .with_interface_prefix(config.guest.interface_prefix.clone());

    let mut provisioner = Provisioner::new(backend.clone(), config.management_network_name.clone());
    let result = provisioner
        .run(domain_id, intents, backend.as_ref(), &guest)
        .await;

    match result {
        Ok(report) => {
            info!(
                domain = %report.domain.name,
                slots = report.slots.len(),
                netplan = %guest.path().display(),
                "Provisioning complete"
            );
            Ok(report)
        }
        Err(e) => {
            let phase = provisioner
                .failed_at()
                .map(|p| p.to_string())
                .unwrap_or_else(|| provisioner.phase().to_string());
            Err(e).with_context(|| format!("Provisioning failed while {}", phase))
        }
    }
}
