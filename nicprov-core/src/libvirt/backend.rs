//! Libvirt backend implementation.

use async_trait::async_trait;
use tracing::{debug, info, instrument};
use virt::connect::Connect;
use virt::domain::Domain;
use virt::sys;

use crate::catalog::descriptor_from_xml;
use crate::error::{ProvisionError, Result};
use crate::traits::{BootStage, Hypervisor};
use crate::types::{DomainHandle, NetworkDescriptor};

/// Libvirt/QEMU hypervisor backend.
pub struct LibvirtBackend {
    uri: String,
    connection: Connect,
}

impl LibvirtBackend {
    /// Create a new libvirt backend connected to the specified URI.
    ///
    /// Common URIs:
    /// - `qemu:///system` - System-wide QEMU/KVM
    /// - `qemu:///session` - User session QEMU
    /// - `qemu+ssh://user@host/system` - Remote via SSH
    pub async fn new(uri: &str) -> Result<Self> {
        info!(uri = %uri, "Connecting to libvirt");

        let connection = Connect::open(Some(uri))
            .map_err(|e| ProvisionError::ConnectionFailed(e.to_string()))?;

        info!("Connected to libvirt");

        Ok(Self {
            uri: uri.to_string(),
            connection,
        })
    }

    /// Connection URI.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    fn get_domain(&self, domain_id: &str) -> Result<Domain> {
        Domain::lookup_by_uuid_string(&self.connection, domain_id)
            .map_err(|e| ProvisionError::NoDomain(format!("{}: {}", domain_id, e)))
    }
}

#[async_trait]
impl Hypervisor for LibvirtBackend {
    fn name(&self) -> &str {
        "libvirt"
    }

    #[instrument(skip(self), fields(domain_id = %domain_id))]
    async fn lookup_domain(&self, domain_id: &str) -> Result<DomainHandle> {
        let domain = self.get_domain(domain_id)?;

        let name = domain.get_name()
            .map_err(|e| ProvisionError::NoDomain(format!("{}: {}", domain_id, e)))?;

        Ok(DomainHandle {
            id: domain_id.to_string(),
            name,
        })
    }

    #[instrument(skip(self))]
    async fn list_networks(&self) -> Result<Vec<NetworkDescriptor>> {
        let flags = sys::VIR_CONNECT_LIST_NETWORKS_ACTIVE |
                    sys::VIR_CONNECT_LIST_NETWORKS_INACTIVE;

        let networks = self.connection.list_all_networks(flags)
            .map_err(|e| ProvisionError::CatalogQuery(e.to_string()))?;

        let mut catalog = Vec::with_capacity(networks.len());

        for network in networks {
            let name = network.get_name()
                .map_err(|e| ProvisionError::CatalogQuery(e.to_string()))?;

            let xml = network.get_xml_desc(0)
                .map_err(|e| ProvisionError::CatalogQuery(format!("{}: {}", name, e)))?;

            let active = network.is_active()
                .map_err(|e| ProvisionError::CatalogQuery(format!("{}: {}", name, e)))?;

            catalog.push(descriptor_from_xml(&name, &xml, active)?);
        }

        debug!(count = catalog.len(), "Listed networks");
        Ok(catalog)
    }

    #[instrument(skip(self, domain, device_xml), fields(domain_id = %domain.id))]
    async fn attach_device(&self, domain: &DomainHandle, device_xml: &str) -> Result<()> {
        let vm = self.get_domain(&domain.id)?;

        vm.attach_device(device_xml)
            .map_err(|e| ProvisionError::Internal(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl BootStage for LibvirtBackend {
    #[instrument(skip(self, domain), fields(domain_id = %domain.id))]
    async fn boot(&self, domain: &DomainHandle) -> Result<()> {
        info!("Starting domain");

        let vm = self.get_domain(&domain.id)?;

        vm.create()
            .map_err(|e| ProvisionError::BootFailed(e.to_string()))?;

        info!("Domain started");
        Ok(())
    }
}
