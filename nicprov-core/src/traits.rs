//! Collaborator traits at the hypervisor and guest seams.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{DomainHandle, GuestNetworkRequest, NetworkDescriptor};

/// Hypervisor operations needed to plumb interfaces into a domain.
///
/// Implementations own connection handling. Calls are blocking from the
/// provisioner's point of view: it awaits each one before issuing the next.
#[async_trait]
pub trait Hypervisor: Send + Sync {
    /// Name of the backend (e.g., "libvirt", "mock").
    fn name(&self) -> &str;

    /// Look up a domain by UUID.
    ///
    /// Fails with [`ProvisionError::NoDomain`](crate::ProvisionError::NoDomain)
    /// when the domain does not exist.
    async fn lookup_domain(&self, domain_id: &str) -> Result<DomainHandle>;

    /// List all networks known to the hypervisor, active and inactive,
    /// in the hypervisor's natural order.
    async fn list_networks(&self) -> Result<Vec<NetworkDescriptor>>;

    /// Attach a device described by `device_xml` to the domain.
    async fn attach_device(&self, domain: &DomainHandle, device_xml: &str) -> Result<()>;
}

/// The stage that boots the domain between attachment and guest configuration.
#[async_trait]
pub trait BootStage: Send + Sync {
    /// Boot the domain and return once it is up.
    async fn boot(&self, domain: &DomainHandle) -> Result<()>;
}

/// Guest-side capability that applies network configuration.
#[async_trait]
pub trait Guest: Send + Sync {
    /// Apply the full, ordered batch of interface configurations.
    async fn configure_networks(
        &self,
        domain: &DomainHandle,
        networks: &[GuestNetworkRequest],
    ) -> Result<()>;
}
