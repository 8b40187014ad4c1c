//! Mock hypervisor and guest for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument};

use crate::error::{ProvisionError, Result};
use crate::traits::{BootStage, Guest, Hypervisor};
use crate::types::*;

/// Mock hypervisor backend.
///
/// Keeps domains and networks in memory. Useful for:
/// - Unit and integration testing
/// - Development without libvirt installed
pub struct MockBackend {
    domains: RwLock<HashMap<String, MockDomain>>,
    networks: RwLock<Vec<NetworkDescriptor>>,
    /// Successful attachments left before the next one fails
    attach_budget: Mutex<Option<usize>>,
    fail_boot: AtomicBool,
}

struct MockDomain {
    name: String,
    devices: Vec<String>,
    running: bool,
}

impl MockBackend {
    /// Create a new mock backend.
    pub fn new() -> Self {
        info!("Creating mock hypervisor backend");
        Self {
            domains: RwLock::new(HashMap::new()),
            networks: RwLock::new(Vec::new()),
            attach_budget: Mutex::new(None),
            fail_boot: AtomicBool::new(false),
        }
    }

    /// Define a stopped domain and return its UUID.
    pub fn define_domain(&self, name: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.define_domain_with_id(&id, name);
        id
    }

    /// Define a stopped domain under a known UUID.
    pub fn define_domain_with_id(&self, id: &str, name: &str) {
        let mut domains = self.domains.write().unwrap_or_else(|e| e.into_inner());
        domains.insert(id.to_string(), MockDomain {
            name: name.to_string(),
            devices: Vec::new(),
            running: false,
        });
        debug!(domain_id = %id, name = %name, "Mock domain defined");
    }

    /// Append a network to the catalog.
    pub fn add_network(&self, network: NetworkDescriptor) {
        let mut networks = self.networks.write().unwrap_or_else(|e| e.into_inner());
        networks.push(network);
    }

    /// Let `successes` attachments through, then reject the next one.
    pub fn fail_attach_after(&self, successes: usize) {
        *self.attach_budget.lock().unwrap_or_else(|e| e.into_inner()) = Some(successes);
    }

    /// Make the next boot fail.
    pub fn fail_boot(&self) {
        self.fail_boot.store(true, Ordering::SeqCst);
    }

    /// Device XML attached to a domain, in attachment order.
    pub fn attached_devices(&self, domain_id: &str) -> Option<Vec<String>> {
        let domains = self.domains.read().ok()?;
        domains.get(domain_id).map(|d| d.devices.clone())
    }

    /// Whether a domain has been booted.
    pub fn is_running(&self, domain_id: &str) -> Option<bool> {
        let domains = self.domains.read().ok()?;
        domains.get(domain_id).map(|d| d.running)
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Hypervisor for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn lookup_domain(&self, domain_id: &str) -> Result<DomainHandle> {
        let domains = self.domains.read().map_err(|_| {
            ProvisionError::Internal("Lock poisoned".to_string())
        })?;

        let domain = domains.get(domain_id)
            .ok_or_else(|| ProvisionError::NoDomain(domain_id.to_string()))?;

        Ok(DomainHandle {
            id: domain_id.to_string(),
            name: domain.name.clone(),
        })
    }

    async fn list_networks(&self) -> Result<Vec<NetworkDescriptor>> {
        let networks = self.networks.read().map_err(|_| {
            ProvisionError::Internal("Lock poisoned".to_string())
        })?;

        debug!(count = networks.len(), "Listed networks");
        Ok(networks.clone())
    }

    #[instrument(skip(self, domain, device_xml), fields(domain_id = %domain.id))]
    async fn attach_device(&self, domain: &DomainHandle, device_xml: &str) -> Result<()> {
        {
            let mut budget = self.attach_budget.lock().map_err(|_| {
                ProvisionError::Internal("Lock poisoned".to_string())
            })?;
            if let Some(left) = *budget {
                if left == 0 {
                    *budget = None;
                    return Err(ProvisionError::Internal(
                        "injected attach failure".to_string()
                    ));
                }
                *budget = Some(left - 1);
            }
        }

        let mut domains = self.domains.write().map_err(|_| {
            ProvisionError::Internal("Lock poisoned".to_string())
        })?;

        let vm = domains.get_mut(&domain.id)
            .ok_or_else(|| ProvisionError::NoDomain(domain.id.clone()))?;

        vm.devices.push(device_xml.to_string());

        info!(devices = vm.devices.len(), "Mock device attached");
        Ok(())
    }
}

#[async_trait]
impl BootStage for MockBackend {
    #[instrument(skip(self, domain), fields(domain_id = %domain.id))]
    async fn boot(&self, domain: &DomainHandle) -> Result<()> {
        if self.fail_boot.swap(false, Ordering::SeqCst) {
            return Err(ProvisionError::BootFailed("injected boot failure".to_string()));
        }

        let mut domains = self.domains.write().map_err(|_| {
            ProvisionError::Internal("Lock poisoned".to_string())
        })?;

        let vm = domains.get_mut(&domain.id)
            .ok_or_else(|| ProvisionError::NoDomain(domain.id.clone()))?;

        if vm.running {
            return Err(ProvisionError::BootFailed("Domain is already running".to_string()));
        }
        vm.running = true;

        info!("Mock domain booted");
        Ok(())
    }
}

/// Guest that records every configuration batch it receives.
#[derive(Default)]
pub struct RecordingGuest {
    batches: Mutex<Vec<Vec<GuestNetworkRequest>>>,
    fail: AtomicBool,
}

impl RecordingGuest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next configuration call fail.
    pub fn fail_next(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Batches received so far.
    pub fn batches(&self) -> Vec<Vec<GuestNetworkRequest>> {
        self.batches.lock().map(|b| b.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Guest for RecordingGuest {
    async fn configure_networks(
        &self,
        domain: &DomainHandle,
        networks: &[GuestNetworkRequest],
    ) -> Result<()> {
        if self.fail.swap(false, Ordering::SeqCst) {
            return Err(ProvisionError::GuestConfigure("injected guest failure".to_string()));
        }

        info!(domain_id = %domain.id, count = networks.len(), "Recording guest network batch");
        self.batches
            .lock()
            .map_err(|_| ProvisionError::Internal("Lock poisoned".to_string()))?
            .push(networks.to_vec());
        Ok(())
    }
}
