//! Two-phase provisioning of a domain's network interfaces.
//!
//! ```text
//! Pending → ResolvingDomain → AllocatingSlots → ResolvingNetworks
//!         → AttachingDevices → AwaitingBoot ─(boot stage)─→ ConfiguringGuest → Done
//!
//! any step ──error──→ Failed (no rollback of attached devices)
//! ```
//!
//! [`Provisioner::prepare_and_attach`] runs everything up to `AwaitingBoot`.
//! The caller boots the domain, then calls
//! [`Provisioner::configure_after_boot`]. [`Provisioner::run`] does both
//! around a [`BootStage`].

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::allocator::SlotAllocator;
use crate::attacher::DeviceAttacher;
use crate::configurator::PostBootConfigurator;
use crate::error::{ProvisionError, Result};
use crate::resolver::NetworkResolver;
use crate::slots::SlotTable;
use crate::traits::{BootStage, Guest, Hypervisor};
use crate::types::*;

/// Provisioning phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionPhase {
    Pending,
    ResolvingDomain,
    AllocatingSlots,
    ResolvingNetworks,
    AttachingDevices,
    AwaitingBoot,
    ConfiguringGuest,
    Done,
    Failed,
}

impl ProvisionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisionPhase::Pending => "pending",
            ProvisionPhase::ResolvingDomain => "resolving_domain",
            ProvisionPhase::AllocatingSlots => "allocating_slots",
            ProvisionPhase::ResolvingNetworks => "resolving_networks",
            ProvisionPhase::AttachingDevices => "attaching_devices",
            ProvisionPhase::AwaitingBoot => "awaiting_boot",
            ProvisionPhase::ConfiguringGuest => "configuring_guest",
            ProvisionPhase::Done => "done",
            ProvisionPhase::Failed => "failed",
        }
    }
}

impl fmt::Display for ProvisionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A domain with every interface attached, waiting to be booted.
#[derive(Debug, Clone, Serialize)]
pub struct PreparedDomain {
    pub domain: DomainHandle,
    pub slots: SlotTable<SlotAssignment>,
}

/// Result of a complete run.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionReport {
    pub domain: DomainHandle,
    pub slots: SlotTable<SlotAssignment>,
    pub guest_requests: Vec<GuestNetworkRequest>,
}

/// Sequences allocation, resolution, attachment and guest configuration
/// for one domain. One provisioner serves a single run.
pub struct Provisioner {
    hypervisor: Arc<dyn Hypervisor>,
    allocator: SlotAllocator,
    resolver: NetworkResolver,
    attacher: DeviceAttacher,
    configurator: PostBootConfigurator,
    phase: ProvisionPhase,
    failed_at: Option<ProvisionPhase>,
}

impl Provisioner {
    /// Create a provisioner that falls back to `management_network` for
    /// interfaces that resolve to nothing more specific.
    pub fn new(hypervisor: Arc<dyn Hypervisor>, management_network: impl Into<String>) -> Self {
        Self {
            attacher: DeviceAttacher::new(hypervisor.clone()),
            hypervisor,
            allocator: SlotAllocator::new(),
            resolver: NetworkResolver::new(management_network),
            configurator: PostBootConfigurator::new(),
            phase: ProvisionPhase::Pending,
            failed_at: None,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> ProvisionPhase {
        self.phase
    }

    /// Phase in which the run failed, if it did.
    pub fn failed_at(&self) -> Option<ProvisionPhase> {
        self.failed_at
    }

    fn enter(&mut self, phase: ProvisionPhase) {
        info!(from = %self.phase, to = %phase, "Provisioning phase");
        self.phase = phase;
    }

    fn expect_phase(&self, expected: ProvisionPhase, operation: &str) -> Result<()> {
        if self.phase != expected {
            return Err(ProvisionError::InvalidState(format!(
                "{} requires phase {}, current phase is {}",
                operation, expected, self.phase
            )));
        }
        Ok(())
    }

    /// Record a failure in the current phase and pass results through.
    fn check<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            error!(phase = %self.phase, error = %e, "Provisioning failed");
            self.failed_at = Some(self.phase);
            self.phase = ProvisionPhase::Failed;
        }
        result
    }

    /// Resolve the domain, allocate and resolve every slot, and attach one
    /// device per slot in ascending slot order.
    #[instrument(skip(self, intents), fields(domain_id = %domain_id, interfaces = intents.len()))]
    pub async fn prepare_and_attach(
        &mut self,
        domain_id: &str,
        intents: &[InterfaceIntent],
    ) -> Result<PreparedDomain> {
        self.expect_phase(ProvisionPhase::Pending, "prepare_and_attach")?;

        self.enter(ProvisionPhase::ResolvingDomain);
        let domain = self.hypervisor.lookup_domain(domain_id).await;
        let domain = self.check(domain)?;
        info!(name = %domain.name, backend = self.hypervisor.name(), "Domain resolved");

        self.enter(ProvisionPhase::AllocatingSlots);
        let allocated = self.allocator.allocate(intents);
        let allocated = self.check(allocated)?;

        self.enter(ProvisionPhase::ResolvingNetworks);
        let catalog = self.hypervisor.list_networks().await;
        let catalog = self.check(catalog)?;
        let resolver = &self.resolver;
        let slots = allocated.try_map(|slot, intent| {
            let network_name = resolver.resolve(intent, &catalog)?;
            info!(slot, network = %network_name, "Resolved interface network");
            Ok(SlotAssignment {
                slot,
                intent: intent.clone(),
                network_name,
            })
        });
        let slots = self.check(slots)?;

        self.enter(ProvisionPhase::AttachingDevices);
        for (_, assignment) in slots.iter() {
            let attached = self.attacher.attach(&domain, assignment).await;
            self.check(attached)?;
        }

        self.enter(ProvisionPhase::AwaitingBoot);
        Ok(PreparedDomain { domain, slots })
    }

    /// Send the guest network configuration batch once the domain is up.
    #[instrument(skip(self, prepared, guest), fields(domain_id = %prepared.domain.id))]
    pub async fn configure_after_boot(
        &mut self,
        prepared: &PreparedDomain,
        guest: &dyn Guest,
    ) -> Result<Vec<GuestNetworkRequest>> {
        self.expect_phase(ProvisionPhase::AwaitingBoot, "configure_after_boot")?;

        self.enter(ProvisionPhase::ConfiguringGuest);
        let requests = self
            .configurator
            .configure(guest, &prepared.domain, &prepared.slots)
            .await;
        let requests = self.check(requests)?;

        self.enter(ProvisionPhase::Done);
        Ok(requests)
    }

    /// Run both phases with `boot` in between.
    pub async fn run(
        &mut self,
        domain_id: &str,
        intents: &[InterfaceIntent],
        boot: &dyn BootStage,
        guest: &dyn Guest,
    ) -> Result<ProvisionReport> {
        let prepared = self.prepare_and_attach(domain_id, intents).await?;

        let booted = boot.boot(&prepared.domain).await;
        self.check(booted)?;

        let guest_requests = self.configure_after_boot(&prepared, guest).await?;

        Ok(ProvisionReport {
            domain: prepared.domain,
            slots: prepared.slots,
            guest_requests,
        })
    }
}
