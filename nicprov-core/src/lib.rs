//! # nicprov Core
//!
//! Provisioning-time network interface plumbing for hypervisor domains.
//!
//! ## Architecture
//!
//! ```text
//! InterfaceIntent[] ──► SlotAllocator ──► NetworkResolver ──► DeviceAttacher
//!                                                                  │
//!                                             (boot stage runs here)
//!                                                                  ▼
//!                                                     PostBootConfigurator ──► Guest
//! ```
//!
//! [`Provisioner`] sequences the components in two phases:
//! `prepare_and_attach` before boot and `configure_after_boot` after it.
//! Slot 0 is the provisioning path: attached like any other slot, never
//! reconfigured in the guest.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use nicprov_core::{InterfaceIntent, MockBackend, Provisioner, RecordingGuest};
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = Arc::new(MockBackend::new());
//!     let domain_id = backend.define_domain("web-1");
//!     let guest = RecordingGuest::new();
//!
//!     let intents = vec![
//!         InterfaceIntent::private(),
//!         InterfaceIntent::private().with_ip("10.0.0.5".parse().unwrap()),
//!     ];
//!
//!     let mut provisioner = Provisioner::new(backend.clone(), "vagrant-libvirt");
//!     provisioner.run(&domain_id, &intents, backend.as_ref(), &guest).await.unwrap();
//! }
//! ```

pub mod allocator;
pub mod attacher;
pub mod catalog;
pub mod configurator;
pub mod error;
#[cfg(feature = "libvirt")]
pub mod libvirt;
pub mod mock;
pub mod netplan;
pub mod options;
pub mod orchestrator;
pub mod resolver;
pub mod slots;
pub mod traits;
pub mod types;
mod xml;

pub use allocator::SlotAllocator;
pub use attacher::{DeviceAttacher, InterfaceDevice};
pub use configurator::PostBootConfigurator;
pub use error::{ProvisionError, Result};
pub use mock::{MockBackend, RecordingGuest};
pub use netplan::{render_netplan, NetplanGuest};
pub use options::{intents_from_declarations, merge_options, NetworkDeclaration, NetworkKind, NetworkOptions};
pub use orchestrator::{PreparedDomain, ProvisionPhase, ProvisionReport, Provisioner};
pub use resolver::NetworkResolver;
pub use slots::{SlotTable, MANAGEMENT_SLOT, MAX_SLOTS};
pub use traits::{BootStage, Guest, Hypervisor};
pub use types::*;
pub use xml::InterfaceSource;

// Re-export libvirt backend when available
#[cfg(feature = "libvirt")]
pub use libvirt::LibvirtBackend;
