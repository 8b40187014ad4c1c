//! Error types for interface provisioning.

use thiserror::Error;

/// Errors that can occur while provisioning a domain's network interfaces.
///
/// Every variant keeps the originating message. Nothing in this crate retries.
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// Failed to connect to the hypervisor.
    #[error("Failed to connect to hypervisor: {0}")]
    ConnectionFailed(String),

    /// The target domain could not be looked up.
    #[error("No domain found: {0}")]
    NoDomain(String),

    /// Two interfaces asked for the same slot.
    #[error("Interface slot {slot} is already in use")]
    InterfaceSlotConflict { slot: u8 },

    /// Every slot is taken and an interface still needs one.
    #[error("No free interface slot left (maximum {max} interfaces)")]
    InterfaceSlotExhausted { max: usize },

    /// Allocation finished without an interface in the management slot.
    #[error("No interface in management slot {slot}")]
    MissingManagementSlot { slot: u8 },

    /// An explicit slot index outside the platform range.
    #[error("Interface slot {slot} is out of range (0..={max})")]
    SlotOutOfRange { slot: u32, max: u8 },

    /// A network declaration carries an unusable value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The hypervisor network listing failed.
    #[error("Failed to list networks: {0}")]
    CatalogQuery(String),

    /// The hypervisor rejected an interface device.
    #[error("Failed to attach interface in slot {slot}: {message}")]
    AttachDevice { slot: u8, message: String },

    /// The boot stage did not complete.
    #[error("Failed to boot domain: {0}")]
    BootFailed(String),

    /// The guest rejected or failed the network configuration batch.
    #[error("Failed to configure guest networks: {0}")]
    GuestConfigure(String),

    /// An operation was invoked in the wrong provisioning phase.
    #[error("Invalid provisioning state: {0}")]
    InvalidState(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for provisioning operations.
pub type Result<T> = std::result::Result<T, ProvisionError>;
