//! Type definitions for interface intents, resolved slots and guest requests.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Netmask used when a declaration carries an IP but no netmask.
pub const DEFAULT_NETMASK: Ipv4Addr = Ipv4Addr::new(255, 255, 255, 0);

/// Host device a public interface binds to when none is given.
pub const DEFAULT_PUBLIC_DEV: &str = "eth0";

/// Passthrough mode for public interfaces when none is given.
pub const DEFAULT_PUBLIC_MODE: &str = "bridge";

// =============================================================================
// INTENTS
// =============================================================================

/// How an interface connects to the outside world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    /// Member of a hypervisor-managed virtual network (NAT / isolated).
    #[default]
    Private,
    /// Passthrough onto a host network device.
    Public,
}

impl ConnectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionType::Private => "private",
            ConnectionType::Public => "public",
        }
    }
}

/// Network interface model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NicModel {
    #[default]
    Virtio,
    E1000,
    E1000e,
    Rtl8139,
}

impl NicModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NicModel::Virtio => "virtio",
            NicModel::E1000 => "e1000",
            NicModel::E1000e => "e1000e",
            NicModel::Rtl8139 => "rtl8139",
        }
    }
}

/// A user-declared desire for one interface.
///
/// Built once per declared network, in declaration order, and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceIntent {
    /// Explicit slot index (auto-assigned if None)
    pub slot: Option<u8>,
    /// Connection type
    pub connection: ConnectionType,
    /// Static IPv4 address for the guest side
    pub ip: Option<Ipv4Addr>,
    /// Netmask paired with `ip`
    pub netmask: Ipv4Addr,
    /// Explicit hypervisor network name
    pub network_name: Option<String>,
    /// MAC address, lowercase colon form (hypervisor assigns if None)
    pub mac: Option<String>,
    /// Host device for public interfaces
    pub dev: Option<String>,
    /// Passthrough mode for public interfaces
    pub mode: Option<String>,
    /// NIC model
    pub model: NicModel,
}

impl InterfaceIntent {
    /// Create an intent of the given connection type with default values.
    pub fn new(connection: ConnectionType) -> Self {
        Self {
            slot: None,
            connection,
            ip: None,
            netmask: DEFAULT_NETMASK,
            network_name: None,
            mac: None,
            dev: None,
            mode: None,
            model: NicModel::default(),
        }
    }

    /// Create a private-network intent.
    pub fn private() -> Self {
        Self::new(ConnectionType::Private)
    }

    /// Create a public (passthrough) intent.
    pub fn public() -> Self {
        Self::new(ConnectionType::Public)
    }

    /// Pin the intent to a slot.
    pub fn with_slot(mut self, slot: u8) -> Self {
        self.slot = Some(slot);
        self
    }

    /// Set the static IP address.
    pub fn with_ip(mut self, ip: Ipv4Addr) -> Self {
        self.ip = Some(ip);
        self
    }

    /// Set the netmask.
    pub fn with_netmask(mut self, netmask: Ipv4Addr) -> Self {
        self.netmask = netmask;
        self
    }

    /// Name the hypervisor network explicitly.
    pub fn with_network_name(mut self, name: impl Into<String>) -> Self {
        self.network_name = Some(name.into());
        self
    }

    /// Set the MAC address.
    pub fn with_mac(mut self, mac: impl Into<String>) -> Self {
        self.mac = Some(mac.into());
        self
    }

    /// Set the host device for a public interface.
    pub fn with_dev(mut self, dev: impl Into<String>) -> Self {
        self.dev = Some(dev.into());
        self
    }

    /// Set the passthrough mode for a public interface.
    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    /// Set the NIC model.
    pub fn with_model(mut self, model: NicModel) -> Self {
        self.model = model;
        self
    }
}

// =============================================================================
// RESOLVED STATE
// =============================================================================

/// An interface placed in a slot and joined to a network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotAssignment {
    /// Slot index
    pub slot: u8,
    /// The declaration this slot was built from
    pub intent: InterfaceIntent,
    /// Resolved hypervisor network name (never empty)
    pub network_name: String,
}

/// A network known to the hypervisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDescriptor {
    /// Network name
    pub name: String,
    /// Network address derived from the network's IP and netmask.
    /// None for networks without an IPv4 definition.
    pub network_address: Option<Ipv4Addr>,
    /// Whether the network is currently active
    pub active: bool,
}

impl NetworkDescriptor {
    /// Create an active network descriptor.
    pub fn new(name: impl Into<String>, network_address: Option<Ipv4Addr>) -> Self {
        Self {
            name: name.into(),
            network_address,
            active: true,
        }
    }
}

/// Reference to the target domain for the duration of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainHandle {
    /// Domain UUID
    pub id: String,
    /// Domain name
    pub name: String,
}

// =============================================================================
// GUEST REQUESTS
// =============================================================================

/// One entry of the post-boot guest network configuration batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GuestNetworkRequest {
    /// Static addressing
    Static {
        interface: u8,
        ip: Ipv4Addr,
        netmask: Ipv4Addr,
    },
    /// Dynamic addressing
    Dhcp {
        interface: u8,
    },
}

impl GuestNetworkRequest {
    /// The slot index this request configures.
    pub fn interface(&self) -> u8 {
        match self {
            GuestNetworkRequest::Static { interface, .. } => *interface,
            GuestNetworkRequest::Dhcp { interface } => *interface,
        }
    }
}
