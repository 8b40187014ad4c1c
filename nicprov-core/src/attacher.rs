//! Device attachment for resolved interface slots.

use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use crate::error::{ProvisionError, Result};
use crate::traits::Hypervisor;
use crate::types::*;
use crate::xml::{InterfaceSource, InterfaceXmlBuilder};

/// Everything needed to attach one slot, built fresh per slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDevice {
    pub slot: u8,
    pub source: InterfaceSource,
    pub mac: Option<String>,
    pub model: NicModel,
}

impl InterfaceDevice {
    /// Derive the device from a resolved slot.
    ///
    /// Public interfaces pass through to a host device; every other
    /// interface joins the resolved network.
    pub fn from_assignment(assignment: &SlotAssignment) -> Self {
        let intent = &assignment.intent;
        let source = match intent.connection {
            ConnectionType::Public => InterfaceSource::Direct {
                dev: intent.dev.clone().unwrap_or_else(|| DEFAULT_PUBLIC_DEV.to_string()),
                mode: intent.mode.clone().unwrap_or_else(|| DEFAULT_PUBLIC_MODE.to_string()),
            },
            ConnectionType::Private => InterfaceSource::Network {
                name: assignment.network_name.clone(),
            },
        };

        Self {
            slot: assignment.slot,
            source,
            mac: intent.mac.clone(),
            model: intent.model,
        }
    }

    /// Render the libvirt device XML.
    pub fn to_xml(&self) -> String {
        InterfaceXmlBuilder::new(&self.source, self.model)
            .mac(self.mac.as_deref())
            .build()
    }
}

/// Attaches interface devices to a domain through the hypervisor.
pub struct DeviceAttacher {
    hypervisor: Arc<dyn Hypervisor>,
}

impl DeviceAttacher {
    pub fn new(hypervisor: Arc<dyn Hypervisor>) -> Self {
        Self { hypervisor }
    }

    /// Attach the device for one slot.
    ///
    /// Any hypervisor error becomes [`ProvisionError::AttachDevice`] with the
    /// original message.
    #[instrument(skip(self, assignment), fields(domain_id = %domain.id, slot = assignment.slot))]
    pub async fn attach(&self, domain: &DomainHandle, assignment: &SlotAssignment) -> Result<()> {
        let device = InterfaceDevice::from_assignment(assignment);
        let xml = device.to_xml();
        debug!(xml = %xml, "Generated interface XML");

        self.hypervisor
            .attach_device(domain, &xml)
            .await
            .map_err(|e| {
                error!(error = %e, "Interface attachment rejected");
                ProvisionError::AttachDevice {
                    slot: assignment.slot,
                    message: e.to_string(),
                }
            })?;

        match &device.source {
            InterfaceSource::Network { name } => {
                info!(network = %name, "Interface attached")
            }
            InterfaceSource::Direct { dev, mode } => {
                info!(dev = %dev, mode = %mode, "Public interface attached")
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBackend;

    fn assignment(slot: u8, intent: InterfaceIntent, network: &str) -> SlotAssignment {
        SlotAssignment {
            slot,
            intent,
            network_name: network.to_string(),
        }
    }

    #[test]
    fn test_public_device_defaults() {
        let device = InterfaceDevice::from_assignment(&assignment(2, InterfaceIntent::public(), "mgmt"));
        assert_eq!(
            device.source,
            InterfaceSource::Direct {
                dev: "eth0".to_string(),
                mode: "bridge".to_string(),
            }
        );
    }

    #[test]
    fn test_public_device_ignores_resolved_network() {
        let intent = InterfaceIntent::public().with_dev("eth1").with_mode("vepa");
        let xml = InterfaceDevice::from_assignment(&assignment(1, intent, "mgmt")).to_xml();
        assert!(xml.contains("<source dev='eth1' mode='vepa'/>"));
        assert!(!xml.contains("mgmt"));
    }

    #[test]
    fn test_private_device_uses_resolved_network() {
        let intent = InterfaceIntent::private().with_mac("52:54:00:aa:bb:cc");
        let device = InterfaceDevice::from_assignment(&assignment(0, intent, "vagrant-libvirt"));
        let xml = device.to_xml();
        assert!(xml.contains("<source network='vagrant-libvirt'/>"));
        assert!(xml.contains("<mac address='52:54:00:aa:bb:cc'/>"));
    }

    #[tokio::test]
    async fn test_attach_records_device() {
        let backend = Arc::new(MockBackend::new());
        let domain_id = backend.define_domain("attach-test");
        let domain = backend.lookup_domain(&domain_id).await.unwrap();

        let attacher = DeviceAttacher::new(backend.clone());
        attacher
            .attach(&domain, &assignment(0, InterfaceIntent::private(), "mgmt"))
            .await
            .unwrap();

        let devices = backend.attached_devices(&domain_id).unwrap();
        assert_eq!(devices.len(), 1);
        assert!(devices[0].contains("<source network='mgmt'/>"));
    }

    #[tokio::test]
    async fn test_attach_failure_carries_message() {
        let backend = Arc::new(MockBackend::new());
        let domain_id = backend.define_domain("attach-fail");
        let domain = backend.lookup_domain(&domain_id).await.unwrap();
        backend.fail_attach_after(0);

        let attacher = DeviceAttacher::new(backend.clone());
        let err = attacher
            .attach(&domain, &assignment(4, InterfaceIntent::private(), "mgmt"))
            .await
            .unwrap_err();

        match err {
            ProvisionError::AttachDevice { slot, message } => {
                assert_eq!(slot, 4);
                assert!(message.contains("injected"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
