//! Libvirt interface device XML generation.

use quick_xml::escape::escape;

use crate::types::NicModel;

/// What an interface is bound to on the host side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceSource {
    /// Member of a hypervisor virtual network
    Network { name: String },
    /// Passthrough onto a host device (macvtap)
    Direct { dev: String, mode: String },
}

/// Builder for a single `<interface>` device element.
pub struct InterfaceXmlBuilder<'a> {
    source: &'a InterfaceSource,
    mac: Option<&'a str>,
    model: NicModel,
}

impl<'a> InterfaceXmlBuilder<'a> {
    pub fn new(source: &'a InterfaceSource, model: NicModel) -> Self {
        Self {
            source,
            mac: None,
            model,
        }
    }

    pub fn mac(mut self, mac: Option<&'a str>) -> Self {
        self.mac = mac;
        self
    }

    /// Build the device XML string.
    pub fn build(&self) -> String {
        let (interface_type, source) = match self.source {
            InterfaceSource::Network { name } => (
                "network",
                format!("  <source network='{}'/>\n", escape(name.as_str())),
            ),
            InterfaceSource::Direct { dev, mode } => (
                "direct",
                format!(
                    "  <source dev='{}' mode='{}'/>\n",
                    escape(dev.as_str()),
                    escape(mode.as_str())
                ),
            ),
        };

        let mac = self
            .mac
            .map(|m| format!("  <mac address='{}'/>\n", escape(m)))
            .unwrap_or_default();

        format!(
            "<interface type='{}'>\n{}{}  <model type='{}'/>\n</interface>\n",
            interface_type,
            source,
            mac,
            self.model.as_str()
        )
    }
}
