//! Network catalog entries derived from libvirt network XML.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::net::Ipv4Addr;

use crate::error::{ProvisionError, Result};
use crate::resolver::{network_address, network_address_with_prefix};
use crate::types::NetworkDescriptor;

fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| ProvisionError::CatalogQuery(format!("Bad network XML: {}", e)))?;
        if attr.key.as_ref() == name {
            let value = attr
                .unescape_value()
                .map_err(|e| ProvisionError::CatalogQuery(format!("Bad network XML: {}", e)))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Network address of an `<ip>` element, if it describes an IPv4 subnet.
fn ipv4_network(network: &str, element: &BytesStart<'_>) -> Result<Option<Ipv4Addr>> {
    let Some(address) = attribute(element, b"address")? else {
        return Ok(None);
    };
    let Ok(address) = address.parse::<Ipv4Addr>() else {
        // IPv6 definition
        return Ok(None);
    };
    let bad_ip = |detail: String| {
        ProvisionError::CatalogQuery(format!("Bad <ip> in network {}: {}", network, detail))
    };

    if let Some(netmask) = attribute(element, b"netmask")? {
        let parsed = netmask
            .parse::<Ipv4Addr>()
            .map_err(|e| bad_ip(format!("netmask '{}': {}", netmask, e)))?;
        return network_address(address, parsed)
            .map(Some)
            .map_err(|e| bad_ip(e.to_string()));
    }

    if let Some(prefix) = attribute(element, b"prefix")? {
        let parsed = prefix
            .parse::<u8>()
            .map_err(|e| bad_ip(format!("prefix '{}': {}", prefix, e)))?;
        return network_address_with_prefix(address, parsed)
            .map(Some)
            .map_err(|e| bad_ip(e.to_string()));
    }

    Ok(None)
}

/// Build a catalog entry from a network's XML description.
///
/// The first top-level `<ip>` element with an IPv4 address defines the
/// network address. Networks without one never match address resolution.
pub fn descriptor_from_xml(name: &str, xml: &str, active: bool) -> Result<NetworkDescriptor> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut depth = 0usize;
    let mut network_address = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if depth == 1 && e.name().as_ref() == b"ip" && network_address.is_none() {
                    network_address = ipv4_network(name, &e)?;
                }
                depth += 1;
            }
            Ok(Event::Empty(e)) => {
                if depth == 1 && e.name().as_ref() == b"ip" && network_address.is_none() {
                    network_address = ipv4_network(name, &e)?;
                }
            }
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ProvisionError::CatalogQuery(format!(
                    "Bad XML for network {}: {}",
                    name, e
                )))
            }
        }
    }

    Ok(NetworkDescriptor {
        name: name.to_string(),
        network_address,
        active,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAT_NETWORK: &str = r#"
<network>
  <name>vagrant-libvirt</name>
  <forward mode='nat'/>
  <bridge name='virbr1' stp='on' delay='0'/>
  <ip address='192.168.121.1' netmask='255.255.255.0'>
    <dhcp>
      <range start='192.168.121.2' end='192.168.121.254'/>
    </dhcp>
  </ip>
</network>
"#;

    #[test]
    fn test_netmask_network() {
        let desc = descriptor_from_xml("vagrant-libvirt", NAT_NETWORK, true).unwrap();
        assert_eq!(desc.network_address, Some(Ipv4Addr::new(192, 168, 121, 0)));
        assert!(desc.active);
    }

    #[test]
    fn test_prefix_network_after_ipv6() {
        let xml = r#"
<network>
  <name>dual</name>
  <ip family='ipv6' address='fd00::1' prefix='64'/>
  <ip address='10.20.30.1' prefix='16'/>
</network>
"#;
        let desc = descriptor_from_xml("dual", xml, false).unwrap();
        assert_eq!(desc.network_address, Some(Ipv4Addr::new(10, 20, 0, 0)));
        assert!(!desc.active);
    }

    #[test]
    fn test_bridge_without_ip() {
        let xml = r#"
<network>
  <name>host-bridge</name>
  <forward mode='bridge'/>
  <bridge name='br0'/>
</network>
"#;
        let desc = descriptor_from_xml("host-bridge", xml, true).unwrap();
        assert_eq!(desc.network_address, None);
    }

    #[test]
    fn test_nested_ip_attributes_ignored() {
        let xml = r#"
<network>
  <name>dns-only</name>
  <dns>
    <host ip='192.168.5.7'><hostname>x</hostname></host>
  </dns>
</network>
"#;
        let desc = descriptor_from_xml("dns-only", xml, true).unwrap();
        assert_eq!(desc.network_address, None);
    }

    #[test]
    fn test_bad_ip_definition_is_a_catalog_error() {
        let cases = [
            "<network><ip address='10.0.0.1' netmask='255.0.255.0'/></network>",
            "<network><ip address='10.0.0.1' netmask='garbage'/></network>",
            "<network><ip address='10.0.0.1' prefix='40'/></network>",
        ];
        for xml in cases {
            let err = descriptor_from_xml("broken", xml, true).unwrap_err();
            assert!(
                matches!(&err, ProvisionError::CatalogQuery(msg) if msg.contains("network broken")),
                "unexpected error: {:?}",
                err
            );
        }
    }
}
