//! Guest network configuration after boot.

use tracing::{info, instrument};

use crate::error::Result;
use crate::slots::{SlotTable, MANAGEMENT_SLOT};
use crate::traits::Guest;
use crate::types::{DomainHandle, GuestNetworkRequest, SlotAssignment};

/// Builds and dispatches the guest network configuration batch.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostBootConfigurator;

impl PostBootConfigurator {
    pub fn new() -> Self {
        Self
    }

    /// One request per non-management slot, in ascending slot order.
    /// Slots with an IP get static addressing, the rest DHCP.
    pub fn requests(&self, table: &SlotTable<SlotAssignment>) -> Vec<GuestNetworkRequest> {
        table
            .iter()
            .filter(|(slot, _)| *slot != MANAGEMENT_SLOT)
            .map(|(slot, assignment)| match assignment.intent.ip {
                Some(ip) => GuestNetworkRequest::Static {
                    interface: slot,
                    ip,
                    netmask: assignment.intent.netmask,
                },
                None => GuestNetworkRequest::Dhcp { interface: slot },
            })
            .collect()
    }

    /// Hand the whole batch to the guest in a single call.
    #[instrument(skip(self, guest, table), fields(domain_id = %domain.id))]
    pub async fn configure(
        &self,
        guest: &dyn Guest,
        domain: &DomainHandle,
        table: &SlotTable<SlotAssignment>,
    ) -> Result<Vec<GuestNetworkRequest>> {
        let requests = self.requests(table);
        info!(count = requests.len(), "Configuring guest networks");

        guest.configure_networks(domain, &requests).await?;
        Ok(requests)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::RecordingGuest;
    use crate::types::{InterfaceIntent, DEFAULT_NETMASK};
    use std::net::Ipv4Addr;

    fn table(entries: Vec<(u8, InterfaceIntent)>) -> SlotTable<SlotAssignment> {
        let mut table = SlotTable::new();
        for (slot, intent) in entries {
            table
                .occupy(slot, SlotAssignment {
                    slot,
                    intent,
                    network_name: "net".to_string(),
                })
                .unwrap();
        }
        table
    }

    #[test]
    fn test_skips_management_slot_and_orders_by_slot() {
        let table = table(vec![
            (3, InterfaceIntent::private()),
            (0, InterfaceIntent::private().with_ip(Ipv4Addr::new(192, 168, 121, 10))),
            (1, InterfaceIntent::private().with_ip(Ipv4Addr::new(10, 0, 0, 5))),
        ]);

        let requests = PostBootConfigurator::new().requests(&table);
        assert_eq!(
            requests,
            vec![
                GuestNetworkRequest::Static {
                    interface: 1,
                    ip: Ipv4Addr::new(10, 0, 0, 5),
                    netmask: DEFAULT_NETMASK,
                },
                GuestNetworkRequest::Dhcp { interface: 3 },
            ]
        );
    }

    #[test]
    fn test_static_request_keeps_custom_netmask() {
        let table = table(vec![(
            2,
            InterfaceIntent::private()
                .with_ip(Ipv4Addr::new(172, 16, 4, 2))
                .with_netmask(Ipv4Addr::new(255, 255, 0, 0)),
        )]);

        let requests = PostBootConfigurator::new().requests(&table);
        assert_eq!(
            requests,
            vec![GuestNetworkRequest::Static {
                interface: 2,
                ip: Ipv4Addr::new(172, 16, 4, 2),
                netmask: Ipv4Addr::new(255, 255, 0, 0),
            }]
        );
    }

    #[tokio::test]
    async fn test_configure_dispatches_single_batch() {
        let guest = RecordingGuest::new();
        let domain = DomainHandle {
            id: "dom-1".to_string(),
            name: "dom".to_string(),
        };
        let table = table(vec![
            (0, InterfaceIntent::private()),
            (1, InterfaceIntent::private()),
            (2, InterfaceIntent::public()),
        ]);

        let sent = PostBootConfigurator::new()
            .configure(&guest, &domain, &table)
            .await
            .unwrap();

        let batches = guest.batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0], sent);
        assert_eq!(sent.len(), 2);
    }

    #[tokio::test]
    async fn test_management_only_sends_empty_batch() {
        let guest = RecordingGuest::new();
        let domain = DomainHandle {
            id: "dom-2".to_string(),
            name: "dom".to_string(),
        };
        let table = table(vec![(0, InterfaceIntent::private())]);

        PostBootConfigurator::new()
            .configure(&guest, &domain, &table)
            .await
            .unwrap();

        assert_eq!(guest.batches(), vec![Vec::<GuestNetworkRequest>::new()]);
    }
}
