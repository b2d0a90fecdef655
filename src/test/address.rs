use std::net::Ipv4Addr;

use crate::net::{AddressError, AddressHelper, DataRate, DeviceId, Network, NodeRole};
use crate::sim::SimTime;

#[test]
fn address_helper_assigns_hosts_in_call_order() {
    let mut net = Network::default();
    let a = net.add_host("a", NodeRole::Client);
    let b = net.add_host("b", NodeRole::Server);
    let (da, db) = net.connect_p2p(a, b, DataRate::from_mbps(1), SimTime::ZERO, 10);

    let mut helper = AddressHelper::new(Ipv4Addr::new(10, 1, 1, 0), 24).expect("helper");
    let ifs = helper.assign(&mut net, &[db, da]).expect("assign");

    assert_eq!(ifs[0].addr, Ipv4Addr::new(10, 1, 1, 1));
    assert_eq!(ifs[0].node, b);
    assert_eq!(ifs[1].addr, Ipv4Addr::new(10, 1, 1, 2));
    assert_eq!(ifs[1].network(), Ipv4Addr::new(10, 1, 1, 0));
    assert_eq!(net.node_by_addr(Ipv4Addr::new(10, 1, 1, 2)), Some(a));
    assert_eq!(net.interfaces().len(), 2);
}

#[test]
fn address_helper_rejects_bad_subnets() {
    assert_eq!(
        AddressHelper::new(Ipv4Addr::new(10, 0, 0, 0), 31).err(),
        Some(AddressError::InvalidPrefix(31))
    );
    assert!(matches!(
        AddressHelper::new(Ipv4Addr::new(10, 0, 0, 5), 24),
        Err(AddressError::NotNetworkAddress { .. })
    ));
}

#[test]
fn address_helper_reports_exhausted_subnet() {
    // /30 只有两个主机地址
    let mut helper = AddressHelper::new(Ipv4Addr::new(192, 168, 0, 0), 30).expect("helper");
    assert_eq!(helper.next_address(), Ok(Ipv4Addr::new(192, 168, 0, 1)));
    assert_eq!(helper.next_address(), Ok(Ipv4Addr::new(192, 168, 0, 2)));
    assert!(matches!(
        helper.next_address(),
        Err(AddressError::SubnetExhausted { prefix_len: 30, .. })
    ));
}

#[test]
fn assigning_twice_or_to_missing_device_fails() {
    let mut net = Network::default();
    let a = net.add_host("a", NodeRole::Client);
    let b = net.add_host("b", NodeRole::Server);
    let (da, _) = net.connect_p2p(a, b, DataRate::from_mbps(1), SimTime::ZERO, 10);

    net.assign_address(da, Ipv4Addr::new(10, 0, 0, 1), 24)
        .expect("first assignment");
    assert!(matches!(
        net.assign_address(da, Ipv4Addr::new(10, 0, 0, 9), 24),
        Err(AddressError::AlreadyAssigned { .. })
    ));
    assert_eq!(
        net.assign_address(DeviceId(42), Ipv4Addr::new(10, 0, 0, 2), 24),
        Err(AddressError::UnknownDevice(DeviceId(42)))
    );
}
