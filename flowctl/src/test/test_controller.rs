// flowctl: Packet-In Decision Core for OpenFlow Controllers
// Copyright (C) 2021  Tibor Schneider
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! Test the controller, from the packet-in up to the installed rules.

use crate::config::ControllerConfig;
use crate::controller::rule::Action::*;
use crate::controller::*;
use crate::datapath::RecordingDatapath;
use crate::test::packet_in;
use crate::wire;
use lazy_static::lazy_static;
use std::net::Ipv4Addr;
use std::time::{Duration, Instant};

lazy_static! {
    static ref A: MacAddr = "aa:aa:aa:aa:aa:aa".parse().unwrap();
    static ref B: MacAddr = "be:be:be:be:be:be".parse().unwrap();
    static ref C: MacAddr = "cc:cc:cc:cc:cc:cc".parse().unwrap();
    static ref TAP: MacAddr = "00:00:00:00:00:09".parse().unwrap();
}

const S: SwitchId = SwitchId(1);

fn get_test_setup(role: Role, num_ports: u16) -> (Controller, RecordingDatapath) {
    let _ = pretty_env_logger::try_init();
    let mut dp = RecordingDatapath::new();
    dp.add_switch(S, num_ports);
    let mut c = Controller::new(ControllerConfig::new(role));
    c.add_switch(&dp, S).unwrap();
    (c, dp)
}

#[test]
fn test_scenario_two_port_flat() {
    let (mut c, mut dp) = get_test_setup(Role::Flat, 2);
    assert!(c.mac_table().is_empty(S));

    // broadcast from the uplink: flood to port 1, no reverse rule
    let n = c.on_packet_in(&mut dp, S, &packet_in(Some(0), *A, MacAddr::BROADCAST, None)).unwrap();
    assert_eq!(n, 1);
    let rules = dp.take_installed(S);
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].actions, vec![Output(1)]);
    assert_eq!(rules[0].buffer_id, Some(7));
    assert_eq!(rules[0].command, FlowModCommand::Add);
    assert_eq!(c.mac_table().lookup(S, *A, Instant::now()), Some(0));

    // B -> A from port 1: forward to port 0, and reverse rule towards port 1
    let n = c.on_packet_in(&mut dp, S, &packet_in(Some(1), *B, *A, None)).unwrap();
    assert_eq!(n, 2);
    let rules = dp.take_installed(S);
    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0].key, MatchKey { in_port: Some(1), dl_src: *B, dl_dst: *A, dl_vlan: None });
    assert_eq!(rules[0].actions, vec![Output(0)]);
    assert_eq!(rules[1].key, MatchKey { in_port: Some(0), dl_src: *A, dl_dst: *B, dl_vlan: None });
    assert_eq!(rules[1].actions, vec![Output(1)]);
    assert_eq!(rules[1].buffer_id, None);
    assert_eq!(rules[1].command, FlowModCommand::Add);
    assert_eq!(c.mac_table().lookup(S, *B, Instant::now()), Some(1));

    // every message decoded back to the rule it was built from
    assert_eq!(dp.num_rejected(), 0);
}

#[test]
fn test_reverse_rule_only_for_new_sources() {
    let (mut c, mut dp) = get_test_setup(Role::Flat, 4);
    let now = Instant::now();
    assert_eq!(c.on_packet_in_at(&mut dp, S, &packet_in(Some(2), *A, *B, None), now), Ok(2));
    let rules = dp.take_installed(S);
    // unknown destination: uplink, and the reverse rule matches packets from the uplink
    assert_eq!(rules[0].actions, vec![Output(0)]);
    assert_eq!(rules[1].key.in_port, Some(0));
    assert_eq!(rules[1].actions, vec![Output(2)]);

    // same source again: only the forward rule
    assert_eq!(c.on_packet_in_at(&mut dp, S, &packet_in(Some(2), *A, *C, None), now), Ok(1));
    // source moved: reverse rule again
    assert_eq!(c.on_packet_in_at(&mut dp, S, &packet_in(Some(3), *A, *C, None), now), Ok(2));
    // broadcast from a new source: no reverse rule
    assert_eq!(
        c.on_packet_in_at(&mut dp, S, &packet_in(Some(1), *C, MacAddr::BROADCAST, None), now),
        Ok(1)
    );
}

#[test]
fn test_core_reverse_rule() {
    let (mut c, mut dp) = get_test_setup(Role::HierarchicalCore, 4);
    let now = Instant::now();
    c.on_packet_in_at(&mut dp, S, &packet_in(Some(3), *B, MacAddr::BROADCAST, None), now).unwrap();
    dp.take_installed(S);
    // from a downlink towards a learned destination on the other downlink
    assert_eq!(c.on_packet_in_at(&mut dp, S, &packet_in(Some(2), *A, *B, None), now), Ok(2));
    let rules = dp.take_installed(S);
    assert_eq!(rules[0].actions, vec![Output(3)]);
    assert_eq!(rules[1].key, MatchKey { in_port: Some(3), dl_src: *B, dl_dst: *A, dl_vlan: None });

    // from an uplink, unknown destination: flooded to the downlinks, no reverse rule
    assert_eq!(c.on_packet_in_at(&mut dp, S, &packet_in(Some(0), *C, *TAP, None), now), Ok(1));
    let rules = dp.take_installed(S);
    assert_eq!(rules[0].actions, vec![Output(2), Output(3)]);
}

#[test]
fn test_core_complementary_uplinks() {
    let (mut c1, mut dp1) = get_test_setup(Role::HierarchicalCore, 4);
    let (mut c2, mut dp2) = get_test_setup(Role::HierarchicalCore, 4);
    c1.on_packet_in(&mut dp1, S, &packet_in(Some(2), *A, *B, None)).unwrap();
    c2.on_packet_in(&mut dp2, S, &packet_in(Some(2), *B, *A, None)).unwrap();
    assert_eq!(dp1.installed(S)[0].actions, vec![Output(0)]);
    assert_eq!(dp2.installed(S)[0].actions, vec![Output(1)]);
}

#[test]
fn test_core_degenerate_still_learns() {
    let (mut c, mut dp) = get_test_setup(Role::HierarchicalCore, 4);
    assert_eq!(c.on_packet_in(&mut dp, S, &packet_in(Some(2), *A, *A, None)), Ok(0));
    assert_eq!(dp.num_installed(), 0);
    assert_eq!(c.mac_table().lookup(S, *A, Instant::now()), Some(2));
}

#[test]
fn test_group_source_is_learned() {
    let (mut c, mut dp) = get_test_setup(Role::Flat, 2);
    let group: MacAddr = "bb:bb:bb:bb:bb:bb".parse().unwrap();
    assert!(group.is_group());
    assert_eq!(c.on_packet_in(&mut dp, S, &packet_in(Some(1), group, *A, None)), Ok(2));
    assert_eq!(c.mac_table().lookup(S, group, Instant::now()), Some(1));
    let rules = dp.take_installed(S);
    let reverse = MatchKey { in_port: Some(0), dl_src: *A, dl_dst: group, dl_vlan: None };
    assert_eq!(rules[1].key, reverse);
    assert_eq!(rules[1].actions, vec![Output(1)]);
}

#[test]
fn test_unregistered_switch() {
    let (mut c, mut dp) = get_test_setup(Role::Flat, 2);
    let other = SwitchId(2);
    dp.add_switch(other, 2);
    assert_eq!(
        c.on_packet_in(&mut dp, other, &packet_in(Some(1), *A, *B, None)),
        Err(ControllerError::UnregisteredSwitch(other))
    );
    assert!(c.mac_table().is_empty(other));
    assert_eq!(dp.num_installed(), 0);

    // registration
    assert_eq!(c.add_switch(&dp, S), Err(ControllerError::SwitchAlreadyRegistered(S)));
    assert_eq!(c.add_switch(&dp, SwitchId(3)), Err(ControllerError::UnknownDatapath(SwitchId(3))));
    c.add_switch(&dp, other).unwrap();
    assert_eq!(c.num_ports(other), Some(2));
    assert_eq!(c.on_packet_in(&mut dp, other, &packet_in(Some(1), *A, *B, None)), Ok(2));

    c.remove_switch(other).unwrap();
    assert!(!c.is_registered(other));
    assert!(c.mac_table().is_empty(other));
    assert_eq!(c.remove_switch(other), Err(ControllerError::UnregisteredSwitch(other)));
}

#[test]
fn test_malformed_input() {
    let (mut c, mut dp) = get_test_setup(Role::Flat, 2);
    assert!(matches!(
        c.on_packet_in(&mut dp, S, &[1, 10, 0, 40]),
        Err(ControllerError::WireError(_))
    ));
    let msg =
        wire::encode_packet_in(None, Some(1), wire::PacketInReason::NoMatch, &[0; 6], 0).unwrap();
    assert!(matches!(c.on_packet_in(&mut dp, S, &msg), Err(ControllerError::ExtractError(_))));
    // other messages are ignored
    assert_eq!(c.on_packet_in(&mut dp, S, &[1, 2, 0, 8, 0, 0, 0, 1]), Ok(0));
    assert!(c.mac_table().is_empty(S));
    assert_eq!(dp.num_installed(), 0);
}

#[test]
fn test_expiration() {
    let mut dp = RecordingDatapath::new();
    dp.add_switch(S, 3);
    let mut c = Controller::new(ControllerConfig::new(Role::Flat).with_expiration(30.0));
    c.add_switch(&dp, S).unwrap();

    let t0 = Instant::now();
    c.on_packet_in_at(&mut dp, S, &packet_in(Some(1), *A, *B, None), t0).unwrap();
    for rule in dp.installed(S) {
        assert_eq!(rule.hard_timeout, Timeout::ExpiresAfter(30));
        assert_eq!(rule.idle_timeout, Timeout::Permanent);
    }
    dp.take_installed(S);

    // A is known for 30 seconds
    c.on_packet_in_at(&mut dp, S, &packet_in(Some(2), *B, *A, None), t0 + Duration::from_secs(29))
        .unwrap();
    assert_eq!(dp.take_installed(S)[0].actions, vec![Output(1)]);
    c.on_packet_in_at(&mut dp, S, &packet_in(Some(2), *C, *A, None), t0 + Duration::from_secs(31))
        .unwrap();
    assert_eq!(dp.installed(S)[0].actions, vec![Output(0)]);

    assert_eq!(c.expire(t0 + Duration::from_secs(31)), 1);
}

#[test]
fn test_permanent_rules() {
    let (mut c, mut dp) = get_test_setup(Role::Flat, 2);
    c.on_packet_in(&mut dp, S, &packet_in(Some(1), *A, *B, None)).unwrap();
    assert!(dp.installed(S).iter().all(|r| r.hard_timeout == Timeout::Permanent));
}

fn get_vlan_setup(role: Role) -> (Controller, RecordingDatapath) {
    let (mut c, dp) = get_test_setup(role, 6);
    c.set_vlan_id(S, 0, VlanId(10));
    c.set_vlan_id(S, 1, VlanId(10));
    c.set_vlan_id(S, 2, VlanId(20));
    c.set_vlan_id(S, 3, VlanId(10));
    c.set_vlan_id(S, 4, VlanId(99));
    c.set_vlan_id(S, 5, VlanId(99));
    (c, dp)
}

#[test]
fn test_vlan_scoped() {
    let (mut c, mut dp) = get_vlan_setup(Role::VlanScoped);
    // broadcast: flood within VLAN 10, no reverse rule
    let broadcast = packet_in(Some(0), *A, MacAddr::BROADCAST, None);
    assert_eq!(c.on_packet_in(&mut dp, S, &broadcast), Ok(1));
    assert_eq!(
        dp.take_installed(S)[0].actions,
        vec![SetVlanId(VlanId(10)), Output(1), Output(3)]
    );

    // reply from port 3: unicast, and the reverse rule is installed with modify
    assert_eq!(c.on_packet_in(&mut dp, S, &packet_in(Some(3), *B, *A, Some(VlanId(10)))), Ok(2));
    let rules = dp.take_installed(S);
    assert_eq!(rules[0].actions, vec![Output(0)]);
    assert_eq!(rules[1].command, FlowModCommand::Modify);
    assert_eq!(
        rules[1].key,
        MatchKey { in_port: Some(0), dl_src: *A, dl_dst: *B, dl_vlan: Some(VlanId(10)) }
    );
    assert_eq!(rules[1].actions, vec![Output(3)]);
}

#[test]
fn test_vlan_default_domain() {
    let (mut c, mut dp) = get_test_setup(Role::VlanScoped, 3);
    c.set_vlan_id(S, 0, VlanId::DEFAULT);
    c.set_vlan_id(S, 1, VlanId::DEFAULT);
    c.set_vlan_id(S, 2, VlanId(10));
    c.on_packet_in(&mut dp, S, &packet_in(Some(1), *B, MacAddr::BROADCAST, None)).unwrap();
    assert_eq!(
        dp.take_installed(S)[0].actions,
        vec![SetVlanId(VlanId::DEFAULT), StripVlan, Output(0)]
    );

    // untagged packets in the default VLAN are tagged before the tag is stripped again
    assert_eq!(c.on_packet_in(&mut dp, S, &packet_in(Some(0), *A, *B, None)), Ok(2));
    let rules = dp.take_installed(S);
    assert_eq!(rules[0].actions, vec![SetVlanId(VlanId::DEFAULT), StripVlan, Output(1)]);
    assert_eq!(rules[1].actions, vec![Output(0)]);
    assert_eq!(dp.num_rejected(), 0);
}

#[test]
fn test_vlan_unprovisioned_port() {
    let (mut c, mut dp) = get_test_setup(Role::VlanScoped, 4);
    c.set_vlan_id(S, 0, VlanId(10));
    // no forward rule, but the source is learned
    assert_eq!(c.on_packet_in(&mut dp, S, &packet_in(Some(2), *A, *B, None)), Ok(0));
    assert_eq!(c.mac_table().lookup(S, *A, Instant::now()), Some(2));
}

#[test]
fn test_mirroring() {
    let (mut c, mut dp) = get_vlan_setup(Role::Mirroring);
    c.on_packet_in(&mut dp, S, &packet_in(Some(1), *B, MacAddr::BROADCAST, None)).unwrap();
    dp.take_installed(S);

    // forward and tap rule, but no reverse rule
    assert_eq!(c.on_packet_in(&mut dp, S, &packet_in(Some(0), *A, *B, None)), Ok(2));
    let rules = dp.take_installed(S);
    assert_eq!(rules[0].actions, vec![SetVlanId(VlanId(10)), Output(1)]);
    assert_eq!(rules[0].priority, DEFAULT_PRIORITY);
    assert_eq!(rules[1].key, rules[0].key);
    assert_eq!(rules[1].priority, DEFAULT_PRIORITY);
    assert_eq!(rules[1].buffer_id, None);
    assert_eq!(
        rules[1].actions,
        vec![
            SetVlanId(VlanId(99)),
            SetNwDst(Ipv4Addr::new(10, 1, 1, 5)),
            SetDlDst(*TAP),
            Output(4),
            Output(5)
        ]
    );

    // the tap rule replaces the forward rule on the switch
    let hit = dp.lookup(S, &rules[0].key).unwrap();
    assert_eq!(hit, &rules[1]);
    assert_eq!(dp.flow_table(S).iter().filter(|r| r.key == rules[0].key).count(), 1);

    // broadcast is not mirrored
    let broadcast = packet_in(Some(0), *A, MacAddr::BROADCAST, None);
    assert_eq!(c.on_packet_in(&mut dp, S, &broadcast), Ok(1));
    assert_eq!(dp.num_rejected(), 0);
}

#[test]
fn test_mirroring_without_inspection_port() {
    let (mut c, mut dp) = get_test_setup(Role::Mirroring, 3);
    c.set_vlan_id(S, 0, VlanId(10));
    c.set_vlan_id(S, 1, VlanId(10));
    assert_eq!(c.on_packet_in(&mut dp, S, &packet_in(Some(0), *A, *B, None)), Ok(1));
}

#[test]
fn test_pass_through() {
    let (mut c, mut dp) = get_test_setup(Role::PassThrough, 3);
    assert_eq!(c.on_packet_in(&mut dp, S, &packet_in(Some(0), *A, *B, None)), Ok(1));
    assert_eq!(c.on_packet_in(&mut dp, S, &packet_in(Some(1), *B, *A, None)), Ok(1));
    assert_eq!(c.on_packet_in(&mut dp, S, &packet_in(Some(2), *C, *A, None)), Ok(0));
    let rules = dp.installed(S);
    assert_eq!(rules[0].actions, vec![Output(1)]);
    assert_eq!(rules[1].actions, vec![Output(0)]);
}
