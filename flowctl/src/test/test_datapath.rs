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

//! Test the flow table model of the recording datapath.

use crate::controller::rule::Action::*;
use crate::controller::{
    FlowModCommand, FlowRule, MacAddr, MatchKey, SwitchId, Timeout, VlanId, DEFAULT_PRIORITY,
};
use crate::datapath::{Datapath, RecordingDatapath};
use crate::wire::encode_flow_mod;
use lazy_static::lazy_static;

lazy_static! {
    static ref A: MacAddr = "aa:aa:aa:aa:aa:aa".parse().unwrap();
    static ref B: MacAddr = "be:be:be:be:be:be".parse().unwrap();
}

const S: SwitchId = SwitchId(1);

fn rule(in_port: Option<u16>, command: FlowModCommand, priority: u16, out: u16) -> FlowRule {
    FlowRule {
        key: MatchKey { in_port, dl_src: *A, dl_dst: *B, dl_vlan: None },
        actions: vec![Output(out)],
        buffer_id: None,
        command,
        priority,
        idle_timeout: Timeout::Permanent,
        hard_timeout: Timeout::Permanent,
    }
}

fn send(dp: &mut RecordingDatapath, switch: SwitchId, rule: &FlowRule) {
    let msg = encode_flow_mod(rule, 0).unwrap();
    dp.send_flow_mod(switch, rule, &msg);
}

#[test]
fn test_add_replaces_same_match_and_priority() {
    let mut dp = RecordingDatapath::new();
    dp.add_switch(S, 4);
    send(&mut dp, S, &rule(Some(1), FlowModCommand::Add, DEFAULT_PRIORITY, 2));
    send(&mut dp, S, &rule(Some(1), FlowModCommand::Add, DEFAULT_PRIORITY, 3));
    assert_eq!(dp.flow_table(S).len(), 1);
    assert_eq!(dp.installed(S).len(), 2);

    let packet = MatchKey { in_port: Some(1), dl_src: *A, dl_dst: *B, dl_vlan: None };
    assert_eq!(dp.lookup(S, &packet).unwrap().actions, vec![Output(3)]);

    // a different priority is a separate entry, and the higher one wins
    send(&mut dp, S, &rule(Some(1), FlowModCommand::Add, DEFAULT_PRIORITY - 1, 0));
    assert_eq!(dp.flow_table(S).len(), 2);
    assert_eq!(dp.lookup(S, &packet).unwrap().actions, vec![Output(3)]);
    assert_eq!(dp.num_rejected(), 0);
}

#[test]
fn test_lookup() {
    let mut dp = RecordingDatapath::new();
    dp.add_switch(S, 4);
    send(&mut dp, S, &rule(None, FlowModCommand::Add, DEFAULT_PRIORITY, 2));

    // wildcarded ingress port matches every port
    let mut packet = MatchKey { in_port: Some(3), dl_src: *A, dl_dst: *B, dl_vlan: None };
    assert_eq!(dp.lookup(S, &packet).unwrap().actions, vec![Output(2)]);

    // later entry with the same priority wins
    send(&mut dp, S, &rule(Some(3), FlowModCommand::Add, DEFAULT_PRIORITY, 1));
    assert_eq!(dp.lookup(S, &packet).unwrap().actions, vec![Output(1)]);

    packet.dl_vlan = Some(VlanId(10));
    assert_eq!(dp.lookup(S, &packet), None);
    packet.dl_vlan = None;
    packet.dl_dst = MacAddr::BROADCAST;
    assert_eq!(dp.lookup(S, &packet), None);
}

#[test]
fn test_modify() {
    let mut dp = RecordingDatapath::new();
    dp.add_switch(S, 4);

    // modify without any matching entry adds the rule
    send(&mut dp, S, &rule(Some(1), FlowModCommand::Modify, DEFAULT_PRIORITY, 2));
    assert_eq!(dp.flow_table(S).len(), 1);

    // modify rewrites the actions, but keeps the priority
    send(&mut dp, S, &rule(Some(1), FlowModCommand::Modify, DEFAULT_PRIORITY - 5, 3));
    assert_eq!(dp.flow_table(S).len(), 1);
    assert_eq!(dp.flow_table(S)[0].actions, vec![Output(3)]);
    assert_eq!(dp.flow_table(S)[0].priority, DEFAULT_PRIORITY);
}

#[test]
fn test_unknown_switch() {
    let mut dp = RecordingDatapath::new();
    send(&mut dp, S, &rule(Some(1), FlowModCommand::Add, DEFAULT_PRIORITY, 2));
    assert_eq!(dp.num_rejected(), 1);
    assert!(dp.flow_table(S).is_empty());
    assert_eq!(dp.num_installed(), 0);
}
