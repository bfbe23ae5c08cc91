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

//! # Mirroring Tap
//!
//! Redirects unicast traffic towards an inspection device. The packet is tagged with the inspection
//! VLAN, and its destination addresses are rewritten to the ones of the inspection device.

use crate::controller::match_key::MatchKey;
use crate::controller::rule::Action;
use crate::controller::types::{MacAddr, SwitchId, VlanId};
use crate::controller::vlan_table::VlanDomainTable;
use log::*;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Inspection device, towards which traffic is mirrored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorTap {
    /// VLAN of the inspection device
    pub vlan: VlanId,
    /// MAC address of the inspection device
    pub mac: MacAddr,
    /// IPv4 address of the inspection device
    pub ip: Ipv4Addr,
}

impl Default for MirrorTap {
    fn default() -> Self {
        Self {
            vlan: VlanId(99),
            mac: MacAddr([0, 0, 0, 0, 0, 9]),
            ip: Ipv4Addr::new(10, 1, 1, 5),
        }
    }
}

impl MirrorTap {
    /// Build the action list of the tap rule for the packet with the given key. Returns `None` if
    /// the packet is not mirrored (group destination, or no port of the inspection VLAN).
    pub fn tap_rule(
        &self,
        vlans: &VlanDomainTable,
        switch: SwitchId,
        key: &MatchKey,
    ) -> Option<Vec<Action>> {
        if key.dl_dst.is_group() {
            return None;
        }
        let in_port = key.in_port?;
        let ports = vlans.enumerate_ports_excluding(switch, in_port, self.vlan);
        if ports.is_empty() {
            warn!("No port of {:?} is in the inspection VLAN {}; skip the tap", switch, self.vlan);
            return None;
        }
        let mut actions = vec![
            Action::SetVlanId(self.vlan),
            Action::SetNwDst(self.ip),
            Action::SetDlDst(self.mac),
        ];
        actions.extend(ports.into_iter().map(Action::Output));
        Some(actions)
    }
}
