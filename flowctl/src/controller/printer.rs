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

//! # Helper (printer) functions for the controller
//! Module containing helper functions to get formatted strings of rules and of the controller
//! state.

use crate::controller::mac_table::MacLearningTable;
use crate::controller::rule::{Action, FlowModCommand, FlowRule, Timeout};
use crate::controller::types::SwitchId;
use crate::controller::vlan_table::VlanDomainTable;
use itertools::Itertools;

/// Returns the action list as a comma separated string. An empty list is printed as `drop`.
pub fn actions(actions: &[Action]) -> String {
    if actions.is_empty() {
        String::from("drop")
    } else {
        actions.iter().join(", ")
    }
}

/// Returns a formatted string for a timeout
pub fn timeout(t: Timeout) -> String {
    match t {
        Timeout::Permanent => String::from("permanent"),
        Timeout::ExpiresAfter(s) => format!("{}s", s),
    }
}

/// Returns a one-line string for the flow rule
pub fn flow_rule(rule: &FlowRule) -> String {
    format!(
        "{cmd} prio {prio} [{key}] -> [{actions}]{buffer}, idle: {idle}, hard: {hard}",
        cmd = match rule.command {
            FlowModCommand::Add => "add",
            FlowModCommand::Modify => "modify",
        },
        prio = rule.priority,
        key = rule.key,
        actions = actions(&rule.actions),
        buffer = rule.buffer_id.map(|b| format!(", buffer: {}", b)).unwrap_or_default(),
        idle = timeout(rule.idle_timeout),
        hard = timeout(rule.hard_timeout),
    )
}

/// Get a vector of strings representing the learning table of a switch, one line per address,
/// sorted by address.
pub fn mac_table(table: &MacLearningTable, switch: SwitchId) -> Vec<String> {
    table
        .entries(switch)
        .map(|entries| {
            entries
                .sorted_by_key(|(mac, _)| **mac)
                .map(|(mac, entry)| format!("{} -> port {}", mac, entry.port))
                .collect()
        })
        .unwrap_or_default()
}

/// Get a vector of strings representing the VLAN provisioning of a switch, one line per VLAN.
pub fn vlan_table(table: &VlanDomainTable, switch: SwitchId) -> Vec<String> {
    table
        .ports(switch)
        .map(|ports| {
            ports
                .map(|(port, vid)| (*vid, *port))
                .into_group_map()
                .into_iter()
                .sorted()
                .map(|(vid, ports)| format!("VLAN {}: ports {{{}}}", vid, ports.iter().join(", ")))
                .collect()
        })
        .unwrap_or_default()
}

/// Print the learning table and the VLAN provisioning of a switch.
pub fn print_switch_state(macs: &MacLearningTable, vlans: &VlanDomainTable, switch: SwitchId) {
    println!("Learned addresses of {:?}", switch);
    for line in mac_table(macs, switch) {
        println!("  {}", line);
    }
    let vlan_lines = vlan_table(vlans, switch);
    if !vlan_lines.is_empty() {
        println!("VLAN provisioning of {:?}", switch);
        for line in vlan_lines {
            println!("  {}", line);
        }
    }
}
