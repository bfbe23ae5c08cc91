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

//! # Datapath
//!
//! Boundary towards the switches. The controller never talks to a switch directly, but only
//! through a [`Datapath`], which answers capability queries and accepts the flow rules.

use crate::controller::match_key::MatchKey;
use crate::controller::rule::{FlowModCommand, FlowRule};
use crate::controller::types::SwitchId;
use crate::wire;
use log::*;
use std::collections::HashMap;

/// Collaborator owning the switches.
pub trait Datapath {
    /// Number of ports of the switch, or `None` if the switch is not known.
    fn num_ports(&self, switch: SwitchId) -> Option<u16>;

    /// Deliver a flow rule to the switch. `message` is the encoded OpenFlow message of the rule.
    fn send_flow_mod(&mut self, switch: SwitchId, rule: &FlowRule, message: &[u8]);
}

/// In-memory datapath, which records the rules delivered to each switch, and applies them to a
/// simple model of the OpenFlow 1.0 flow table.
///
/// Every message is decoded again, and compared against the rule object it was built from. A
/// mismatch is logged and counted in [`RecordingDatapath::num_rejected`].
///
/// The flow table follows the switch semantics: an added rule replaces the entry with the same
/// match and priority, and a modify rewrites the actions of all entries with the same match (or
/// is added if there is none). Timeouts are not simulated.
#[derive(Debug, Clone, Default)]
pub struct RecordingDatapath {
    ports: HashMap<SwitchId, u16>,
    installed: HashMap<SwitchId, Vec<FlowRule>>,
    flow_tables: HashMap<SwitchId, Vec<FlowRule>>,
    num_rejected: usize,
}

impl RecordingDatapath {
    /// Create an empty datapath without any switch
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a switch with the given number of ports. An existing switch is replaced.
    pub fn add_switch(&mut self, switch: SwitchId, num_ports: u16) {
        self.ports.insert(switch, num_ports);
        self.installed.entry(switch).or_insert_with(Vec::new);
        self.flow_tables.entry(switch).or_insert_with(Vec::new);
    }

    /// Returns all rules delivered to the switch, in the order of delivery.
    pub fn installed(&self, switch: SwitchId) -> &[FlowRule] {
        self.installed.get(&switch).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Remove and return all rules delivered to the switch so far.
    pub fn take_installed(&mut self, switch: SwitchId) -> Vec<FlowRule> {
        self.installed.get_mut(&switch).map(std::mem::take).unwrap_or_default()
    }

    /// Returns the current flow table of the switch, in the order of insertion.
    pub fn flow_table(&self, switch: SwitchId) -> &[FlowRule] {
        self.flow_tables.get(&switch).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Returns the entry of the flow table which a packet with the given header would hit. Among
    /// all matching entries, the one with the highest priority wins. Ties go to the entry added
    /// last.
    pub fn lookup(&self, switch: SwitchId, packet: &MatchKey) -> Option<&FlowRule> {
        self.flow_table(switch)
            .iter()
            .enumerate()
            .filter(|(_, rule)| {
                rule.key.in_port.map(|p| Some(p) == packet.in_port).unwrap_or(true)
                    && rule.key.dl_src == packet.dl_src
                    && rule.key.dl_dst == packet.dl_dst
                    && rule.key.dl_vlan == packet.dl_vlan
            })
            .max_by_key(|(i, rule)| (rule.priority, *i))
            .map(|(_, rule)| rule)
    }

    /// Total number of delivered rules
    pub fn num_installed(&self) -> usize {
        self.installed.values().map(|v| v.len()).sum()
    }

    /// Number of messages which did not decode to the delivered rule
    pub fn num_rejected(&self) -> usize {
        self.num_rejected
    }
}

impl Datapath for RecordingDatapath {
    fn num_ports(&self, switch: SwitchId) -> Option<u16> {
        self.ports.get(&switch).copied()
    }

    fn send_flow_mod(&mut self, switch: SwitchId, rule: &FlowRule, message: &[u8]) {
        match wire::decode_message(message) {
            Ok(wire::Message::FlowMod(decoded)) if &decoded == rule => {}
            Ok(other) => {
                warn!("Flow mod for {:?} decodes to a different message: {:?}", switch, other);
                self.num_rejected += 1;
            }
            Err(e) => {
                warn!("Cannot decode flow mod for {:?}: {}", switch, e);
                self.num_rejected += 1;
            }
        }
        match (self.installed.get_mut(&switch), self.flow_tables.get_mut(&switch)) {
            (Some(rules), Some(table)) => {
                rules.push(rule.clone());
                apply(table, rule);
            }
            _ => {
                warn!("Rule delivered to unknown switch {:?}", switch);
                self.num_rejected += 1;
            }
        }
    }
}

fn apply(table: &mut Vec<FlowRule>, rule: &FlowRule) {
    if rule.command == FlowModCommand::Modify {
        let mut modified = false;
        for entry in table.iter_mut().filter(|e| e.key == rule.key) {
            entry.actions = rule.actions.clone();
            modified = true;
        }
        if modified {
            return;
        }
    }
    table.retain(|e| !(e.key == rule.key && e.priority == rule.priority));
    table.push(rule.clone());
}
