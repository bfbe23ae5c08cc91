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

//! # Port/VLAN Domain Table
//!
//! Per-switch mapping of ports to their provisioned VLAN. The table is the only source of flood
//! domains: it is filled by the operator before traffic flows, and never learned from traffic.

use crate::controller::types::{DomainError, PortNo, SwitchId, VlanId};
use log::*;
use std::collections::{btree_map, BTreeMap, BTreeSet, HashMap};

/// VLAN domain table, mapping `(switch, port)` to at most one VLAN id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VlanDomainTable {
    domains: HashMap<SwitchId, BTreeMap<PortNo, VlanId>>,
}

impl VlanDomainTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self { domains: HashMap::new() }
    }

    /// Assign `vid` to the port of the switch, replacing the previous assignment. Returns the
    /// previous VLAN id, if there was any.
    pub fn set_vlan_id(&mut self, switch: SwitchId, port: PortNo, vid: VlanId) -> Option<VlanId> {
        let old = self.domains.entry(switch).or_insert_with(BTreeMap::new).insert(port, vid);
        match old {
            Some(old) if old != vid => {
                info!("Reassigned VLAN of {:?} port {}: {} -> {}", switch, port, old, vid)
            }
            None => debug!("Assigned VLAN {} to {:?} port {}", vid, switch, port),
            _ => {}
        }
        old
    }

    /// Returns the VLAN provisioned on the port of the switch.
    pub fn get_vlan_id(&self, switch: SwitchId, port: PortNo) -> Result<VlanId, DomainError> {
        self.domains
            .get(&switch)
            .ok_or(DomainError::UnknownSwitch(switch))?
            .get(&port)
            .copied()
            .ok_or(DomainError::VlanNotFound(switch, port))
    }

    /// Returns all ports of the switch, which are assigned to `vid`.
    pub fn enumerate_ports(&self, switch: SwitchId, vid: VlanId) -> BTreeSet<PortNo> {
        self.domains
            .get(&switch)
            .map(|ports| ports.iter().filter(|(_, v)| **v == vid).map(|(p, _)| *p).collect())
            .unwrap_or_default()
    }

    /// Returns all ports of the switch, which are assigned to `vid`, except `port` itself.
    pub fn enumerate_ports_excluding(
        &self,
        switch: SwitchId,
        port: PortNo,
        vid: VlanId,
    ) -> BTreeSet<PortNo> {
        let mut ports = self.enumerate_ports(switch, vid);
        ports.remove(&port);
        ports
    }

    /// Iterate over the provisioning of a single switch, ordered by port.
    pub fn ports(&self, switch: SwitchId) -> Option<btree_map::Iter<'_, PortNo, VlanId>> {
        self.domains.get(&switch).map(|ports| ports.iter())
    }

    /// Forget the provisioning of an entire switch
    pub fn remove_switch(&mut self, switch: SwitchId) {
        self.domains.remove(&switch);
    }
}
