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

//! # Match Key
//!
//! Turns the frame of a packet-in into the exact-match key used for the installed rules.

use crate::controller::types::{ExtractError, MacAddr, PortNo, VlanId};
use etherparse::{EtherType, Ethernet2HeaderSlice, SingleVlanHeaderSlice};
use std::fmt;

/// Exact match on the layer 2 header of a frame and its ingress port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchKey {
    /// Ingress port, or `None` to match any port.
    pub in_port: Option<PortNo>,
    /// Source MAC address
    pub dl_src: MacAddr,
    /// Destination MAC address
    pub dl_dst: MacAddr,
    /// VLAN id of the frame, or `None` if the frame is untagged.
    pub dl_vlan: Option<VlanId>,
}

impl MatchKey {
    /// Extract the match key out of the raw Ethernet frame. The VLAN id is copied as-is.
    ///
    /// 802.1Q (`0x8100`), 802.1ad (`0x88a8`) and legacy double tags (`0x9100`) are recognized.
    /// For stacked tags, the key carries the VLAN id of the outermost tag.
    pub fn extract(frame: &[u8], in_port: Option<PortNo>) -> Result<Self, ExtractError> {
        let eth = Ethernet2HeaderSlice::from_slice(frame)
            .map_err(|e| ExtractError::MalformedEthernet(format!("{:?}", e)))?;

        // addresses are always 6 bytes long in a successfully parsed header
        let dl_src = MacAddr::from_slice(eth.source())
            .ok_or_else(|| ExtractError::MalformedEthernet("short source".to_string()))?;
        let dl_dst = MacAddr::from_slice(eth.destination())
            .ok_or_else(|| ExtractError::MalformedEthernet("short destination".to_string()))?;

        let dl_vlan = if is_vlan_tag(eth.ether_type()) {
            let tag = SingleVlanHeaderSlice::from_slice(&frame[eth.slice().len()..])
                .map_err(|e| ExtractError::MalformedVlan(format!("{:?}", e)))?;
            Some(VlanId(tag.vlan_identifier()))
        } else {
            None
        };

        Ok(Self { in_port, dl_src, dl_dst, dl_vlan })
    }

    /// Returns the key of the opposite direction: source and destination are swapped, and the
    /// ingress port is replaced by `in_port`.
    pub fn reversed(&self, in_port: Option<PortNo>) -> Self {
        Self { in_port, dl_src: self.dl_dst, dl_dst: self.dl_src, dl_vlan: self.dl_vlan }
    }
}

fn is_vlan_tag(ether_type: u16) -> bool {
    ether_type == EtherType::VlanTaggedFrame as u16
        || ether_type == EtherType::ProviderBridging as u16
        || ether_type == EtherType::VlanDoubleTaggedFrame as u16
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "in_port: ")?;
        match self.in_port {
            Some(p) => write!(f, "{}", p)?,
            None => write!(f, "*")?,
        }
        write!(f, ", src: {}, dst: {}, vlan: ", self.dl_src, self.dl_dst)?;
        match self.dl_vlan {
            Some(v) => write!(f, "{}", v),
            None => write!(f, "none"),
        }
    }
}
