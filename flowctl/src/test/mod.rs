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

#[cfg(test)]
mod test_controller;
#[cfg(test)]
mod test_datapath;
#[cfg(test)]
mod test_mac_table;

use crate::controller::{MacAddr, PortNo, VlanId};
use crate::wire::{self, PacketInReason};

/// Encode a packet-in carrying an IPv4 frame from `src` to `dst`.
pub(crate) fn packet_in(
    in_port: Option<PortNo>,
    src: MacAddr,
    dst: MacAddr,
    vlan: Option<VlanId>,
) -> Vec<u8> {
    let frame = wire::ethernet_frame(src, dst, vlan, 0x0800, &[0u8; 46]).unwrap();
    wire::encode_packet_in(Some(7), in_port, PacketInReason::NoMatch, &frame, 42).unwrap().to_vec()
}
