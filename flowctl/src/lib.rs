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

#![deny(missing_docs)]

//! # flowctl: Packet-In Decision Core for OpenFlow Controllers
//! This is a library deciding how switches forward packets they cannot match on their own. A
//! switch sends such a packet to the controller (packet-in), the controller decides where the
//! packet and all packets like it should go, and installs a flow rule on the switch.
//!
//! ## Structure
//!
//! This library is structured in the following way:
//!
//! - **[`Controller`](controller)**: The decision core. See the main structure
//!   [`Controller`](controller::Controller). It learns the location of MAC addresses, keeps the
//!   provisioned VLAN domains, and decides on the forwarding using a
//!   [`ForwardingPolicy`](controller::ForwardingPolicy), configured by the
//!   [`Role`](controller::Role) of the switch in the topology.
//!
//! - **[`Wire`](wire)**: OpenFlow 1.0 encoding of packet-ins and flow modifications.
//!
//! - **[`Datapath`](datapath)**: Boundary towards the switches. The
//!   [`RecordingDatapath`](datapath::RecordingDatapath) keeps all delivered rules in memory.
//!
//! - **[`Config`](config)**: JSON configuration of a controller.

pub mod config;
pub mod controller;
pub mod datapath;
mod error;
pub mod wire;

#[cfg(test)]
mod test;

pub use error::Error;
