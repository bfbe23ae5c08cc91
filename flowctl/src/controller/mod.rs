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

#![deny(missing_docs, missing_debug_implementations)]

//! # Controller
//!
//! Decision core of the controller: everything between a decoded packet-in and the flow rules
//! sent back to the switch.
//!
//! ## Example usage
//!
//! The following example attaches a two-port flat switch, and sends a broadcast packet from port
//! 0. The packet is flooded to port 1, and no reverse rule is installed, since the packet arrived
//! on the uplink.
//!
//! ```rust
//! use flowctl::config::ControllerConfig;
//! use flowctl::controller::{Action, Controller, MacAddr, Role, SwitchId};
//! use flowctl::datapath::RecordingDatapath;
//! use flowctl::wire::{self, PacketInReason};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let switch = SwitchId(1);
//!     let mut datapath = RecordingDatapath::new();
//!     datapath.add_switch(switch, 2);
//!
//!     let mut controller = Controller::new(ControllerConfig::new(Role::Flat));
//!     controller.add_switch(&datapath, switch)?;
//!
//!     let a: MacAddr = "aa:aa:aa:aa:aa:aa".parse()?;
//!     let frame = wire::ethernet_frame(a, MacAddr::BROADCAST, None, 0x0800, &[0; 46])?;
//!     let msg = wire::encode_packet_in(None, Some(0), PacketInReason::NoMatch, &frame, 1)?;
//!
//!     assert_eq!(controller.on_packet_in(&mut datapath, switch, &msg)?, 1);
//!     assert_eq!(datapath.installed(switch)[0].actions, vec![Action::Output(1)]);
//!     assert_eq!(controller.mac_table().lookup(switch, a, std::time::Instant::now()), Some(0));
//!
//!     Ok(())
//! }
//! ```

pub mod mac_table;
pub mod match_key;
pub mod mirror;
pub mod policy;
pub mod printer;
pub mod rule;
mod switch_controller;
pub mod types;
pub mod vlan_table;

pub use mac_table::{LearnOutcome, LearnedEntry, MacLearningTable};
pub use match_key::MatchKey;
pub use mirror::MirrorTap;
pub use policy::{Egress, ForwardingPolicy, PolicyContext, Role, Verdict};
pub use rule::{Action, FlowModCommand, FlowRule, RuleInstaller, Timeout, DEFAULT_PRIORITY};
pub use switch_controller::Controller;
pub use types::*;
pub use vlan_table::VlanDomainTable;
