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

//! # Flow Rules
//!
//! This module contains the actions, the flow rule built for every forwarding decision, and the
//! [`RuleInstaller`], which hands the rules over to the switch.

use crate::controller::match_key::MatchKey;
use crate::controller::types::{MacAddr, PortNo, SwitchId, VlanId};
use crate::datapath::Datapath;
use crate::wire::{self, WireError};
use log::*;
use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Priority of all regular rules
pub const DEFAULT_PRIORITY: u16 = 0x8000;

/// Action applied to a matched packet. Actions of one rule are applied in order, so rewrites must
/// be placed before the outputs they should affect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Send the packet out of the port
    Output(PortNo),
    /// Set (or add) the 802.1Q tag
    SetVlanId(VlanId),
    /// Remove the 802.1Q tag
    StripVlan,
    /// Rewrite the destination MAC address
    SetDlDst(MacAddr),
    /// Rewrite the destination IPv4 address
    SetNwDst(Ipv4Addr),
}

impl Action {
    /// Returns the output port, if this is an output action.
    pub fn output_port(&self) -> Option<PortNo> {
        match self {
            Self::Output(p) => Some(*p),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Output(p) => write!(f, "output:{}", p),
            Self::SetVlanId(v) => write!(f, "set_vlan:{}", v),
            Self::StripVlan => write!(f, "strip_vlan"),
            Self::SetDlDst(mac) => write!(f, "set_dl_dst:{}", mac),
            Self::SetNwDst(addr) => write!(f, "set_nw_dst:{}", addr),
        }
    }
}

/// Timeout of a flow entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timeout {
    /// The entry never expires
    Permanent,
    /// The entry expires after the given number of seconds
    ExpiresAfter(u16),
}

impl Timeout {
    /// Convert a duration into a timeout. A zero duration becomes `Permanent`, everything else is
    /// rounded up to full seconds (at most `u16::MAX`).
    pub fn from_duration(d: Duration) -> Self {
        if d == Duration::from_secs(0) {
            return Self::Permanent;
        }
        let secs = d.as_secs() + if d.subsec_nanos() > 0 { 1 } else { 0 };
        Self::ExpiresAfter(secs.min(u16::MAX as u64) as u16)
    }

    /// Number of seconds on the wire (`0` means permanent)
    pub fn as_secs(&self) -> u16 {
        match self {
            Self::Permanent => 0,
            Self::ExpiresAfter(s) => *s,
        }
    }
}

/// Kind of modification of the flow table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowModCommand {
    /// Add a new flow
    Add,
    /// Modify the actions of all matching flows
    Modify,
}

/// Flow rule as delivered to the switch. The controller does not keep a copy after delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowRule {
    /// Fields to match
    pub key: MatchKey,
    /// Ordered action list. An empty list drops the packet.
    pub actions: Vec<Action>,
    /// Buffered packet on the switch, which should be released through the new rule
    pub buffer_id: Option<u32>,
    /// Add or modify
    pub command: FlowModCommand,
    /// Priority of the rule
    pub priority: u16,
    /// Idle timeout
    pub idle_timeout: Timeout,
    /// Hard timeout
    pub hard_timeout: Timeout,
}

impl FlowRule {
    /// Returns all output ports of the action list, in order.
    pub fn output_ports(&self) -> Vec<PortNo> {
        self.actions.iter().filter_map(|a| a.output_port()).collect()
    }
}

/// Builds flow rules and delivers them to the switch.
///
/// Whenever the configured expiration is non-zero, it replaces the hard timeout of every rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleInstaller {
    expiration: Timeout,
}

impl RuleInstaller {
    /// Create a new installer. A zero `expiration` keeps the requested hard timeout.
    pub fn new(expiration: Duration) -> Self {
        Self { expiration: Timeout::from_duration(expiration) }
    }

    /// Returns the expiration written into the rules
    pub fn expiration(&self) -> Timeout {
        self.expiration
    }

    /// Build the rule, including the effective hard timeout.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        &self,
        key: MatchKey,
        buffer_id: Option<u32>,
        command: FlowModCommand,
        actions: Vec<Action>,
        priority: u16,
        idle_timeout: Timeout,
        hard_timeout: Timeout,
    ) -> FlowRule {
        let hard_timeout = match self.expiration {
            Timeout::Permanent => hard_timeout,
            expiration => expiration,
        };
        FlowRule { key, actions, buffer_id, command, priority, idle_timeout, hard_timeout }
    }

    /// Build the rule and deliver it to the switch. Only encoding failures are reported; switch-side
    /// failures are not reported back.
    #[allow(clippy::too_many_arguments)]
    pub fn install<D: Datapath + ?Sized>(
        &self,
        datapath: &mut D,
        switch: SwitchId,
        key: MatchKey,
        buffer_id: Option<u32>,
        command: FlowModCommand,
        actions: Vec<Action>,
        idle_timeout: Timeout,
        hard_timeout: Timeout,
    ) -> Result<FlowRule, WireError> {
        let rule = self.build(
            key,
            buffer_id,
            command,
            actions,
            DEFAULT_PRIORITY,
            idle_timeout,
            hard_timeout,
        );
        self.deliver(datapath, switch, rule)
    }

    /// Deliver an already built rule to the switch.
    pub fn deliver<D: Datapath + ?Sized>(
        &self,
        datapath: &mut D,
        switch: SwitchId,
        rule: FlowRule,
    ) -> Result<FlowRule, WireError> {
        let message = wire::encode_flow_mod(&rule, 0)?;
        debug!(
            "Install on {:?} ({} bytes): {}",
            switch,
            message.len(),
            crate::controller::printer::flow_rule(&rule)
        );
        datapath.send_flow_mod(switch, &rule, &message);
        Ok(rule)
    }
}
