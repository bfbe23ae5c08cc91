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

//! # Forwarding Policy
//!
//! A single forwarding policy, parameterized by the [`Role`] of the switch in the topology. The
//! policy only reads the learning table and the domain table; it never modifies them. Learning
//! and the installation of the rules is done by the [`Controller`](crate::controller::Controller)
//! after the decision.
//!
//! ## Roles
//!
//! - [`Role::Flat`]: learning switch with an uplink on port 0. Unknown destinations are sent to
//!   the uplink, or flooded when the packet came from the uplink.
//! - [`Role::HierarchicalCore`]: ports 0 and 1 are uplinks, all others are downlinks. Unknown
//!   destinations from a downlink are sent to one of the two uplinks, chosen by comparing the
//!   source and destination address. Both directions of a flow thus take complementary uplinks.
//! - [`Role::VlanScoped`]: forwarding restricted to the VLAN domain of the ingress port.
//! - [`Role::Mirroring`]: VLAN-scoped forwarding. Additionally, the controller installs a tap
//!   rule (see [`MirrorTap`](crate::controller::MirrorTap)).
//! - [`Role::PassThrough`]: a two-port device, forwarding everything from port 0 to port 1, and
//!   vice versa.

use crate::controller::mac_table::MacLearningTable;
use crate::controller::match_key::MatchKey;
use crate::controller::rule::{Action, FlowModCommand};
use crate::controller::types::{PolicyError, PortNo, SwitchId, VlanId};
use crate::controller::vlan_table::VlanDomainTable;
use log::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Instant;

/// Uplink port of the flat role
pub const FLAT_UPLINK: PortNo = 0;
/// Uplink chosen by the core tie-break when the source address is smaller
pub const CORE_UPLINK_LOW: PortNo = 0;
/// Uplink chosen by the core tie-break when the destination address is smaller
pub const CORE_UPLINK_HIGH: PortNo = 1;
/// First downlink port of the core role
pub const CORE_FIRST_DOWNLINK: PortNo = 2;

/// Role of the switch in the topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    /// Flat learning switch (edge or basic switch)
    Flat,
    /// Core switch of a two-tier topology
    HierarchicalCore,
    /// Forwarding scoped to the VLAN domain of the ingress port
    VlanScoped,
    /// VLAN-scoped forwarding, plus a tap towards the inspection device
    Mirroring,
    /// Two-port inline device
    PassThrough,
}

impl Role {
    /// Returns true if a reverse rule may be installed for packets received on `in_port`.
    pub fn reverse_rule_allowed(&self, in_port: PortNo) -> bool {
        match self {
            Self::Flat => in_port != FLAT_UPLINK,
            Self::HierarchicalCore => in_port >= CORE_FIRST_DOWNLINK,
            Self::VlanScoped => true,
            Self::Mirroring | Self::PassThrough => false,
        }
    }

    /// Command used to install the reverse rule
    pub fn reverse_command(&self) -> FlowModCommand {
        match self {
            Self::VlanScoped | Self::Mirroring => FlowModCommand::Modify,
            Self::Flat | Self::HierarchicalCore | Self::PassThrough => FlowModCommand::Add,
        }
    }

    /// Returns true if the role forwards within VLAN domains.
    pub fn is_vlan_aware(&self) -> bool {
        matches!(self, Self::VlanScoped | Self::Mirroring)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Flat => "flat",
            Self::HierarchicalCore => "hierarchical-core",
            Self::VlanScoped => "vlan-scoped",
            Self::Mirroring => "mirroring",
            Self::PassThrough => "pass-through",
        })
    }
}

/// Where the packet leaves the switch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Egress {
    /// A single port, either learned or chosen by the role
    Unicast(PortNo),
    /// A set of ports (possibly empty)
    Flood(BTreeSet<PortNo>),
    /// The destination is located behind the ingress port. The packet is not forwarded.
    Filter,
}

impl Egress {
    /// Returns the port if the packet leaves on a single port.
    pub fn unicast(&self) -> Option<PortNo> {
        match self {
            Self::Unicast(p) => Some(*p),
            _ => None,
        }
    }

    /// Returns all egress ports
    pub fn ports(&self) -> BTreeSet<PortNo> {
        match self {
            Self::Unicast(p) => std::iter::once(*p).collect(),
            Self::Flood(ports) => ports.clone(),
            Self::Filter => BTreeSet::new(),
        }
    }
}

/// Decision of the policy for a single packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Ordered action list of the forward rule. An empty list means no forward rule.
    pub actions: Vec<Action>,
    /// Resolved egress
    pub egress: Egress,
    /// VLAN resolved for the packet (only for VLAN aware roles)
    pub vlan: Option<VlanId>,
}

impl Verdict {
    /// Verdict sending the packet out of a single port
    fn unicast(port: PortNo) -> Self {
        Self { actions: vec![Action::Output(port)], egress: Egress::Unicast(port), vlan: None }
    }

    /// Verdict flooding the packet out of all `ports`
    fn flood(ports: BTreeSet<PortNo>) -> Self {
        Self {
            actions: ports.iter().map(|p| Action::Output(*p)).collect(),
            egress: Egress::Flood(ports),
            vlan: None,
        }
    }

    /// Verdict not forwarding the packet at all
    fn filter() -> Self {
        Self { actions: Vec::new(), egress: Egress::Filter, vlan: None }
    }
}

/// Read-only view of the controller state, as seen by the policy.
#[derive(Debug, Clone, Copy)]
pub struct PolicyContext<'a> {
    /// Switch which received the packet
    pub switch: SwitchId,
    /// Number of ports of the switch
    pub num_ports: u16,
    /// Learned addresses
    pub macs: &'a MacLearningTable,
    /// Provisioned VLAN domains
    pub vlans: &'a VlanDomainTable,
    /// Time of the event
    pub now: Instant,
}

impl<'a> PolicyContext<'a> {
    /// Lookup the learned port of the destination.
    fn learned(&self, key: &MatchKey) -> Option<PortNo> {
        self.macs.lookup(self.switch, key.dl_dst, self.now)
    }

    /// All ports of the switch, except `port`
    fn all_ports_except(&self, port: PortNo) -> BTreeSet<PortNo> {
        (0..self.num_ports).filter(|p| *p != port).collect()
    }
}

/// Forwarding policy of a controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForwardingPolicy {
    role: Role,
}

impl ForwardingPolicy {
    /// Create a policy for the given role
    pub fn new(role: Role) -> Self {
        Self { role }
    }

    /// Returns the role of the policy
    pub fn role(&self) -> Role {
        self.role
    }

    /// Decide how the packet with the given match key is forwarded.
    ///
    /// The decision never modifies any table. Errors mean that no forward rule can be built; they
    /// are never fatal for the controller.
    pub fn decide(&self, ctx: &PolicyContext<'_>, key: &MatchKey) -> Result<Verdict, PolicyError> {
        let in_port = key.in_port.ok_or(PolicyError::NoIngressPort)?;
        let verdict = match self.role {
            Role::Flat => self.decide_flat(ctx, key, in_port),
            Role::HierarchicalCore => self.decide_core(ctx, key, in_port)?,
            Role::VlanScoped | Role::Mirroring => self.decide_vlan(ctx, key, in_port)?,
            Role::PassThrough => match in_port {
                0 => Verdict::unicast(1),
                1 => Verdict::unicast(0),
                p => return Err(PolicyError::UnexpectedIngress(p)),
            },
        };
        trace!("{} policy on {:?} for [{}]: {:?}", self.role, ctx.switch, key, verdict.egress);
        Ok(verdict)
    }

    fn decide_flat(&self, ctx: &PolicyContext<'_>, key: &MatchKey, in_port: PortNo) -> Verdict {
        if key.dl_dst.is_group() {
            return Verdict::flood(ctx.all_ports_except(in_port));
        }
        match ctx.learned(key) {
            Some(p) if p == in_port => Verdict::filter(),
            Some(p) => Verdict::unicast(p),
            None if in_port != FLAT_UPLINK => Verdict::unicast(FLAT_UPLINK),
            None => Verdict::flood(ctx.all_ports_except(in_port)),
        }
    }

    fn decide_core(
        &self,
        ctx: &PolicyContext<'_>,
        key: &MatchKey,
        in_port: PortNo,
    ) -> Result<Verdict, PolicyError> {
        let from_uplink = in_port < CORE_FIRST_DOWNLINK;
        let downlinks = || (CORE_FIRST_DOWNLINK..ctx.num_ports).collect::<BTreeSet<_>>();

        if key.dl_dst.is_group() {
            return Ok(if from_uplink {
                Verdict::flood(downlinks())
            } else {
                Verdict::flood(
                    [CORE_UPLINK_LOW, CORE_UPLINK_HIGH]
                        .iter()
                        .copied()
                        .filter(|p| *p < ctx.num_ports)
                        .collect(),
                )
            });
        }

        Ok(match ctx.learned(key) {
            Some(p) if p == in_port => Verdict::filter(),
            Some(p) => Verdict::unicast(p),
            None if from_uplink => Verdict::flood(downlinks()),
            None => Verdict::unicast(tie_break(key)?),
        })
    }

    fn decide_vlan(
        &self,
        ctx: &PolicyContext<'_>,
        key: &MatchKey,
        in_port: PortNo,
    ) -> Result<Verdict, PolicyError> {
        let vid = ctx.vlans.get_vlan_id(ctx.switch, in_port)?;

        // after the first actions, the packet always carries the tag of its ingress port
        let mut actions = Vec::new();
        match key.dl_vlan {
            Some(tag) if tag == vid => {}
            Some(tag) => {
                error!(
                    "VLAN mismatch on {:?}, port {}: packet tagged with {}, but port is provisioned with {}",
                    ctx.switch, in_port, tag, vid
                );
                actions.push(Action::SetVlanId(vid));
            }
            None => actions.push(Action::SetVlanId(vid)),
        }

        let egress = if key.dl_dst.is_group() {
            Egress::Flood(ctx.vlans.enumerate_ports_excluding(ctx.switch, in_port, vid))
        } else {
            match ctx.learned(key) {
                Some(p) if p == in_port => {
                    return Ok(Verdict { vlan: Some(vid), ..Verdict::filter() });
                }
                Some(p) if ctx.vlans.get_vlan_id(ctx.switch, p).ok() == Some(vid) => {
                    Egress::Unicast(p)
                }
                Some(p) => {
                    debug!("{} is learned at port {}, which is not in VLAN {}", key.dl_dst, p, vid);
                    Egress::Flood(ctx.vlans.enumerate_ports_excluding(ctx.switch, in_port, vid))
                }
                None => {
                    Egress::Flood(ctx.vlans.enumerate_ports_excluding(ctx.switch, in_port, vid))
                }
            }
        };

        // tagged outputs first, then strip the tag, and then the untagged outputs
        let (untagged, tagged_ports): (Vec<PortNo>, Vec<PortNo>) = egress
            .ports()
            .into_iter()
            .partition(|p| ctx.vlans.get_vlan_id(ctx.switch, *p) == Ok(VlanId::DEFAULT));
        actions.extend(tagged_ports.into_iter().map(Action::Output));
        if !untagged.is_empty() {
            actions.push(Action::StripVlan);
            actions.extend(untagged.into_iter().map(Action::Output));
        }

        if egress.ports().is_empty() {
            actions.clear();
        }
        Ok(Verdict { actions, egress, vlan: Some(vid) })
    }
}

/// Choose the uplink for an unknown destination. The smaller address of source and destination
/// decides, such that both directions of a flow take complementary uplinks.
pub fn tie_break(key: &MatchKey) -> Result<PortNo, PolicyError> {
    if key.dl_src < key.dl_dst {
        Ok(CORE_UPLINK_LOW)
    } else if key.dl_dst < key.dl_src {
        Ok(CORE_UPLINK_HIGH)
    } else {
        Err(PolicyError::DegenerateTieBreak(key.dl_src))
    }
}
