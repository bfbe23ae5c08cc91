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

//! Module containing all type definitions

use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Switch Identification (the datapath id of the switch)
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SwitchId(pub u64);

/// Physical port number on a switch
pub type PortNo = u16;

/// # MAC Address
/// Ethernet address, ordered lexicographically over its bytes. The core tie-break relies on this
/// ordering, such that both directions of a flow pick complementary uplinks.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    /// Broadcast address `ff:ff:ff:ff:ff:ff`
    pub const BROADCAST: MacAddr = MacAddr([0xff; 6]);

    /// Create an address from a byte slice. Returns `None` if the slice is shorter than 6 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 6 {
            return None;
        }
        let mut addr = [0u8; 6];
        addr.copy_from_slice(&bytes[..6]);
        Some(Self(addr))
    }

    /// Returns true if the address is the broadcast address
    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// Returns true if the group bit is set. This includes the broadcast address.
    pub fn is_multicast(&self) -> bool {
        self.0[0] & 0x01 != 0
    }

    /// Returns true if the address must be flooded (broadcast or multicast).
    pub fn is_group(&self) -> bool {
        self.is_broadcast() || self.is_multicast()
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", a, b, c, d, e, g)
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddr({})", self)
    }
}

impl FromStr for MacAddr {
    type Err = ParseMacError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut addr = [0u8; 6];
        let mut parts = s.split(|c| c == ':' || c == '-');
        for byte in addr.iter_mut() {
            let part = parts.next().ok_or_else(|| ParseMacError(s.to_string()))?;
            if part.len() != 2 {
                return Err(ParseMacError(s.to_string()));
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| ParseMacError(s.to_string()))?;
        }
        if parts.next().is_some() {
            return Err(ParseMacError(s.to_string()));
        }
        Ok(Self(addr))
    }
}

impl TryFrom<String> for MacAddr {
    type Error = ParseMacError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<MacAddr> for String {
    fn from(mac: MacAddr) -> String {
        mac.to_string()
    }
}

/// Error returned when a string is not a MAC address of the form `aa:bb:cc:dd:ee:ff`
#[derive(Error, Debug, PartialEq, Clone)]
#[error("Invalid MAC address: {0:?}")]
pub struct ParseMacError(pub String);

/// VLAN identifier (12 bit, stored as `u16`)
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VlanId(pub u16);

impl VlanId {
    /// Default VLAN. Ports provisioned with this id send and receive untagged frames.
    pub const DEFAULT: VlanId = VlanId(1);

    /// Returns true if this is the default (untagged) VLAN.
    pub fn is_default(&self) -> bool {
        *self == Self::DEFAULT
    }
}

impl fmt::Display for VlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors of the VLAN domain table
#[derive(Error, Debug, PartialEq, Clone)]
pub enum DomainError {
    /// No port of the switch has been provisioned yet
    #[error("No VLAN is provisioned on switch {0:?}")]
    UnknownSwitch(SwitchId),
    /// The port of the switch has no VLAN assigned
    #[error("Domain lookup failed: no VLAN id for switch {0:?}, port {1}")]
    VlanNotFound(SwitchId, PortNo),
}

/// Errors of the forwarding policy. None of them is fatal: the packet is dropped, and the
/// controller continues with the next event.
#[derive(Error, Debug, PartialEq, Clone)]
pub enum PolicyError {
    /// Domain lookup failed, and there is no safe default to continue with
    #[error("Domain Error: {0}")]
    DomainError(#[from] DomainError),
    /// Source and destination address are equal, which the core tie-break cannot order
    #[error("Cannot break the tie between equal addresses {0}")]
    DegenerateTieBreak(MacAddr),
    /// The role requires a concrete ingress port, but the switch reported none
    #[error("The packet has no ingress port")]
    NoIngressPort,
    /// The packet arrived on a port which the role does not know how to handle
    #[error("Unexpected ingress port {0}")]
    UnexpectedIngress(PortNo),
    /// The number of ports on the switch is unknown
    #[error("Unknown number of ports for switch {0:?}")]
    UnknownPortCount(SwitchId),
}

/// Error during the extraction of a match key out of a frame
#[derive(Error, Debug, PartialEq, Clone)]
pub enum ExtractError {
    /// The frame is too short or otherwise not an Ethernet II frame
    #[error("Cannot parse the Ethernet header: {0}")]
    MalformedEthernet(String),
    /// The frame carries an 802.1Q tag which cannot be parsed
    #[error("Cannot parse the VLAN tag: {0}")]
    MalformedVlan(String),
}

/// Controller Errors
#[derive(Error, Debug, PartialEq)]
pub enum ControllerError {
    /// The switch is not registered with this controller
    #[error("Switch {0:?} is not registered with the controller")]
    UnregisteredSwitch(SwitchId),
    /// The switch is already registered with this controller
    #[error("Switch {0:?} is already registered with the controller")]
    SwitchAlreadyRegistered(SwitchId),
    /// The datapath does not know the switch
    #[error("Switch {0:?} is not known by the datapath")]
    UnknownDatapath(SwitchId),
    /// The message received from the switch cannot be decoded
    #[error("Wire Error: {0}")]
    WireError(#[from] crate::wire::WireError),
    /// The packet cannot be turned into a match key
    #[error("Extraction Error: {0}")]
    ExtractError(#[from] ExtractError),
}
