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

//! # OpenFlow 1.0 wire format
//!
//! Encoding and decoding of the few OpenFlow messages exchanged at the boundary of the controller:
//! `OFPT_PACKET_IN` (switch to controller) and `OFPT_FLOW_MOD` (controller to switch). All other
//! messages are only recognized by their type. The action list of a rule is serialized here, and
//! nowhere else.
//!
//! The match of a rule only covers the ingress port, the Ethernet addresses, and the VLAN id. All
//! other match fields are sent as wildcards. Frames carrying an 802.1ad service tag (`0x88a8`) or
//! a legacy double tag (`0x9100`) are matched on the VLAN id of that outer tag.

use crate::controller::rule::{Action, FlowModCommand, FlowRule, Timeout};
use crate::controller::types::{MacAddr, PortNo, VlanId};
use crate::controller::MatchKey;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use etherparse::{EtherType, Ethernet2Header, SingleVlanHeader};
use std::convert::TryFrom;
use std::net::Ipv4Addr;
use thiserror::Error;

/// OpenFlow protocol version 1.0
pub const OFP_VERSION: u8 = 0x01;
/// Message type of a packet-in
pub const OFPT_PACKET_IN: u8 = 10;
/// Message type of a flow-mod
pub const OFPT_FLOW_MOD: u8 = 14;
/// Port number meaning "no port"
pub const OFPP_NONE: u16 = 0xffff;
/// VLAN id meaning "no VLAN tag"
pub const OFP_VLAN_NONE: u16 = 0xffff;
/// Buffer id meaning "not buffered"
pub const NO_BUFFER: u32 = 0xffff_ffff;
/// Size of `ofp_match`
pub const OFP_MATCH_LEN: usize = 40;
/// Size of `ofp_flow_mod` without any action
pub const OFP_FLOW_MOD_LEN: usize = 72;

const OFP_HEADER_LEN: usize = 8;
const OFP_PACKET_IN_LEN: usize = 18;
/// Fields of `ofp_match` which are written: wildcards, in_port, dl_src, dl_dst and dl_vlan
const OFP_MATCH_USED_LEN: usize = 20;

const OFPFW_IN_PORT: u32 = 1 << 0;
const OFPFW_DL_TYPE: u32 = 1 << 4;
const OFPFW_NW_PROTO: u32 = 1 << 5;
const OFPFW_TP_SRC: u32 = 1 << 6;
const OFPFW_TP_DST: u32 = 1 << 7;
const OFPFW_NW_SRC_ALL: u32 = 32 << 8;
const OFPFW_NW_DST_ALL: u32 = 32 << 14;
const OFPFW_DL_VLAN_PCP: u32 = 1 << 20;
const OFPFW_NW_TOS: u32 = 1 << 21;
/// Fields never matched by the controller
const L2_ONLY_WILDCARDS: u32 = OFPFW_DL_TYPE
    | OFPFW_NW_PROTO
    | OFPFW_TP_SRC
    | OFPFW_TP_DST
    | OFPFW_NW_SRC_ALL
    | OFPFW_NW_DST_ALL
    | OFPFW_DL_VLAN_PCP
    | OFPFW_NW_TOS;

const OFPAT_OUTPUT: u16 = 0;
const OFPAT_SET_VLAN_VID: u16 = 1;
const OFPAT_STRIP_VLAN: u16 = 3;
const OFPAT_SET_DL_DST: u16 = 5;
const OFPAT_SET_NW_DST: u16 = 7;

const OFPFC_ADD: u16 = 0;
const OFPFC_MODIFY: u16 = 1;

/// Errors while decoding or encoding a message
#[derive(Error, Debug, PartialEq, Clone)]
pub enum WireError {
    /// The buffer ends before the message does
    #[error("Message truncated: needs {needed} bytes, but only {available} are available")]
    Truncated {
        /// Number of bytes required
        needed: usize,
        /// Number of bytes present
        available: usize,
    },
    /// Unsupported protocol version
    #[error("Unsupported OpenFlow version {0:#04x}")]
    BadVersion(u8),
    /// Length field of the header (or of an action) is inconsistent
    #[error("Invalid message length {0}")]
    BadLength(usize),
    /// The message does not fit into the 16 bit length field
    #[error("Message of {0} bytes exceeds the maximal OpenFlow message size")]
    TooLong(usize),
    /// Unknown or unsupported action type
    #[error("Unsupported action type {0}")]
    BadAction(u16),
    /// Unknown or unsupported flow-mod command
    #[error("Unsupported flow mod command {0}")]
    BadCommand(u16),
    /// The Ethernet frame cannot be built
    #[error("Cannot build the frame: {0}")]
    Frame(String),
}

/// Reason why the switch sent the packet to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketInReason {
    /// No matching flow
    NoMatch,
    /// Action explicitly output to the controller
    Action,
    /// Any other reason code
    Other(u8),
}

/// Packet forwarded to the controller by a switch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketIn {
    /// Buffer on the switch holding the packet, if it was buffered
    pub buffer_id: Option<u32>,
    /// Length of the entire frame on the switch
    pub total_len: u16,
    /// Port on which the frame was received, if known
    pub in_port: Option<PortNo>,
    /// Reason of the packet-in
    pub reason: PacketInReason,
    /// The (possibly truncated) Ethernet frame
    pub data: Vec<u8>,
}

/// Decoded OpenFlow message
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// `OFPT_PACKET_IN`
    PacketIn(PacketIn),
    /// `OFPT_FLOW_MOD`
    FlowMod(FlowRule),
    /// Any other message, of which only the type is known.
    Other(u8),
}

/// Read the message type out of the header, without decoding the body.
pub fn message_type(buffer: &[u8]) -> Result<u8, WireError> {
    decode_header(buffer).map(|(_, msg_type)| msg_type)
}

/// Decode a single OpenFlow message. Bytes after the end of the message are ignored.
pub fn decode_message(buffer: &[u8]) -> Result<Message, WireError> {
    let (len, msg_type) = decode_header(buffer)?;
    let mut body = &buffer[OFP_HEADER_LEN..len];
    match msg_type {
        OFPT_PACKET_IN => decode_packet_in(&mut body).map(Message::PacketIn),
        OFPT_FLOW_MOD => decode_flow_mod(&mut body).map(Message::FlowMod),
        t => Ok(Message::Other(t)),
    }
}

/// Returns the total length of the message and its type.
fn decode_header(buffer: &[u8]) -> Result<(usize, u8), WireError> {
    let mut buf = buffer;
    ensure(buf, OFP_HEADER_LEN)?;
    let version = buf.get_u8();
    if version != OFP_VERSION {
        return Err(WireError::BadVersion(version));
    }
    let msg_type = buf.get_u8();
    let len = buf.get_u16() as usize;
    let _xid = buf.get_u32();
    if len < OFP_HEADER_LEN {
        return Err(WireError::BadLength(len));
    }
    if len > buffer.len() {
        return Err(WireError::Truncated { needed: len, available: buffer.len() });
    }
    Ok((len, msg_type))
}

/// Check that at least `n` bytes remain in `buf`.
fn ensure(buf: &[u8], n: usize) -> Result<(), WireError> {
    if buf.len() < n {
        Err(WireError::Truncated { needed: n, available: buf.len() })
    } else {
        Ok(())
    }
}

fn get_mac<B: Buf>(buf: &mut B) -> MacAddr {
    let mut addr = [0u8; 6];
    buf.copy_to_slice(&mut addr);
    MacAddr(addr)
}

fn decode_packet_in(buf: &mut &[u8]) -> Result<PacketIn, WireError> {
    ensure(buf, OFP_PACKET_IN_LEN - OFP_HEADER_LEN)?;
    let buffer_id = buf.get_u32();
    let total_len = buf.get_u16();
    let in_port = buf.get_u16();
    let reason = match buf.get_u8() {
        0 => PacketInReason::NoMatch,
        1 => PacketInReason::Action,
        x => PacketInReason::Other(x),
    };
    buf.advance(1);
    Ok(PacketIn {
        buffer_id: if buffer_id == NO_BUFFER { None } else { Some(buffer_id) },
        total_len,
        in_port: if in_port == OFPP_NONE { None } else { Some(in_port) },
        reason,
        data: buf.to_vec(),
    })
}

fn decode_flow_mod(buf: &mut &[u8]) -> Result<FlowRule, WireError> {
    ensure(buf, OFP_FLOW_MOD_LEN - OFP_HEADER_LEN)?;

    // ofp_match
    let wildcards = buf.get_u32();
    let in_port = buf.get_u16();
    let dl_src = get_mac(buf);
    let dl_dst = get_mac(buf);
    let dl_vlan = buf.get_u16();
    // dl_vlan_pcp, pad, dl_type, nw_tos, nw_proto, pad, nw_src, nw_dst, tp_src, tp_dst
    buf.advance(OFP_MATCH_LEN - OFP_MATCH_USED_LEN);
    let key = MatchKey {
        in_port: if wildcards & OFPFW_IN_PORT != 0 { None } else { Some(in_port) },
        dl_src,
        dl_dst,
        dl_vlan: if dl_vlan == OFP_VLAN_NONE { None } else { Some(VlanId(dl_vlan)) },
    };

    let _cookie = buf.get_u64();
    let command = match buf.get_u16() {
        OFPFC_ADD => FlowModCommand::Add,
        OFPFC_MODIFY => FlowModCommand::Modify,
        c => return Err(WireError::BadCommand(c)),
    };
    let idle_timeout = timeout(buf.get_u16());
    let hard_timeout = timeout(buf.get_u16());
    let priority = buf.get_u16();
    let buffer_id = buf.get_u32();
    let _out_port = buf.get_u16();
    let _flags = buf.get_u16();

    let mut actions = Vec::new();
    while buf.has_remaining() {
        ensure(buf, 4)?;
        let action_type = buf.get_u16();
        let len = buf.get_u16() as usize;
        if len < 8 || len % 8 != 0 {
            return Err(WireError::BadLength(len));
        }
        ensure(buf, len - 4)?;
        let rest: &[u8] = *buf;
        let (mut body, rest) = rest.split_at(len - 4);
        *buf = rest;
        actions.push(match action_type {
            OFPAT_OUTPUT => Action::Output(body.get_u16()),
            OFPAT_SET_VLAN_VID => Action::SetVlanId(VlanId(body.get_u16())),
            OFPAT_STRIP_VLAN => Action::StripVlan,
            OFPAT_SET_DL_DST => {
                ensure(body, 6)?;
                Action::SetDlDst(get_mac(&mut body))
            }
            OFPAT_SET_NW_DST => Action::SetNwDst(Ipv4Addr::from(body.get_u32())),
            t => return Err(WireError::BadAction(t)),
        });
    }

    Ok(FlowRule {
        key,
        actions,
        buffer_id: if buffer_id == NO_BUFFER { None } else { Some(buffer_id) },
        command,
        priority,
        idle_timeout,
        hard_timeout,
    })
}

fn timeout(secs: u16) -> Timeout {
    if secs == 0 {
        Timeout::Permanent
    } else {
        Timeout::ExpiresAfter(secs)
    }
}

/// Encode the rule as an `OFPT_FLOW_MOD` message.
pub fn encode_flow_mod(rule: &FlowRule, xid: u32) -> Result<Bytes, WireError> {
    let mut msg = start_message(OFPT_FLOW_MOD, xid, OFP_FLOW_MOD_LEN + 16 * rule.actions.len());

    // ofp_match
    let wildcards = L2_ONLY_WILDCARDS | if rule.key.in_port.is_none() { OFPFW_IN_PORT } else { 0 };
    msg.put_u32(wildcards);
    msg.put_u16(rule.key.in_port.unwrap_or(OFPP_NONE));
    msg.put_slice(&rule.key.dl_src.0);
    msg.put_slice(&rule.key.dl_dst.0);
    msg.put_u16(rule.key.dl_vlan.map(|v| v.0).unwrap_or(OFP_VLAN_NONE));
    msg.put_bytes(0, OFP_MATCH_LEN - OFP_MATCH_USED_LEN);

    // flow mod fields
    msg.put_u64(0);
    msg.put_u16(match rule.command {
        FlowModCommand::Add => OFPFC_ADD,
        FlowModCommand::Modify => OFPFC_MODIFY,
    });
    msg.put_u16(rule.idle_timeout.as_secs());
    msg.put_u16(rule.hard_timeout.as_secs());
    msg.put_u16(rule.priority);
    msg.put_u32(rule.buffer_id.unwrap_or(NO_BUFFER));
    msg.put_u16(OFPP_NONE);
    msg.put_u16(0);

    for action in rule.actions.iter() {
        encode_action(action, &mut msg);
    }

    finish_message(msg)
}

fn encode_action(action: &Action, buf: &mut BytesMut) {
    match action {
        Action::Output(port) => {
            buf.put_u16(OFPAT_OUTPUT);
            buf.put_u16(8);
            buf.put_u16(*port);
            // max_len is only relevant when sending to the controller
            buf.put_u16(0);
        }
        Action::SetVlanId(vid) => {
            buf.put_u16(OFPAT_SET_VLAN_VID);
            buf.put_u16(8);
            buf.put_u16(vid.0);
            buf.put_bytes(0, 2);
        }
        Action::StripVlan => {
            buf.put_u16(OFPAT_STRIP_VLAN);
            buf.put_u16(8);
            buf.put_bytes(0, 4);
        }
        Action::SetDlDst(mac) => {
            buf.put_u16(OFPAT_SET_DL_DST);
            buf.put_u16(16);
            buf.put_slice(&mac.0);
            buf.put_bytes(0, 6);
        }
        Action::SetNwDst(addr) => {
            buf.put_u16(OFPAT_SET_NW_DST);
            buf.put_u16(8);
            buf.put_u32(u32::from(*addr));
        }
    }
}

/// Encode an `OFPT_PACKET_IN` message, as the switch would send it.
pub fn encode_packet_in(
    buffer_id: Option<u32>,
    in_port: Option<PortNo>,
    reason: PacketInReason,
    frame: &[u8],
    xid: u32,
) -> Result<Bytes, WireError> {
    let total_len = u16::try_from(frame.len()).map_err(|_| WireError::TooLong(frame.len()))?;
    let mut msg = start_message(OFPT_PACKET_IN, xid, OFP_PACKET_IN_LEN + frame.len());
    msg.put_u32(buffer_id.unwrap_or(NO_BUFFER));
    msg.put_u16(total_len);
    msg.put_u16(in_port.unwrap_or(OFPP_NONE));
    msg.put_u8(match reason {
        PacketInReason::NoMatch => 0,
        PacketInReason::Action => 1,
        PacketInReason::Other(x) => x,
    });
    msg.put_u8(0);
    msg.put_slice(frame);
    finish_message(msg)
}

/// Write the header. The length is filled in by [`finish_message`].
fn start_message(msg_type: u8, xid: u32, capacity: usize) -> BytesMut {
    let mut msg = BytesMut::with_capacity(capacity);
    msg.put_u8(OFP_VERSION);
    msg.put_u8(msg_type);
    msg.put_u16(0);
    msg.put_u32(xid);
    msg
}

fn finish_message(mut msg: BytesMut) -> Result<Bytes, WireError> {
    let len = u16::try_from(msg.len()).map_err(|_| WireError::TooLong(msg.len()))?;
    msg[2..4].copy_from_slice(&len.to_be_bytes());
    Ok(msg.freeze())
}

/// Build an Ethernet II frame, with an 802.1Q tag if `vlan` is set.
pub fn ethernet_frame(
    src: MacAddr,
    dst: MacAddr,
    vlan: Option<VlanId>,
    ether_type: u16,
    payload: &[u8],
) -> Result<Bytes, WireError> {
    let mut frame = BytesMut::with_capacity(18 + payload.len()).writer();
    let outer_type = if vlan.is_some() { EtherType::VlanTaggedFrame as u16 } else { ether_type };
    Ethernet2Header { source: src.0, destination: dst.0, ether_type: outer_type }
        .write(&mut frame)
        .map_err(|e| WireError::Frame(format!("{:?}", e)))?;
    if let Some(vid) = vlan {
        SingleVlanHeader {
            priority_code_point: 0,
            drop_eligible_indicator: false,
            vlan_identifier: vid.0,
            ether_type,
        }
        .write(&mut frame)
        .map_err(|e| WireError::Frame(format!("{:?}", e)))?;
    }
    let mut frame = frame.into_inner();
    frame.put_slice(payload);
    Ok(frame.freeze())
}
