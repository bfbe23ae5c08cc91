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

//! Scenario files, replayed against a controller with an in-memory datapath.

use flowctl::config::{clamped_secs, ControllerConfig};
use flowctl::controller::{
    printer, Controller, FlowRule, MacAddr, PortNo, Role, SwitchId, VlanId,
};
use flowctl::datapath::RecordingDatapath;
use flowctl::wire::{self, PacketInReason};
use flowctl::Error;
use log::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Instant;

/// Switch attached to the datapath
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSwitch {
    pub id: SwitchId,
    pub ports: u16,
    /// If false, the switch is only known to the datapath, but never attached to the controller.
    #[serde(default = "default_attached")]
    pub attached: bool,
    /// VLAN provisioning of the ports
    #[serde(default)]
    pub vlans: BTreeMap<PortNo, VlanId>,
}

fn default_attached() -> bool {
    true
}

/// Packet-in sent by a switch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioEvent {
    pub switch: SwitchId,
    pub in_port: Option<PortNo>,
    pub src: MacAddr,
    pub dst: MacAddr,
    #[serde(default)]
    pub vlan: Option<VlanId>,
    /// Seconds since the start of the scenario
    #[serde(default)]
    pub at: f64,
}

/// Complete scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub controller: ControllerConfig,
    pub switches: Vec<ScenarioSwitch>,
    pub events: Vec<ScenarioEvent>,
}

/// Rules installed for a single event
#[derive(Debug, Clone)]
pub struct EventOutcome {
    pub event: ScenarioEvent,
    pub result: Result<Vec<FlowRule>, String>,
}

impl Scenario {
    /// Read the scenario from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Two-port flat switch: a broadcast from the uplink, and the reply.
    pub fn two_port_demo() -> Self {
        let a = MacAddr([0xaa; 6]);
        let b = MacAddr([0xbb; 6]);
        let s = SwitchId(1);
        Self {
            controller: ControllerConfig::new(Role::Flat),
            switches: vec![ScenarioSwitch {
                id: s,
                ports: 2,
                attached: true,
                vlans: BTreeMap::new(),
            }],
            events: vec![
                ScenarioEvent {
                    switch: s,
                    in_port: Some(0),
                    src: a,
                    dst: MacAddr::BROADCAST,
                    vlan: None,
                    at: 0.0,
                },
                ScenarioEvent { switch: s, in_port: Some(1), src: b, dst: a, vlan: None, at: 1.0 },
            ],
        }
    }

    /// Replay all events. Returns the controller after the last event, and the rules installed
    /// for each event.
    pub fn replay(&self) -> Result<(Controller, Vec<EventOutcome>), Error> {
        let mut datapath = RecordingDatapath::new();
        let mut controller = Controller::new(self.controller.clone());

        for switch in self.switches.iter() {
            datapath.add_switch(switch.id, switch.ports);
            for (port, vid) in switch.vlans.iter() {
                controller.set_vlan_id(switch.id, *port, *vid);
            }
            if switch.attached {
                controller.add_switch(&datapath, switch.id)?;
            }
        }

        let start = Instant::now();
        let mut outcomes = Vec::with_capacity(self.events.len());
        for (xid, event) in self.events.iter().enumerate() {
            let frame = wire::ethernet_frame(event.src, event.dst, event.vlan, 0x0800, &[0; 46])?;
            let message = wire::encode_packet_in(
                None,
                event.in_port,
                PacketInReason::NoMatch,
                &frame,
                xid as u32,
            )?;
            let now = start + clamped_secs(event.at);
            let result = controller
                .on_packet_in_at(&mut datapath, event.switch, &message, now)
                .map(|_| datapath.take_installed(event.switch))
                .map_err(|e| e.to_string());
            outcomes.push(EventOutcome { event: event.clone(), result });
        }

        if datapath.num_rejected() > 0 {
            warn!("{} flow mods did not decode to their rule", datapath.num_rejected());
        }

        Ok((controller, outcomes))
    }
}

/// Print the outcome of a replay
pub fn print_outcomes(controller: &Controller, outcomes: &[EventOutcome]) {
    for (i, outcome) in outcomes.iter().enumerate() {
        let e = &outcome.event;
        println!(
            "[{}] {:?} port {}: {} -> {}{}",
            i,
            e.switch,
            e.in_port.map(|p| p.to_string()).unwrap_or_else(|| "*".to_string()),
            e.src,
            e.dst,
            e.vlan.map(|v| format!(" (vlan {})", v)).unwrap_or_default(),
        );
        match &outcome.result {
            Ok(rules) if rules.is_empty() => println!("    no rule installed"),
            Ok(rules) => {
                for rule in rules {
                    println!("    {}", printer::flow_rule(rule));
                }
            }
            Err(e) => println!("    rejected: {}", e),
        }
    }
    let mut switches: Vec<SwitchId> = controller.switches().collect();
    switches.sort();
    for switch in switches {
        printer::print_switch_state(controller.mac_table(), controller.vlan_table(), switch);
    }
}
