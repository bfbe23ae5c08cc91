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

//! # Switch Controller
//!
//! The [`Controller`] owns the registration set, the MAC learning table, the VLAN domain table and
//! the forwarding policy. Each packet-in is handled to completion before the next one: decode,
//! decide, install the forward rule (and the tap rule in the mirroring role), learn the source
//! address, and finally install the reverse rule if a new source was learned.

use crate::config::ControllerConfig;
use crate::controller::mac_table::{LearnOutcome, MacLearningTable};
use crate::controller::match_key::MatchKey;
use crate::controller::policy::{Egress, ForwardingPolicy, PolicyContext, Role, Verdict};
use crate::controller::rule::{Action, FlowModCommand, FlowRule, RuleInstaller, Timeout};
use crate::controller::types::{ControllerError, PolicyError, PortNo, SwitchId, VlanId};
use crate::controller::vlan_table::VlanDomainTable;
use crate::datapath::Datapath;
use crate::wire::{self, Message, WireError};
use log::*;
use std::collections::HashMap;
use std::time::Instant;

/// # Controller
///
/// Decision core for all switches attached to it. All switches share the same role, and the same
/// tables (which are keyed by the switch).
#[derive(Debug, Clone)]
pub struct Controller {
    config: ControllerConfig,
    switches: HashMap<SwitchId, u16>,
    macs: MacLearningTable,
    vlans: VlanDomainTable,
    policy: ForwardingPolicy,
    installer: RuleInstaller,
}

impl Controller {
    /// Create a new controller without any switch.
    pub fn new(config: ControllerConfig) -> Self {
        let expiration = config.expiration();
        Self {
            switches: HashMap::new(),
            macs: MacLearningTable::with_max_age(Some(expiration)),
            vlans: VlanDomainTable::new(),
            policy: ForwardingPolicy::new(config.role),
            installer: RuleInstaller::new(expiration),
            config,
        }
    }

    /// Attach a switch to the controller. The number of ports is queried from the datapath.
    pub fn add_switch<D: Datapath + ?Sized>(
        &mut self,
        datapath: &D,
        switch: SwitchId,
    ) -> Result<(), ControllerError> {
        if self.switches.contains_key(&switch) {
            return Err(ControllerError::SwitchAlreadyRegistered(switch));
        }
        let num_ports = datapath.num_ports(switch).ok_or(ControllerError::UnknownDatapath(switch))?;
        info!("{} controller: attach {:?} with {} ports", self.policy.role(), switch, num_ports);
        self.switches.insert(switch, num_ports);
        Ok(())
    }

    /// Detach a switch. All addresses learned on the switch are forgotten, but its VLAN
    /// provisioning is kept.
    pub fn remove_switch(&mut self, switch: SwitchId) -> Result<(), ControllerError> {
        self.switches.remove(&switch).ok_or(ControllerError::UnregisteredSwitch(switch))?;
        self.macs.remove_switch(switch);
        info!("{} controller: detach {:?}", self.policy.role(), switch);
        Ok(())
    }

    /// Returns true if the switch is attached to this controller.
    pub fn is_registered(&self, switch: SwitchId) -> bool {
        self.switches.contains_key(&switch)
    }

    /// Returns the number of ports of an attached switch
    pub fn num_ports(&self, switch: SwitchId) -> Option<u16> {
        self.switches.get(&switch).copied()
    }

    /// Returns an iterator over all attached switches
    pub fn switches(&self) -> impl Iterator<Item = SwitchId> + '_ {
        self.switches.keys().copied()
    }

    /// Provision the VLAN of a port. This may be done before the switch is attached. Returns the
    /// previously provisioned VLAN.
    pub fn set_vlan_id(&mut self, switch: SwitchId, port: PortNo, vid: VlanId) -> Option<VlanId> {
        self.vlans.set_vlan_id(switch, port, vid)
    }

    /// Returns the configuration
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Returns the role of the controller
    pub fn role(&self) -> Role {
        self.policy.role()
    }

    /// Returns the MAC learning table
    pub fn mac_table(&self) -> &MacLearningTable {
        &self.macs
    }

    /// Returns the VLAN domain table
    pub fn vlan_table(&self) -> &VlanDomainTable {
        &self.vlans
    }

    /// Remove all learned addresses which are expired by now. Returns the number of removed
    /// entries.
    pub fn expire(&mut self, now: Instant) -> usize {
        self.macs.expire(now)
    }

    /// Handle a message received from `switch`. Returns the number of installed rules (0, 1 or 2).
    ///
    /// Messages other than packet-ins are ignored. Errors are only returned if the switch is not
    /// attached, or if the message cannot be decoded. In both cases, the state of the controller
    /// is unchanged. Errors of the forwarding policy are logged, and no forward rule is installed.
    pub fn on_packet_in<D: Datapath + ?Sized>(
        &mut self,
        datapath: &mut D,
        switch: SwitchId,
        buffer: &[u8],
    ) -> Result<usize, ControllerError> {
        self.on_packet_in_at(datapath, switch, buffer, Instant::now())
    }

    /// Same as [`Controller::on_packet_in`], but the event happens at time `now`.
    pub fn on_packet_in_at<D: Datapath + ?Sized>(
        &mut self,
        datapath: &mut D,
        switch: SwitchId,
        buffer: &[u8],
        now: Instant,
    ) -> Result<usize, ControllerError> {
        let num_ports = match self.switches.get(&switch) {
            Some(n) => *n,
            None => {
                error!("Packet from {:?}, which is not attached to this controller!", switch);
                return Err(ControllerError::UnregisteredSwitch(switch));
            }
        };

        let packet = match wire::decode_message(buffer)? {
            Message::PacketIn(packet) => packet,
            Message::FlowMod(_) => {
                debug!("Ignore flow mod sent by {:?}", switch);
                return Ok(0);
            }
            Message::Other(t) => {
                trace!("Ignore message of type {} from {:?}", t, switch);
                return Ok(0);
            }
        };
        let key = MatchKey::extract(&packet.data, packet.in_port)?;
        debug!("Packet-in on {:?}: {}", switch, key);

        let mut num_rules = 0;

        // forward rule
        let ctx = PolicyContext { switch, num_ports, macs: &self.macs, vlans: &self.vlans, now };
        let verdict = match self.policy.decide(&ctx, &key) {
            Ok(verdict) => Some(verdict),
            Err(PolicyError::DomainError(e)) => {
                warn!("{} controller on {:?}: {}", self.policy.role(), switch, e);
                None
            }
            Err(e) => {
                error!("{} controller on {:?}: {}; drop the packet", self.policy.role(), switch, e);
                None
            }
        };
        if let Some(verdict) = verdict.as_ref().filter(|v| !v.actions.is_empty()) {
            let result = self.installer.install(
                datapath,
                switch,
                key,
                packet.buffer_id,
                FlowModCommand::Add,
                verdict.actions.clone(),
                Timeout::Permanent,
                Timeout::Permanent,
            );
            num_rules += self.count_installed(switch, result);
        }

        // tap rule
        if self.policy.role() == Role::Mirroring {
            num_rules += self.install_tap(datapath, switch, &key);
        }

        // learn the source and install the reverse rule
        let in_port = match key.in_port {
            Some(p) => p,
            None => return Ok(num_rules),
        };
        let outcome = self.macs.learn(switch, key.dl_src, in_port, now);
        if let Some(verdict) = verdict {
            if self.reverse_rule_wanted(outcome, in_port, &key, &verdict) {
                let reverse = key.reversed(verdict.egress.unicast());
                let result = self.installer.install(
                    datapath,
                    switch,
                    reverse,
                    None,
                    self.policy.role().reverse_command(),
                    vec![Action::Output(in_port)],
                    Timeout::Permanent,
                    Timeout::Permanent,
                );
                num_rules += self.count_installed(switch, result);
            }
        }

        Ok(num_rules)
    }

    fn reverse_rule_wanted(
        &self,
        outcome: LearnOutcome,
        in_port: PortNo,
        key: &MatchKey,
        verdict: &Verdict,
    ) -> bool {
        outcome.is_changed()
            && self.policy.role().reverse_rule_allowed(in_port)
            && !key.dl_dst.is_group()
            && verdict.egress != Egress::Filter
    }

    /// Install the tap rule. Returns the number of installed rules.
    ///
    /// The tap rule has the same match and priority as the forward rule, so it takes its place in
    /// the flow table of the switch: matching traffic is redirected to the inspection port.
    fn install_tap<D: Datapath + ?Sized>(
        &self,
        datapath: &mut D,
        switch: SwitchId,
        key: &MatchKey,
    ) -> usize {
        match self.config.mirror.tap_rule(&self.vlans, switch, key) {
            Some(actions) => {
                let result = self.installer.install(
                    datapath,
                    switch,
                    *key,
                    None,
                    FlowModCommand::Add,
                    actions,
                    Timeout::Permanent,
                    Timeout::Permanent,
                );
                self.count_installed(switch, result)
            }
            None => 0,
        }
    }

    fn count_installed(&self, switch: SwitchId, result: Result<FlowRule, WireError>) -> usize {
        match result {
            Ok(_) => 1,
            Err(e) => {
                let role = self.policy.role();
                error!("{} controller on {:?}: cannot encode rule: {}", role, switch, e);
                0
            }
        }
    }
}
