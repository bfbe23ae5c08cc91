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

//! # MAC Learning Table
//!
//! Per-switch mapping of source MAC addresses to the port where they were last seen. Entries are
//! replaced on every observation, and optionally age out after a maximum age.

use crate::controller::types::{MacAddr, PortNo, SwitchId};
use log::*;
use std::collections::{hash_map::Iter, HashMap};
use std::time::{Duration, Instant};

/// Learned location of a MAC address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LearnedEntry {
    /// Port where the address was last seen
    pub port: PortNo,
    /// Time of the last observation
    pub last_update: Instant,
}

/// Result of learning an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearnOutcome {
    /// The address was not known (or its entry had expired)
    New,
    /// The address was known on a different port
    Moved {
        /// Port of the replaced entry
        from: PortNo,
    },
    /// The address was already known on the same port. Only the timestamp is updated.
    Refreshed,
}

impl LearnOutcome {
    /// Returns true if the mapping of the address changed.
    pub fn is_changed(&self) -> bool {
        !matches!(self, Self::Refreshed)
    }
}

/// MAC learning table, keeping one independent table per switch.
#[derive(Debug, Clone, Default)]
pub struct MacLearningTable {
    tables: HashMap<SwitchId, HashMap<MacAddr, LearnedEntry>>,
    /// Entries older than this are considered unknown. `None` means entries never expire.
    max_age: Option<Duration>,
}

impl MacLearningTable {
    /// Create an empty table where entries never expire.
    pub fn new() -> Self {
        Self { tables: HashMap::new(), max_age: None }
    }

    /// Create an empty table where entries expire after `max_age`.
    pub fn with_max_age(max_age: Option<Duration>) -> Self {
        Self { tables: HashMap::new(), max_age: max_age.filter(|d| *d > Duration::from_secs(0)) }
    }

    /// Returns the maximum age of the entries
    pub fn max_age(&self) -> Option<Duration> {
        self.max_age
    }

    /// Record that `mac` can be reached over `port` of `switch`. Any previous entry for the same
    /// switch and address is replaced.
    pub fn learn(
        &mut self,
        switch: SwitchId,
        mac: MacAddr,
        port: PortNo,
        now: Instant,
    ) -> LearnOutcome {
        let max_age = self.max_age;
        let table = self.tables.entry(switch).or_insert_with(HashMap::new);
        let old = table.insert(mac, LearnedEntry { port, last_update: now });
        let outcome = match old {
            Some(e) if is_expired(&e, now, max_age) => LearnOutcome::New,
            Some(e) if e.port == port => LearnOutcome::Refreshed,
            Some(e) => LearnOutcome::Moved { from: e.port },
            None => LearnOutcome::New,
        };
        match outcome {
            LearnOutcome::New => {
                info!("Learned that {:?}, addr: {} can be found over port {}", switch, mac, port)
            }
            LearnOutcome::Moved { from } => {
                info!("{} moved on {:?} from port {} to port {}", mac, switch, from, port)
            }
            LearnOutcome::Refreshed => trace!("Refreshed {} on {:?} port {}", mac, switch, port),
        }
        outcome
    }

    /// Returns the port where `mac` was last seen on `switch`, unless the entry has expired.
    pub fn lookup(&self, switch: SwitchId, mac: MacAddr, now: Instant) -> Option<PortNo> {
        self.tables
            .get(&switch)?
            .get(&mac)
            .filter(|e| !is_expired(e, now, self.max_age))
            .map(|e| e.port)
    }

    /// Returns the raw entry, ignoring the expiration.
    pub fn get_entry(&self, switch: SwitchId, mac: MacAddr) -> Option<&LearnedEntry> {
        self.tables.get(&switch)?.get(&mac)
    }

    /// Remove all expired entries. Returns the number of removed entries.
    pub fn expire(&mut self, now: Instant) -> usize {
        let max_age = self.max_age;
        let mut removed = 0;
        for table in self.tables.values_mut() {
            let before = table.len();
            table.retain(|_, e| !is_expired(e, now, max_age));
            removed += before - table.len();
        }
        if removed > 0 {
            debug!("Expired {} learned entries", removed);
        }
        removed
    }

    /// Iterate over all entries of a switch
    pub fn entries(&self, switch: SwitchId) -> Option<Iter<'_, MacAddr, LearnedEntry>> {
        self.tables.get(&switch).map(|t| t.iter())
    }

    /// Number of entries stored for the switch (including expired ones)
    pub fn len(&self, switch: SwitchId) -> usize {
        self.tables.get(&switch).map(|t| t.len()).unwrap_or(0)
    }

    /// Returns true if nothing is learned for the switch.
    pub fn is_empty(&self, switch: SwitchId) -> bool {
        self.len(switch) == 0
    }

    /// Forget everything learned on the switch
    pub fn remove_switch(&mut self, switch: SwitchId) {
        self.tables.remove(&switch);
    }
}

fn is_expired(entry: &LearnedEntry, now: Instant, max_age: Option<Duration>) -> bool {
    match max_age {
        Some(max_age) => now.saturating_duration_since(entry.last_update) >= max_age,
        None => false,
    }
}
