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

//! # Controller Configuration
//!
//! The configuration of a controller is read from JSON:
//!
//! ```json
//! {
//!     "role": "vlan-scoped",
//!     "expiration_time": 30.0,
//!     "mirror": { "vlan": 99, "mac": "00:00:00:00:00:09", "ip": "10.1.1.5" }
//! }
//! ```
//!
//! Only `role` is required. An `expiration_time` of `0` (the default) installs permanent rules
//! and disables aging of learned addresses.

use crate::controller::{MirrorTap, Role};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest expiration time (in seconds). Larger values are clamped.
pub const MAX_EXPIRATION_SECS: f64 = u32::MAX as f64;

/// Configuration of a single controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Role of all switches attached to the controller
    pub role: Role,
    /// Time in seconds after which learned addresses and installed rules expire. `0` means never.
    #[serde(default)]
    pub expiration_time: f64,
    /// Inspection device, used by the mirroring role
    #[serde(default)]
    pub mirror: MirrorTap,
}

impl ControllerConfig {
    /// Configuration with permanent rules and the default inspection device
    pub fn new(role: Role) -> Self {
        Self { role, expiration_time: 0.0, mirror: MirrorTap::default() }
    }

    /// Set the expiration time (in seconds)
    pub fn with_expiration(mut self, expiration_time: f64) -> Self {
        self.expiration_time = expiration_time;
        self
    }

    /// Parse the configuration from a JSON string
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Returns the expiration time. Negative or invalid values are treated as `0`, and values above
    /// [`MAX_EXPIRATION_SECS`] are clamped.
    pub fn expiration(&self) -> Duration {
        clamped_secs(self.expiration_time)
    }
}

/// Convert a number of seconds into a duration without panicking. `NaN` and negative values
/// become zero, and everything (including infinity) is capped at [`MAX_EXPIRATION_SECS`].
pub fn clamped_secs(secs: f64) -> Duration {
    if secs > 0.0 {
        Duration::from_secs_f64(secs.min(MAX_EXPIRATION_SECS))
    } else {
        Duration::from_secs(0)
    }
}
