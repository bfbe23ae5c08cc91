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

//! Module containing all error types

use crate::controller::ControllerError;
use crate::wire::WireError;
use thiserror::Error;

/// Main error type
#[derive(Debug, Error)]
pub enum Error {
    /// Error propagated from the controller
    #[error("Controller Error: {0}")]
    ControllerError(#[from] ControllerError),
    /// Malformed OpenFlow message
    #[error("Wire Error: {0}")]
    WireError(#[from] WireError),
    /// Invalid configuration or scenario file
    #[error("Json Error: {0}")]
    JsonError(#[from] serde_json::Error),
    /// Cannot read a file
    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),
}
