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

use clap::{Parser, Subcommand};
use log::*;
use std::error::Error;

mod scenario;
use scenario::*;

fn main() -> Result<(), Box<dyn Error>> {
    // run clap
    let args = CommandLineArguments::parse();

    // initialize the env logger
    pretty_env_logger::init();

    let scenario = match args.cmd {
        MainCommand::Replay { scenario_file } => {
            info!("Reading the scenario from {}", scenario_file);
            Scenario::from_file(&scenario_file)?
        }
        MainCommand::Demo => Scenario::two_port_demo(),
    };

    info!(
        "Replaying {} packet-ins on {} switches ({} role)",
        scenario.events.len(),
        scenario.switches.len(),
        scenario.controller.role
    );
    let (controller, outcomes) = scenario.replay()?;
    print_outcomes(&controller, &outcomes);

    if args.summary {
        let installed: usize =
            outcomes.iter().filter_map(|o| o.result.as_ref().ok()).map(|r| r.len()).sum();
        let rejected = outcomes.iter().filter(|o| o.result.is_err()).count();
        println!(
            "{} events, {} rules installed, {} events rejected",
            outcomes.len(),
            installed,
            rejected
        );
    }

    Ok(())
}

#[derive(Parser, Debug)]
#[clap(name = "Packet-In Replay (Binary)", author = "Tibor Schneider")]
struct CommandLineArguments {
    /// Print the number of installed rules at the end
    #[clap(short = 's', long)]
    summary: bool,
    /// Action to perform
    #[clap(subcommand)]
    cmd: MainCommand,
}

#[derive(Subcommand, Debug)]
enum MainCommand {
    /// Replay a scenario file (JSON)
    #[clap(name = "replay")]
    Replay {
        /// Path to the scenario file
        scenario_file: String,
    },
    /// Replay the built-in two-port scenario
    #[clap(name = "demo")]
    Demo,
}
