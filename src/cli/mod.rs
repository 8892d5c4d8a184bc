//! CLI command handlers
//!
//! Helpers shared by the fleetwatch subcommands. Simulated activity lives in
//! [`simulate`]; it only talks to the engine through its public producer API.

pub mod simulate;

use serde::Serialize;

/// Pretty-print a view as JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
