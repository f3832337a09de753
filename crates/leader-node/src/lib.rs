//! Leader Node - runs one instance of a scaled-out job service election
//!
//! Wires a record store, a [`leader_election::MessagingGate`] and a
//! [`leader_election::Coordinator`] from a TOML file plus flags.

pub mod cli;
pub mod config;
pub mod runner;
pub mod telemetry;

pub use cli::{Cli, Command, LogFormat, RunArgs};
pub use config::{NodeConfig, NodeSection, StoreKind};
pub use runner::{build_store, run_until, status, Node};
