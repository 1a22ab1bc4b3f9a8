//! CLI module for the HBnB storage tool
//!
//! Bootstraps the configured engine and inspects what it holds:
//! - `stats`: entity counts per class
//! - `all`: every entity as JSON, optionally for one class
//! - `show`: a single entity

pub mod commands;

use clap::{Parser, Subcommand};

/// HBnB storage - inspect the configured storage engine
#[derive(Parser)]
#[command(name = "hbnb-storage")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print the number of stored entities per class
    Stats,

    /// Print stored entities as JSON keyed by "<Class>.<id>"
    All {
        /// Only entities of this class
        #[arg(long)]
        class: Option<String>,
    },

    /// Print one entity as JSON
    Show {
        /// Class name, e.g. State
        class: String,
        /// Entity id
        id: String,
    },
}
