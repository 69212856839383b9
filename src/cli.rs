// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines the serve, init, and check subcommands.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "berth")]
#[command(about = "HTTP control plane for a local Docker or Podman engine")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (default: berth.yml in the current directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Address to listen on
        #[arg(short, long)]
        listen: Option<SocketAddr>,

        /// Engine endpoint (unix:///path, tcp://host:port)
        #[arg(short, long)]
        endpoint: Option<String>,
    },

    /// Write a berth.yml template
    Init {
        /// Overwrite an existing berth.yml
        #[arg(short, long)]
        force: bool,
    },

    /// Connect to the engine and print its version
    Check {
        /// Engine endpoint (unix:///path, tcp://host:port)
        #[arg(short, long)]
        endpoint: Option<String>,
    },
}
