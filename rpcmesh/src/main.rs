mod cli;

use clap::{Parser, Subcommand};
use rpcmesh_core::logging::init_logging;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "rpcmesh",
    version,
    about = "rpcmesh: client-side service discovery and resilient RPC"
)]
struct Cli {
    /// Path to the rpcmesh config file
    #[arg(long, global = true, default_value = "config/rpcmesh.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate configuration and exit
    Check {
        /// Print errors without hints
        #[arg(short, long, default_value = "false")]
        plain: bool,
    },

    /// Resolve a service name to an endpoint
    Resolve {
        service: String,

        /// Print every healthy instance instead of one pick
        #[arg(long)]
        all: bool,
    },

    /// Invoke a JSON method on a service and print the response
    Call {
        service: String,

        /// HTTP method, e.g. GET or POST
        method: String,

        /// Request path, e.g. /api/v1/judge/result/42
        path: String,

        /// JSON request body
        #[arg(long)]
        data: Option<String>,

        /// Extra request header as KEY=VALUE (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Overall deadline for the call, retries included
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Publish the configured [service], report health until Ctrl-C, then deregister
    Register,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Check { plain } => cli::check(&cli.config, plain),

        Command::Resolve { service, all } => {
            init_logging();
            cli::resolve(&cli.config, &service, all).await
        }

        Command::Call {
            service,
            method,
            path,
            data,
            headers,
            timeout_ms,
        } => {
            init_logging();
            let request = cli::CallRequest {
                service,
                method,
                path,
                data,
                headers,
                timeout_ms,
            };
            cli::call(&cli.config, request).await
        }

        Command::Register => {
            init_logging();
            cli::register(&cli.config).await
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
