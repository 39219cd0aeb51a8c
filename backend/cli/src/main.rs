mod output;
mod remote;
mod serve;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use parley_acp::DEFAULT_SESSION_TAG;

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Parley: agents that discover each other and delegate tasks")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an agent gateway
    Serve(serve::ServeArgs),
    /// Print the descriptor an agent publishes
    Describe {
        /// Base URL of the agent
        url: String,
    },
    /// Send one task to an agent and print its reply
    Send {
        /// Base URL of the agent
        url: String,
        /// Task text
        message: String,
        /// Session id to send the task under
        #[arg(short, long, default_value = DEFAULT_SESSION_TAG)]
        session: String,
    },
    /// List the peers an agent knows about
    Peers {
        /// Base URL of the agent
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => serve::run_server(args).await?,
        Commands::Describe { url } => remote::describe(&url).await?,
        Commands::Send {
            url,
            message,
            session,
        } => remote::send(&url, &message, &session).await?,
        Commands::Peers { url } => remote::peers(&url).await?,
    }

    Ok(())
}

/// `$PARLEY_CONFIG_DIR/agent.yaml`, else `~/.parley/agent.yaml`.
fn default_config_path() -> PathBuf {
    parley_config::config_file_path(&parley_config::config_dir())
}
