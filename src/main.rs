use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use smart_refresh::core::models::Resource;
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;

#[derive(Parser)]
#[command(name = "smart-refresh")]
#[command(author, version, about = "Keep food-sharing marketplace data fresh from the terminal")]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch a resource and print every change
    Watch {
        #[arg(value_enum)]
        resource: Resource,

        /// Polling period in milliseconds (default: per resource)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval_ms: Option<u64>,

        /// Do not poll; refresh only on Enter or when the pause marker is removed
        #[arg(long)]
        silent: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fetch a resource once
    Status {
        #[arg(value_enum)]
        resource: Resource,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Watch {
            resource,
            interval_ms,
            silent,
            json,
        } => {
            init_logging(cli.json_logs);
            cli::watch::run(cli::watch::WatchOptions {
                resource,
                interval_ms,
                silent,
                json,
            })
            .await
        }
        Commands::Status { resource, json } => {
            init_logging(cli.json_logs);
            cli::status::run(resource, json).await
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
    }
}
