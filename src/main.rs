use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use secondeye::api::ApiServer;
use secondeye::{AudioClip, Config, Frame, Orchestrator, ProcessRequest};

/// SecondEye - spoken visual assistance from camera frames
#[derive(Parser)]
#[command(name = "secondeye", version, about)]
struct Cli {
    /// Port to listen on (overrides SECONDEYE_API_PORT and the config file)
    #[arg(long)]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API server (default)
    Serve,
    /// Run one request on local files and print the result as JSON
    Process {
        /// Recorded question
        #[arg(long)]
        audio: PathBuf,
        /// Camera frame, oldest first (repeatable)
        #[arg(long = "frame")]
        frames: Vec<PathBuf>,
        /// Where to write the spoken answer
        #[arg(short, long, default_value = "response.mp3")]
        output: PathBuf,
        /// Seconds quoted when the target is not found
        #[arg(long)]
        max_search_duration: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,secondeye=info",
        1 => "info,secondeye=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;
    tracing::debug!(?config, "loaded configuration");

    let orchestrator = Arc::new(Orchestrator::from_config(&config)?);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let port = cli.port.unwrap_or(config.api_server.port);
            tracing::info!(port, "starting secondeye");
            ApiServer::new(orchestrator, port).run().await?;
        }
        Command::Process {
            audio,
            frames,
            output,
            max_search_duration,
        } => {
            let audio = AudioClip::from_path(&audio).await?;
            let mut loaded = Vec::with_capacity(frames.len());
            for path in &frames {
                loaded.push(Frame::from_path(path).await?);
            }

            let result = orchestrator
                .process(ProcessRequest {
                    audio,
                    frames: loaded,
                    output,
                    max_search_duration,
                })
                .await?;

            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
