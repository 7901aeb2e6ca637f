mod commands;
mod util;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bento", version, about = "Bento CLI: score a day of food logs locally or through the analysis API")]
struct Cli {
    /// API base URL
    #[arg(long, env = "BENTO_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API health
    Health,
    /// Send a day payload to the API for a full analysis
    Analyze {
        /// Payload file (reads stdin when omitted)
        #[arg(long)]
        file: Option<PathBuf>,
        /// Print compact JSON instead of pretty-printed
        #[arg(long)]
        raw: bool,
    },
    /// Normalize and score a payload locally without calling the API
    Score(commands::score::ScoreArgs),
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let code = match cli.command {
        Commands::Health => commands::health::run(&cli.api_url).await,
        Commands::Analyze { file, raw } => {
            commands::analyze::run(&cli.api_url, file.as_deref(), raw).await
        }
        Commands::Score(args) => commands::score::run(args),
    };

    std::process::exit(code);
}
