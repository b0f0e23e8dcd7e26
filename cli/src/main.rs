use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "tinywins")]
#[command(about = "TinyWins auth shell: sign in, inspect, and clear the local session", long_about = None)]
struct Cli {
    /// Path to the provisioning outputs file
    #[arg(long = "config", default_value = "amplify_outputs.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in with Google or with a username and password
    Login {
        /// Sign in with a username/password instead of Google
        #[arg(long)]
        username: Option<String>,

        /// Use the dev-sandbox redirect proxy instead of the native scheme
        #[arg(long, default_value_t = false)]
        sandbox: bool,
    },
    /// Clear the local session
    Logout,
    /// Show the current session state
    Status,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Login { username, sandbox } => {
            commands::login::handle_login(&cli.config, username, sandbox).await
        }
        Commands::Logout => commands::logout::handle_logout(&cli.config),
        Commands::Status => commands::status::handle_status(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
