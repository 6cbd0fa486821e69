use crate::demo::{run_demo, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use immo_market::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Immo Market Back Office",
    about = "Run or demonstrate the marketplace subscription and notification workflows",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Walk through sign-up, subscription review, notifications, and publication in memory
    Demo(DemoArgs),
}

#[derive(Args, Debug)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Provision an admin account with this e-mail before serving
    #[arg(long)]
    pub(crate) admin_email: Option<String>,
    /// Display name for the provisioned admin
    #[arg(long, default_value = "Administrator")]
    pub(crate) admin_name: String,
}

impl Default for ServeArgs {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            admin_email: None,
            admin_name: "Administrator".to_string(),
        }
    }
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}
