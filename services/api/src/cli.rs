use crate::demo::{run_demo, run_listing_import, DemoArgs, ListingImportArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use estate_hub::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Estate Hub",
    about = "Run and demonstrate the Estate Hub marketplace backend from the command line",
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
    /// Work with listing CSV exports
    Listings {
        #[command(subcommand)]
        command: ListingsCommand,
    },
    /// Run an end-to-end CLI demo covering verification, moderation, and inquiries
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum ListingsCommand {
    /// Validate a listing CSV export and print a summary
    Import(ListingImportArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Listing CSV loaded as active listings of the development agent (in-process backend only)
    #[arg(long)]
    pub(crate) seed_csv: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Listings {
            command: ListingsCommand::Import(args),
        } => run_listing_import(args),
        Command::Demo(args) => run_demo(args),
    }
}
