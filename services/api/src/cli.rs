use crate::demo::{run_demo, run_export, run_navigation, DemoArgs, ExportArgs, NavigationArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use customs_exam::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Customs Previous Exam",
    about = "Run and demonstrate the customs previous-exam service from the command line",
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
    /// Walk through a complete exam against an in-memory store
    Demo(DemoArgs),
    /// Export a saved exam from a JSON store to text and spreadsheet files
    Export(ExportArgs),
    /// Print the role navigation table
    Navigation(NavigationArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Persist exams to this JSON file instead of memory
    #[arg(long)]
    pub(crate) store: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args),
        Command::Export(args) => run_export(args),
        Command::Navigation(args) => run_navigation(args),
    }
}
