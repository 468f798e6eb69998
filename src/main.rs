//! bidlink CLI binary entry point.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use bidlink::cli::{auth, request, AuthCommands, Cli, CliContext, Commands};
use bidlink::error::BidlinkError;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_env("BIDLINK_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), BidlinkError> {
    let ctx = CliContext::from_cli(&cli)?;
    match &cli.command {
        Commands::Auth(auth_args) => match &auth_args.command {
            AuthCommands::Login(args) => auth::handle_login(&ctx, args).await,
            AuthCommands::Status => auth::handle_status(&ctx).await,
            AuthCommands::Logout => auth::handle_logout(&ctx).await,
        },
        Commands::Request(args) => request::handle_request(&ctx, args).await,
    }
}
