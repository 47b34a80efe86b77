use anyhow::Result;
use clap::Parser;
use tokio::signal;

use thread_search::cli::commands::{
    handle_config, handle_delete, handle_find_text, handle_ingest, handle_search, handle_serve,
    handle_status, handle_threads,
};
use thread_search::cli::output::get_formatter;
use thread_search::cli::{Cli, Commands};
use thread_search::logging::{LogConfig, init_logging};
use thread_search::models::{Config, OutputFormat};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = cli.verbose;
    init_logging(&LogConfig::from_flags(cli.log_level, verbose));

    let format = cli.format.unwrap_or_else(|| {
        Config::load()
            .map(|config| config.output.default_format)
            .unwrap_or_default()
    });

    // The proxy drains in-flight requests on its own shutdown path.
    let result = match cli.command {
        command @ Commands::Serve(_) => run_command(command, format, verbose).await,
        command => {
            tokio::select! {
                result = run_command(command, format, verbose) => result,
                _ = shutdown_signal() => {
                    eprintln!("\nReceived shutdown signal, stopping.");
                    Ok(())
                }
            }
        }
    };

    if let Err(e) = result {
        eprint!("{}", get_formatter(format).format_error(&format!("{e:#}")));
        std::process::exit(1);
    }

    Ok(())
}

async fn run_command(command: Commands, format: OutputFormat, verbose: bool) -> Result<()> {
    match command {
        Commands::Threads(args) => handle_threads(args, format, verbose).await,
        Commands::Ingest(args) => handle_ingest(args, format, verbose).await,
        Commands::Search(args) => handle_search(args, format, verbose).await,
        Commands::FindText(args) => handle_find_text(args, format, verbose).await,
        Commands::Delete(args) => handle_delete(args, format, verbose).await,
        Commands::Status => handle_status(format, verbose).await,
        Commands::Config(cmd) => handle_config(cmd, format, verbose).await,
        Commands::Serve(args) => handle_serve(args, shutdown_signal()).await,
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
