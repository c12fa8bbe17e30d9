use clap::Parser;
use owo_colors::{OwoColorize, Style};
use rota_core::error::CoreError;
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod parser;
mod timezone;
mod views;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = config::Config::new().unwrap_or_else(|e| {
        warn!(error = %e, "ignoring unreadable configuration");
        config::Config::default()
    });

    let cli = cli::Cli::parse();

    let result = match cli.command {
        cli::Commands::Parse(command) => commands::parse::parse_text(command, &config),
        cli::Commands::Agenda(command) => commands::agenda::show_agenda(command, &config).await,
        cli::Commands::Preview(command) => commands::preview::preview_rule(command, &config),
        cli::Commands::Hash(command) => {
            commands::hash::hash_occurrence(command, &config).map(|digest| println!("{}", digest))
        }
    };

    if let Err(e) = result {
        handle_error(e);
        std::process::exit(1);
    }
}

fn handle_error(err: anyhow::Error) {
    let error_style = Style::new().red().bold();

    if let Some(core_error) = err.downcast_ref::<CoreError>() {
        match core_error {
            CoreError::InvalidRRule(s) => {
                eprintln!("{} Invalid rule: {}", "Error:".style(error_style), s.yellow());
            }
            CoreError::InvalidWindow { start, end } => {
                eprintln!(
                    "{} Window start {} is after its end {}",
                    "Error:".style(error_style),
                    start.format("%Y-%m-%d %H:%M").yellow(),
                    end.format("%Y-%m-%d %H:%M").yellow()
                );
            }
            CoreError::InvalidTimezone(s) => {
                eprintln!("{} Invalid timezone: {}", "Error:".style(error_style), s);
            }
            CoreError::InvalidInput(s) => {
                eprintln!("{} Invalid input: {}", "Error:".style(error_style), s);
            }
            _ => eprintln!("{} {:#}", "Error:".style(error_style), err),
        }
    } else {
        eprintln!("{} {:#}", "Error:".style(error_style), err);
    }
}
