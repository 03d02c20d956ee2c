//! shooptctl - command-line front end for the Shoopt gamification core

use clap::Parser;
use owo_colors::OwoColorize;
use shoopt_gamification::GamificationError;
use shooptctl::cli::Cli;
use shooptctl::commands;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match commands::execute(&cli).await {
        Ok(text) => print!("{}", text),
        Err(err) => {
            report(&err, cli.json);
            std::process::exit(1);
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn report(err: &anyhow::Error, as_json: bool) {
    let code = err
        .downcast_ref::<GamificationError>()
        .map(|e| e.code())
        .unwrap_or("error");
    if as_json {
        println!(
            "{}",
            serde_json::json!({ "error": { "code": code, "message": format!("{:#}", err) } })
        );
    } else {
        eprintln!("{} {:#}", "[ERROR]".bright_red(), err);
    }
}
