use std::process::ExitCode;

mod client;
mod commands;
mod config;
mod error;
mod render;
mod staging;

#[tokio::main]
async fn main() -> ExitCode {
    let (config, command) = match config::load() {
        Ok(loaded) => loaded,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "moneysmart={level},importer={level}",
            level = config.level
        ))
        .with_writer(std::io::stderr)
        .init();

    match commands::run(&config, command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::debug!("command failed: {err:?}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
