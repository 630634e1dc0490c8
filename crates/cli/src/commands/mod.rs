use chrono::{Local, NaiveDate};
use importer::Timeframe;

use crate::{
    client::Client,
    config::{AppConfig, Command, TimeframeArgs},
    error::Result,
};

mod commit;
mod review;
mod stage;
mod template;

pub async fn run(config: &AppConfig, command: Command) -> Result<()> {
    match command {
        Command::Template { output } => template::write(output.as_deref()),
        Command::Categories { timeframe } => {
            let client = client(config)?;
            stage::categories(config, &client, timeframe).await
        }
        Command::Stage {
            files,
            timeframe,
            assignments,
            no_auto,
        } => {
            let client = client(config)?;
            stage::stage(config, &client, &files, timeframe, assignments, !no_auto).await
        }
        Command::Assign { row, category } => review::assign(config, row, &category),
        Command::Refresh => {
            let client = client(config)?;
            stage::refresh(config, &client).await
        }
        Command::Preview => review::preview(config),
        Command::Commit => {
            let client = client(config)?;
            commit::commit(config, client).await
        }
        Command::Discard => review::discard(config),
    }
}

fn client(config: &AppConfig) -> Result<Client> {
    Client::new(&config.base_url, config.api_token.clone(), config.timeout())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn select_timeframe(args: TimeframeArgs) -> Result<Timeframe> {
    Ok(Timeframe::select(args.month, args.year, today())?)
}
