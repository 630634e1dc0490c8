use importer::{CategoryRef, RowId};

use crate::{config::AppConfig, error::Result, render, staging};

pub fn assign(config: &AppConfig, row: usize, category: &str) -> Result<()> {
    let mut session = staging::load_required(&config.state_path)?;
    let category = category.parse::<CategoryRef>()?;
    session.assign(RowId(row), category)?;
    staging::save(&session, &config.state_path)?;
    print!("{}", render::preview(&session));
    Ok(())
}

pub fn preview(config: &AppConfig) -> Result<()> {
    let session = staging::load_required(&config.state_path)?;
    print!("{}", render::preview(&session));
    Ok(())
}

pub fn discard(config: &AppConfig) -> Result<()> {
    if staging::clear(&config.state_path)? {
        println!("Staged import discarded.");
    } else {
        println!("Nothing was staged.");
    }
    Ok(())
}
