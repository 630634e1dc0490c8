use std::path::PathBuf;

use importer::{
    Decoder, DroppedFile, ReferenceFetchError, RefreshOutcome, RowSet, SharedResolver,
    StagingSession, fetch_catalog, filter_dropped,
};

use crate::{
    client::Client,
    config::{AppConfig, Assignment, TimeframeArgs},
    error::Result,
    render, staging,
};

pub async fn categories(config: &AppConfig, client: &Client, args: TimeframeArgs) -> Result<()> {
    let timeframe = super::select_timeframe(args)?;
    let catalog = fetch_catalog(client, timeframe, config.timeout()).await?;
    print!("{}", render::categories(&catalog));
    Ok(())
}

pub async fn stage(
    config: &AppConfig,
    client: &Client,
    files: &[PathBuf],
    args: TimeframeArgs,
    assignments: Vec<Assignment>,
    auto_resolve: bool,
) -> Result<()> {
    let timeframe = super::select_timeframe(args)?;

    let selection = filter_dropped(files.iter().map(DroppedFile::new));
    for rejected in &selection.rejected {
        println!(
            "skipped {}: only CSV, XLS and XLSX files are accepted",
            rejected.display()
        );
    }
    let rows = Decoder::new(config.max_file_bytes).decode_first(&selection.accepted)?;
    let source_file = selection
        .accepted
        .first()
        .and_then(|file| file.path.file_name())
        .map(|name| name.to_string_lossy().into_owned());

    let mut session = StagingSession::new(timeframe, source_file, RowSet::new(rows));
    let resolver = SharedResolver::default();
    let outcome = resolver.refresh(client, timeframe, config.timeout()).await;
    if let Err(err) = apply_refresh(&mut session, &resolver, outcome) {
        tracing::warn!("category refresh failed: {err}");
        session.flagged = session.unresolved();
    }

    if auto_resolve {
        let resolved = session.auto_resolve();
        tracing::info!("{} row(s) categorized from their notes", resolved.len());
    }
    for Assignment { row, category } in assignments {
        if let Err(err) = session.assign(row, category) {
            println!("row {row} left unchanged: {err}");
        }
    }

    staging::save(&session, &config.state_path)?;
    print!("{}", render::preview(&session));
    Ok(())
}

/// Reloads the catalog of the staged import, keeping rows and categories.
pub async fn refresh(config: &AppConfig, client: &Client) -> Result<()> {
    let mut session = staging::load_required(&config.state_path)?;
    let resolver = SharedResolver::default();
    let outcome = resolver
        .refresh(client, session.timeframe, config.timeout())
        .await;
    let result = apply_refresh(&mut session, &resolver, outcome);
    staging::save(&session, &config.state_path)?;
    print!("{}", render::preview(&session));
    Ok(result?)
}

/// Moves the outcome of a refresh into the session. A superseded refresh
/// leaves the session alone.
fn apply_refresh(
    session: &mut StagingSession,
    resolver: &SharedResolver,
    outcome: std::result::Result<RefreshOutcome, ReferenceFetchError>,
) -> std::result::Result<(), ReferenceFetchError> {
    match outcome {
        Ok(RefreshOutcome::Applied) => {
            if let Some(catalog) = resolver.catalog() {
                session.replace_catalog(catalog);
            }
            Ok(())
        }
        Ok(RefreshOutcome::Discarded) => Ok(()),
        Err(err) => {
            session.record_fetch_error(&err);
            Err(err)
        }
    }
}
