use importer::{CommitState, Committer};

use crate::{client::Client, config::AppConfig, error::Result, render, staging};

pub async fn commit(config: &AppConfig, client: Client) -> Result<()> {
    let mut session = staging::load_required(&config.state_path)?;
    if session.is_empty() {
        println!("Nothing to commit.");
        return Ok(());
    }

    let committer = Committer::new(client, config.timeout());

    let mut progress = committer.subscribe();
    let printer = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let state = progress.borrow_and_update().clone();
            if let CommitState::Committing { index, row, total } = state {
                println!("saving row {row} ({}/{total})", index + 1);
            }
        }
    });

    // Ctrl-C stops the batch before the next row; rows already sent stay sent.
    let cancel = committer.cancel_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let result = session.commit(&committer).await;
    interrupt.abort();
    drop(committer);
    if let Err(err) = printer.await {
        tracing::warn!("progress printer stopped: {err}");
    }

    match result {
        Ok(summary) => {
            staging::clear(&config.state_path)?;
            println!("Saved {} transaction(s).", summary.committed.len());
            Ok(())
        }
        Err(err) => {
            staging::save(&session, &config.state_path)?;
            print!("{}", render::preview(&session));
            if !err.committed().is_empty() {
                println!(
                    "{} row(s) were saved and removed from the import.",
                    err.committed().len()
                );
            }
            Err(err.into())
        }
    }
}
