use std::{fs, path::Path};

use importer::StagingSession;

use crate::error::{AppError, Result};

/// Reads the staged import, if any.
pub fn load(path: &str) -> Result<Option<StagingSession>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    Ok(Some(serde_json::from_str(&content)?))
}

pub fn load_required(path: &str) -> Result<StagingSession> {
    load(path)?.ok_or(AppError::NothingStaged)
}

pub fn save(session: &StagingSession, path: &str) -> Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        fs::create_dir_all(parent)?;
    }
    let payload = serde_json::to_string_pretty(session)?;
    fs::write(path, payload)?;
    Ok(())
}

/// Removes the staged import; `false` when there was none.
pub fn clear(path: &str) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}
