use std::{fs::File, io::BufWriter, path::Path};

use serde_jsonlines::JsonLinesWriter;

use crate::{GridReplayError, session::SessionRecord};

/// Write dataset records as JSON Lines, one record per line, and sync the file to disk.
pub fn write_session_records<'a>(
    file: &Path,
    records: impl IntoIterator<Item = &'a SessionRecord>,
) -> Result<(), GridReplayError> {
    let io_error = |operation: &str, source: std::io::Error| GridReplayError::CacheIOError {
        operation: format!("{} {:?}", operation, file),
        source,
    };

    let session_file = File::create(file).map_err(|e| io_error("create", e))?;
    let mut writer = JsonLinesWriter::new(BufWriter::new(session_file));
    writer
        .write_all(records)
        .map_err(|e| io_error("write", e))?;
    writer.flush().map_err(|e| io_error("flush", e))?;
    writer
        .into_inner()
        .get_ref()
        .sync_all()
        .map_err(|e| io_error("sync", e))?;
    Ok(())
}
