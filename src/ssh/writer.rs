// ABOUTME: Append-only writer for SSH client config Host blocks built from node records
// ABOUTME: Each record becomes Host <client_id>, HostName <address> and User <user>

use crate::manifest::NodeRecord;
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

const INDENT: &str = "   ";

pub fn format_host_block(record: &NodeRecord, user: &str) -> String {
    format!(
        "Host {}\n{INDENT}HostName {}\n{INDENT}User {}\n",
        record.identifier, record.address, user
    )
}

/// Append one Host block per record to the SSH config at `path`.
///
/// The file is created if missing but its parent directory is not.
/// Existing content is never rewritten, so repeated runs accumulate duplicate blocks.
pub fn append_host_entries(path: &Path, records: &[NodeRecord], user: &str) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open SSH config for appending: {}", path.display()))?;

    let mut writer = BufWriter::new(file);
    for record in records {
        writer
            .write_all(format_host_block(record, user).as_bytes())
            .with_context(|| format!("Failed to write SSH config: {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write SSH config: {}", path.display()))?;

    tracing::debug!("Appended {} host block(s) to {}", records.len(), path.display());
    Ok(())
}
