// ABOUTME: Plain-text list outputs consumed by experiment scripts (node_list, addr_list)
// ABOUTME: Files are truncated and rewritten on every run, one entry per line

use crate::manifest::NodeRecord;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub fn write_lines<'a, I>(path: &Path, lines: I) -> Result<usize>
where
    I: IntoIterator<Item = &'a str>,
{
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;

    let mut writer = BufWriter::new(file);
    let mut count = 0;
    for line in lines {
        writeln!(writer, "{line}")
            .with_context(|| format!("Failed to write output file: {}", path.display()))?;
        count += 1;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write output file: {}", path.display()))?;

    Ok(count)
}

pub fn write_node_list(path: &Path, records: &[NodeRecord]) -> Result<usize> {
    write_lines(path, records.iter().map(|r| r.identifier.as_str()))
}

pub fn write_addr_list(path: &Path, records: &[NodeRecord]) -> Result<usize> {
    write_lines(path, records.iter().map(|r| r.address.as_str()))
}
