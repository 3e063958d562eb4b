use std::fs::OpenOptions;
use std::io::{BufRead as _, BufReader, BufWriter, Write as _};
use std::path::Path;

use anyhow::Context as _;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub fn read_records<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    let file = OpenOptions::new()
        .read(true)
        .open(path)
        .with_context(|| format!("open jsonl: {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("read jsonl line: {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line)
            .with_context(|| format!("parse {}:{}", path.display(), idx + 1))?;
        records.push(record);
    }
    Ok(records)
}

/// Writes one JSON object per line. Refuses to replace an existing file unless `force`.
pub fn write_records<T: Serialize>(path: &Path, records: &[T], force: bool) -> anyhow::Result<()> {
    let mut out = BufWriter::new(create_output(path, force)?);
    for record in records {
        serde_json::to_writer(&mut out, record).context("serialize jsonl record")?;
        out.write_all(b"\n").context("write jsonl newline")?;
    }
    out.flush()
        .with_context(|| format!("flush jsonl: {}", path.display()))?;
    Ok(())
}

pub fn create_output(path: &Path, force: bool) -> anyhow::Result<std::fs::File> {
    if path.exists() && !force {
        anyhow::bail!("output already exists: {}", path.display());
    }

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir: {}", parent.display()))?;
    }

    let mut options = OpenOptions::new();
    options.write(true);
    if force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    options
        .open(path)
        .with_context(|| format!("create output: {}", path.display()))
}
