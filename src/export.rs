use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use tracing::{debug, warn};

/// Writes flat record lists to timestamped CSV files under one root directory.
///
/// Records must serialize to scalar fields only; the header row is taken
/// from the field names.
#[derive(Debug, Clone)]
pub struct CsvExporter {
    out_dir: PathBuf,
}

impl CsvExporter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Write `records` to `{out_dir}/{name}-{timestamp}.csv`.
    /// An empty list writes nothing and returns `Ok(None)`.
    pub fn write<R: Serialize>(&self, records: &[R], name: &str) -> Result<Option<PathBuf>> {
        if records.is_empty() {
            debug!(name, "no records, export skipped");
            return Ok(None);
        }

        let stamp = Local::now().format("%Y-%m-%d_%H%M%S");
        let path = self.out_dir.join(format!("{name}-{stamp}.csv"));
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("create export dir {}", dir.display()))?;
        }

        if let Err(err) = write_csv(&path, records) {
            let _ = fs::remove_file(&path);
            return Err(err);
        }
        debug!(path = %path.display(), rows = records.len(), "exported");
        Ok(Some(path))
    }

    /// `write`, with failures logged instead of returned.
    pub fn write_logged<R: Serialize>(&self, records: &[R], name: &str) -> Option<PathBuf> {
        match self.write(records, name) {
            Ok(path) => path,
            Err(err) => {
                warn!(name, "export failed: {err:#}");
                None
            }
        }
    }
}

fn write_csv<R: Serialize>(path: &Path, records: &[R]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("create csv {}", path.display()))?;
    for (idx, record) in records.iter().enumerate() {
        writer
            .serialize(record)
            .with_context(|| format!("serialize row {idx}"))?;
    }
    writer.flush().context("flush csv")?;
    Ok(())
}

/// Make a display name safe to use as one path segment.
pub fn sanitize_segment(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct Row {
        name: String,
        points: i64,
        starter: bool,
    }

    #[derive(Serialize)]
    struct Nested {
        inner: BTreeMap<String, i64>,
    }

    #[test]
    fn writes_header_and_rows() {
        let dir = tempfile::tempdir().expect("tempdir");
        let exporter = CsvExporter::new(dir.path());
        let rows = vec![
            Row {
                name: "Saka".to_string(),
                points: 6,
                starter: true,
            },
            Row {
                name: "Rice".to_string(),
                points: 2,
                starter: false,
            },
        ];
        let path = exporter
            .write(&rows, "fpl-players/individual/test")
            .expect("export should succeed")
            .expect("non-empty export writes a file");

        assert!(path.starts_with(dir.path().join("fpl-players/individual")));
        let raw = fs::read_to_string(&path).expect("read export");
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines, vec!["name,points,starter", "Saka,6,true", "Rice,2,false"]);
    }

    #[test]
    fn empty_input_is_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let exporter = CsvExporter::new(dir.path());
        let rows: Vec<Row> = Vec::new();
        assert!(exporter.write(&rows, "empty").expect("no error").is_none());
        assert_eq!(fs::read_dir(dir.path()).expect("read dir").count(), 0);
    }

    #[test]
    fn unsupported_shape_is_reported_not_panicked() {
        let dir = tempfile::tempdir().expect("tempdir");
        let exporter = CsvExporter::new(dir.path());
        let rows = vec![Nested {
            inner: BTreeMap::from([("a".to_string(), 1)]),
        }];
        assert!(exporter.write(&rows, "nested").is_err());
        assert!(exporter.write_logged(&rows, "nested").is_none());
        assert_eq!(fs::read_dir(dir.path()).expect("read dir").count(), 0);
    }

    #[test]
    fn sanitizes_path_separators() {
        assert_eq!(sanitize_segment("A/B\\C:D"), "A_B_C_D");
        assert_eq!(sanitize_segment("Ødegaard"), "Ødegaard");
    }
}
