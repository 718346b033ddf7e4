//! FileSink - appends rows as JSON lines

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use contracts::{ContractError, EnrichedRow, RowSink};
use tracing::{debug, instrument};

/// Sink that appends one JSON object per row to a local file
pub struct FileSink {
    name: String,
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FileSink {
    /// Open (or create) the output file in append mode
    pub fn new(name: impl Into<String>, path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            name: name.into(),
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&mut self, row: &EnrichedRow) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, row)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        self.writer.write_all(b"\n")?;
        // one flush per row
        self.writer.flush()
    }
}

impl RowSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, row),
        fields(sink = %self.name, vehicle_id = %row.vehicle_id)
    )]
    async fn write(&mut self, row: &EnrichedRow) -> Result<(), ContractError> {
        self.write_line(row)
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        self.writer
            .flush()
            .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.flush().await?;
        debug!(sink = %self.name, path = %self.path.display(), "FileSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn row(vehicle_id: &str) -> EnrichedRow {
        EnrichedRow {
            vehicle_id: vehicle_id.into(),
            utc_time: Some("2010-01-01 08:15:00".into()),
            offset: 3600.0,
            address: "Somewhere".into(),
            zipcode: "12345".into(),
            speed: "10".into(),
            bearing: "90".into(),
            elevation: Some(1.5),
            latitude: 1.0,
            longitude: 2.0,
        }
    }

    #[tokio::test]
    async fn test_file_sink_appends_json_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("rows.jsonl");

        let mut sink = FileSink::new("file", &path).unwrap();
        sink.write(&row("A")).await.unwrap();
        sink.write(&row("B")).await.unwrap();
        sink.close().await.unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["VehicleID"], "A");
        assert_eq!(first["Offset"], 3600.0);
    }

    #[tokio::test]
    async fn test_file_sink_reopens_in_append_mode() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.jsonl");

        let mut sink = FileSink::new("file", &path).unwrap();
        sink.write(&row("A")).await.unwrap();
        drop(sink);

        let mut sink = FileSink::new("file", &path).unwrap();
        sink.write(&row("B")).await.unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 2);
    }
}
