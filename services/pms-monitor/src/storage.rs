//! CSV persistence of raw readings

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::Result;
use crate::reading::Reading;

pub const CSV_HEADER: [&str; 4] = ["Timestamp", "PM1.0", "PM2.5", "PM10"];

/// Destination for every successfully acquired reading
pub trait ReadingSink: Send {
    fn append(&mut self, reading: &Reading) -> Result<()>;

    fn flush(&mut self) -> Result<()>;
}

/// Appends one row per reading to a CSV file
pub struct CsvSink {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl CsvSink {
    /// Open `path` for appending, writing the header only if the file is empty
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let is_new = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_new {
            writer.write_record(CSV_HEADER)?;
            writer.flush()?;
            info!("Created {} with header", path.display());
        } else {
            info!("Appending readings to {}", path.display());
        }

        Ok(Self { path, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReadingSink for CsvSink {
    fn append(&mut self, reading: &Reading) -> Result<()> {
        let row = [
            reading.local_time(),
            reading.pm1_0().to_string(),
            reading.pm2_5().to_string(),
            reading.pm10().to_string(),
        ];
        debug!("CSV row: {:?}", row);
        self.writer.write_record(&row)?;
        // Every row reaches the file before the next cycle starts
        self.writer.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
