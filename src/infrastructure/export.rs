//! JSON, JSONL and CSV writers for sealed records
//!
//! Files are `<basename>[_<YYYYmmdd_HHMMSS>].<ext>` inside the output
//! directory and are overwritten on every run.

use crate::domain::product::format_timestamp;
use crate::domain::ProductRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::info;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error writing {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV serialization failed: {0}")]
    Csv(#[from] csv::Error),
}

/// Output file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Json,
    Jsonl,
    Csv,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Jsonl => "jsonl",
            Self::Csv => "csv",
        }
    }
}

/// CSV header; list fields are joined into one cell
pub const CSV_COLUMNS: [&str; 26] = [
    "id",
    "url",
    "title",
    "brand",
    "priceCurrent",
    "priceRegular",
    "discountPercent",
    "discountAmount",
    "rating",
    "ratingCount",
    "boughtLastMonth",
    "colors",
    "images",
    "isSale",
    "isClearance",
    "isNew",
    "inStock",
    "isBestSeller",
    "seller",
    "description",
    "highlights",
    "specs",
    "categoryBreadcrumb",
    "material",
    "scrapedAt",
    "dimensions",
];

/// Writes one session's records in each requested format
#[derive(Debug, Clone)]
pub struct OutputWriter {
    output_dir: PathBuf,
    basename: String,
    timestamp: Option<DateTime<Utc>>,
    list_delimiter: String,
}

impl OutputWriter {
    pub fn new(output_dir: impl Into<PathBuf>, basename: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            basename: basename.into(),
            timestamp: None,
            list_delimiter: crate::infrastructure::config::defaults::CSV_LIST_DELIMITER.to_string(),
        }
    }

    /// Suffix file names with the run's start time
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    #[must_use]
    pub fn with_list_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.list_delimiter = delimiter.into();
        self
    }

    pub fn path_for(&self, format: OutputFormat) -> PathBuf {
        let stem = match self.timestamp {
            Some(timestamp) => format!("{}_{}", self.basename, timestamp.format("%Y%m%d_%H%M%S")),
            None => self.basename.clone(),
        };
        self.output_dir.join(format!("{stem}.{}", format.extension()))
    }

    /// Write every format, returning the paths written
    pub async fn write_all(&self, records: &[ProductRecord], formats: &[OutputFormat]) -> Result<Vec<PathBuf>, ExportError> {
        let mut paths = Vec::with_capacity(formats.len());
        for format in formats {
            paths.push(self.write(*format, records).await?);
        }
        Ok(paths)
    }

    /// A single JSON array
    pub async fn write_json(&self, records: &[ProductRecord]) -> Result<PathBuf, ExportError> {
        self.write(OutputFormat::Json, records).await
    }

    /// One JSON object per line
    pub async fn write_jsonl(&self, records: &[ProductRecord]) -> Result<PathBuf, ExportError> {
        self.write(OutputFormat::Jsonl, records).await
    }

    pub async fn write_csv(&self, records: &[ProductRecord]) -> Result<PathBuf, ExportError> {
        self.write(OutputFormat::Csv, records).await
    }

    /// Render in memory, then replace the file in one write
    async fn write(&self, format: OutputFormat, records: &[ProductRecord]) -> Result<PathBuf, ExportError> {
        let path = self.path_for(format);
        let content = self.render(format, records, &path)?;

        fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|source| io_error(&self.output_dir, source))?;
        fs::write(&path, content).await.map_err(|source| io_error(&path, source))?;

        info!("Wrote {} records to {:?}", records.len(), path);
        Ok(path)
    }

    fn render(&self, format: OutputFormat, records: &[ProductRecord], path: &Path) -> Result<Vec<u8>, ExportError> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_vec_pretty(records)?),
            OutputFormat::Jsonl => {
                let mut content = Vec::new();
                for record in records {
                    serde_json::to_writer(&mut content, record)?;
                    content.push(b'\n');
                }
                Ok(content)
            }
            OutputFormat::Csv => {
                let mut writer = csv::Writer::from_writer(Vec::new());
                writer.write_record(CSV_COLUMNS)?;
                for record in records {
                    writer.write_record(self.csv_row(record)?)?;
                }
                writer.into_inner().map_err(|e| io_error(path, e.into_error()))
            }
        }
    }

    fn csv_row(&self, record: &ProductRecord) -> Result<Vec<String>, ExportError> {
        let flags = record.flags();
        let join = |items: &[String]| items.join(&self.list_delimiter);
        let dimensions: Vec<String> = record.dimensions().map(|(key, value)| format!("{key}: {value}")).collect();

        Ok(vec![
            record.id().to_string(),
            record.url().to_string(),
            record.title().to_string(),
            record.brand().to_string(),
            record.price_current().to_string(),
            optional(record.price_regular()),
            optional(record.discount_percent()),
            optional(record.discount_amount()),
            optional(record.rating()),
            optional(record.rating_count()),
            record.bought_last_month().unwrap_or_default().to_string(),
            join(record.colors()),
            join(record.images()),
            flags.is_sale.to_string(),
            flags.is_clearance.to_string(),
            flags.is_new.to_string(),
            flags.in_stock.to_string(),
            flags.is_best_seller.to_string(),
            record.seller().unwrap_or_default().to_string(),
            record.description().unwrap_or_default().to_string(),
            join(record.highlights()),
            serde_json::to_string(record.specs())?,
            record.category_breadcrumb().unwrap_or_default().to_string(),
            record.material().unwrap_or_default().to_string(),
            format_timestamp(&record.scraped_at()),
            join(&dimensions),
        ])
    }
}

fn io_error(path: &Path, source: std::io::Error) -> ExportError {
    ExportError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
