// Format constants for telemetry logs

use std::path::Path;

/// Prefix of a header-block line mapping a signal id to its name.
pub const VALUE_PREFIX: &str = "Value ";

/// Separator between the two halves of a header-block line.
pub const HEADER_SEPARATOR: &str = ": ";

/// Separator of a data-block triple.
pub const FIELD_SEPARATOR: char = ',';

pub const DEFAULT_MAX_ERRORS: i64 = 100;

/// Issues kept verbatim in a parse report; the error count keeps going past this.
pub const MAX_RECORDED_ISSUES: usize = 1000;

/// Lines between two progress reports.
pub const PROGRESS_INTERVAL: usize = 100_000;

pub const MS_PER_SECOND: f64 = 1e3;

// Outlier rejection
pub const MIN_OUTLIER_WINDOW: usize = 5;
pub const IQR_FENCE: f64 = 1.5;

// Band filter
/// Upper bound on the uniform grid a band filter resamples onto.
pub const MAX_RESAMPLED_POINTS: usize = 1 << 24;

// Compression codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    None,
    Gzip,
    Zlib,
    Lz4,
    Zstd,
}

impl CompressionType {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("gz") => CompressionType::Gzip,
            Some("zz") | Some("zlib") => CompressionType::Zlib,
            Some("lz4") => CompressionType::Lz4,
            Some("zst") => CompressionType::Zstd,
            _ => CompressionType::None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CompressionType::None => "none",
            CompressionType::Gzip => "gzip",
            CompressionType::Zlib => "zlib",
            CompressionType::Lz4 => "lz4",
            CompressionType::Zstd => "zstd",
        }
    }
}
