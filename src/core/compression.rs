// Decoder selection for compressed telemetry logs

use crate::core::constants::CompressionType;
use crate::core::error::{CanlogError, Result};
use flate2::read::{GzDecoder, ZlibDecoder};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Open a log file as a buffered line source, decoding it according to its extension.
pub fn open_log(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    wrap_reader(file, CompressionType::from_path(path))
}

pub fn wrap_reader(file: File, compression: CompressionType) -> Result<Box<dyn BufRead>> {
    match compression {
        CompressionType::None => Ok(Box::new(BufReader::new(file))),

        CompressionType::Gzip => Ok(Box::new(BufReader::new(GzDecoder::new(file)))),

        CompressionType::Zlib => Ok(Box::new(BufReader::new(ZlibDecoder::new(file)))),

        #[cfg(feature = "lz4")]
        CompressionType::Lz4 => {
            let decoder = lz4::Decoder::new(file)
                .map_err(|e| CanlogError::DecompressionFailed(format!("LZ4: {}", e)))?;
            Ok(Box::new(BufReader::new(decoder)))
        }

        #[cfg(not(feature = "lz4"))]
        CompressionType::Lz4 => Err(CanlogError::UnsupportedCompression(
            compression.label().to_string(),
        )),

        #[cfg(feature = "zstd")]
        CompressionType::Zstd => {
            let decoder = zstd::stream::read::Decoder::new(file)
                .map_err(|e| CanlogError::DecompressionFailed(format!("Zstd: {}", e)))?;
            Ok(Box::new(BufReader::new(decoder)))
        }

        #[cfg(not(feature = "zstd"))]
        CompressionType::Zstd => Err(CanlogError::UnsupportedCompression(
            compression.label().to_string(),
        )),
    }
}
