// canlog - telemetry log ingestion and time-series alignment
// Main library entry point

pub mod core;

// Re-export main types
pub use core::align::{
    align_many, align_pair, combine, compute, inner_join, inner_join_series, left_join,
    left_join_series, outer_join, outer_join_series, AlignedFrame, Alignment, FillMethod,
    Interpolation, Joined, Missing, Op, OuterJoin,
};
pub use core::bandpass::{BandFilter, BandMode};
pub use core::cache::{CachedStore, StoreCache};
pub use core::error::{CanlogError, Result};
pub use core::format::{IssueKind, ParseIssue, ParseReport, SignalInfo, SignalName};
pub use core::outlier::{Filtered, OutlierFilter, OutlierMode};
pub use core::parser::{parse, LogParser, ParseOptions};
pub use core::series::{Quotient, Series};
pub use core::store::{SearchHit, SeriesKey, SeriesStore, StoreSummary};
pub use core::window::{average, integral, slice, stats, SeriesStats, TimeRange, TimeUnit};

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Cursor;

    const LOG: &str = "PER telemetry 2024-05-01 run 3\n\
        Value 1: \"Pack Voltage (ams.pack.voltage)\"\n\
        Value 2: \"Pack Current (ams.pack.current)\"\n\
        1000,1,400.0\n\
        1000,2,10.0\n\
        1500,2,20.0\n\
        2000,1,401.5\n\
        2000,2,30.0\n";

    fn store() -> SeriesStore {
        LogParser::default()
            .parse_reader(Cursor::new(LOG.as_bytes().to_vec()), "run3.csv")
            .unwrap()
    }

    #[test]
    fn test_compressed_log_through_cache() {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run3.csv.gz");
        let mut encoder =
            GzEncoder::new(std::fs::File::create(&path).unwrap(), Compression::default());
        encoder.write_all(LOG.as_bytes()).unwrap();
        encoder.finish().unwrap();

        let mut cache = StoreCache::new();
        let cached = cache.load(&path, ParseOptions::default()).unwrap();
        let plain = store();
        assert_eq!(
            cached.store.get("ams.pack.voltage").unwrap(),
            plain.get("ams.pack.voltage").unwrap()
        );

        let st = stats(
            cached.store.get("ams.pack.current").unwrap(),
            TimeRange::all(),
            TimeUnit::Seconds,
        )
        .unwrap();
        assert_eq!(st.count, 3);
        assert_relative_eq!(st.integral, 20.0, epsilon = 1e-12);
    }

    #[test]
    fn test_power_from_parsed_log() {
        let store = store();
        let voltage = store.get("ams.pack.voltage").unwrap();
        let current = store.get("ams.pack.current").unwrap();

        let power = (voltage * current).unwrap();
        // union grid [1000, 1500, 2000], voltage interpolated at 1500
        assert_eq!(power.timestamps(), &[1000, 1500, 2000]);
        assert_relative_eq!(power.values()[1], 400.75 * 20.0);
        assert_eq!(power.id(), 1);

        let energy = integral(&power, TimeRange::all(), TimeUnit::Seconds).unwrap();
        let expected = 0.5 * (4000.0 + 8015.0) / 2.0 + 0.5 * (8015.0 + 12045.0) / 2.0;
        assert_relative_eq!(energy, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_inner_join_keeps_matches_at_tolerance_boundary() {
        let a = Series::from_samples(vec![0, 10, 20], vec![1.0, 2.0, 3.0]).unwrap();
        let b = Series::from_samples(vec![1, 9, 22], vec![5.0, 6.0, 7.0]).unwrap();

        assert_eq!(inner_join(&a, &b, 1).unwrap().timestamps, vec![0, 10]);
        // boundary distance is kept
        assert_eq!(inner_join(&a, &b, 2).unwrap().timestamps, vec![0, 10, 20]);
    }
}
