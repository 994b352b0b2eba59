// Parse a telemetry log and print a dataset summary

use canlog::{parse, stats, OutlierFilter, Result, TimeRange, TimeUnit};
use tracing::{info, warn, Level};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .init();

    let mut args = std::env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "data/run.csv".to_string());
    let query = args.next();

    let store = parse(&path, 100)?;

    let summary = store.summary(TimeUnit::Seconds);
    info!("==== Data Summary ====");
    info!("Header:      {}", summary.header);
    info!(
        "Time range:  {:?} to {:?} ({})",
        summary.start,
        summary.end,
        TimeUnit::Seconds.label()
    );
    info!("Signals:     {}", summary.signals);
    info!("Data points: {}", summary.total_points);
    if summary.errors > 0 {
        warn!("Skipped {} malformed rows", summary.errors);
    }

    for signal in store.signals() {
        let series = store.get(signal.id)?;
        match stats(series, TimeRange::all(), TimeUnit::Seconds) {
            Ok(st) => info!(
                "[{}] {} ({}): n={} min={:.4}@{:.3}s max={:.4}@{:.3}s avg={:.4}",
                signal.id,
                signal.name,
                signal.description,
                st.count,
                st.min,
                st.min_at,
                st.max,
                st.max_at,
                st.average
            ),
            Err(e) => info!("[{}] {}: {}", signal.id, signal.name, e),
        }
    }

    if let Some(query) = query {
        for hit in store.search(&query)? {
            info!("match {} [{}] {} (score {})", hit.name, hit.id, hit.description, hit.score);
        }

        let series = store.get(query.as_str())?;
        let cleaned = OutlierFilter::replacing().apply(series)?;
        let before = canlog::average(series, TimeRange::all(), TimeUnit::Seconds)?;
        let after = canlog::average(&cleaned.series, TimeRange::all(), TimeUnit::Seconds)?;
        info!(
            "{}: {} outliers replaced, average {:.4} -> {:.4}",
            series.name(),
            cleaned.flagged,
            before,
            after
        );
    }

    Ok(())
}
