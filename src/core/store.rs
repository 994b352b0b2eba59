// Parsed signal store and name-or-id lookup

use serde::Serialize;
use std::collections::HashMap;

use crate::core::error::{CanlogError, Result};
use crate::core::format::{ParseReport, SignalInfo, SignalName};
use crate::core::series::Series;
use crate::core::window::TimeUnit;

/// Every signal parsed from one log, with its id and name indices.
///
/// Built once by the parser and read-only afterward; a re-parse produces a
/// fresh store rather than updating this one.
#[derive(Debug, Clone, Default)]
pub struct SeriesStore {
    pub(crate) by_id: HashMap<u32, Series>,
    pub(crate) names: HashMap<u32, SignalName>,
    pub(crate) id_of: HashMap<String, u32>,
    pub(crate) header_order: Vec<u32>,
    pub(crate) total_points: usize,
    pub(crate) start_time: Option<i64>,
    pub(crate) end_time: Option<i64>,
    pub(crate) source: String,
    pub(crate) header_line: String,
    pub(crate) report: ParseReport,
}

/// How a caller refers to a signal.
#[derive(Debug, Clone, Copy)]
pub enum SeriesKey<'a> {
    Id(u32),
    Name(&'a str),
    /// Already looked up; handed back as is.
    Resolved(&'a Series),
}

impl From<u32> for SeriesKey<'_> {
    fn from(id: u32) -> Self {
        SeriesKey::Id(id)
    }
}

impl<'a> From<&'a str> for SeriesKey<'a> {
    fn from(name: &'a str) -> Self {
        SeriesKey::Name(name)
    }
}

impl<'a> From<&'a String> for SeriesKey<'a> {
    fn from(name: &'a String) -> Self {
        SeriesKey::Name(name.as_str())
    }
}

impl<'a> From<&'a Series> for SeriesKey<'a> {
    fn from(series: &'a Series) -> Self {
        SeriesKey::Resolved(series)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: u32,
    pub name: String,
    pub description: String,
    /// Number of query terms found in the name or description.
    pub score: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreSummary {
    pub source: String,
    pub header: String,
    pub signals: usize,
    pub total_points: usize,
    pub unit: TimeUnit,
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub errors: usize,
}

impl SeriesStore {
    pub fn get<'a>(&'a self, key: impl Into<SeriesKey<'a>>) -> Result<&'a Series> {
        match key.into() {
            SeriesKey::Id(id) => self
                .by_id
                .get(&id)
                .ok_or_else(|| CanlogError::SignalNotFound(format!("id {}", id))),
            SeriesKey::Name(name) => self
                .resolve_name(name)
                .and_then(|id| self.by_id.get(&id))
                .ok_or_else(|| CanlogError::SignalNotFound(name.to_string())),
            SeriesKey::Resolved(series) => Ok(series),
        }
    }

    pub fn contains<'a>(&'a self, key: impl Into<SeriesKey<'a>>) -> bool {
        self.get(key).is_ok()
    }

    /// Exact short or full name first, then the first header whose name contains `query`.
    fn resolve_name(&self, query: &str) -> Option<u32> {
        let query = query.trim();
        if query.is_empty() {
            return None;
        }
        if let Some(&id) = self.id_of.get(query) {
            return Some(id);
        }

        let named = || {
            self.header_order
                .iter()
                .filter_map(|id| self.names.get(id).map(|name| (*id, name)))
        };
        named()
            .find(|(_, name)| name.matches_exactly(query))
            .or_else(|| named().find(|(_, name)| name.contains(query)))
            .map(|(id, _)| id)
    }

    /// Full header name of a signal.
    pub fn name_of(&self, id: u32) -> Option<&str> {
        self.names.get(&id).map(|name| name.full.as_str())
    }

    pub fn id_of(&self, full_name: &str) -> Option<u32> {
        self.id_of.get(full_name).copied()
    }

    pub fn signals(&self) -> Vec<SignalInfo> {
        let mut ids: Vec<u32> = self.by_id.keys().copied().collect();
        ids.sort_unstable();

        ids.into_iter()
            .map(|id| {
                let (name, description) = match self.names.get(&id) {
                    Some(n) => (n.short_name.clone(), n.description.clone()),
                    None => (id.to_string(), String::new()),
                };
                SignalInfo {
                    id,
                    name,
                    description,
                    points: self.by_id.get(&id).map_or(0, Series::len),
                }
            })
            .collect()
    }

    /// Signals matching any whitespace-separated term of `query`, best first.
    pub fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        if terms.is_empty() {
            return Err(CanlogError::InvalidParameter(
                "search query cannot be empty".to_string(),
            ));
        }

        let mut hits: Vec<SearchHit> = self
            .header_order
            .iter()
            .filter_map(|&id| {
                let name = self.names.get(&id)?;
                let short = name.short_name.to_lowercase();
                let description = name.description.to_lowercase();
                let score = terms
                    .iter()
                    .filter(|t| short.contains(t.as_str()) || description.contains(t.as_str()))
                    .count();
                (score > 0).then(|| SearchHit {
                    id,
                    name: name.short_name.clone(),
                    description: name.description.clone(),
                    score,
                })
            })
            .collect();

        // stable: equal scores keep header order
        hits.sort_by(|a, b| b.score.cmp(&a.score));
        Ok(hits)
    }

    pub fn summary(&self, unit: TimeUnit) -> StoreSummary {
        let to_unit = |t: i64| unit.from_ms(t as f64);
        StoreSummary {
            source: self.source.clone(),
            header: self.header_line.clone(),
            signals: self.by_id.len(),
            total_points: self.total_points,
            unit,
            start: self.start_time.map(to_unit),
            end: self.end_time.map(to_unit),
            errors: self.report.errors,
        }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn total_points(&self) -> usize {
        self.total_points
    }

    pub fn start_time(&self) -> Option<i64> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<i64> {
        self.end_time
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn header_line(&self) -> &str {
        &self.header_line
    }

    pub fn report(&self) -> &ParseReport {
        &self.report
    }

    /// Ids in the order their header pairs first appeared.
    pub fn header_order(&self) -> &[u32] {
        &self.header_order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SeriesStore {
        let mut store = SeriesStore::default();
        let headers = [
            (1, "Pack Voltage (ams.pack.voltage)"),
            (2, "Pack Voltage Min (ams.pack.voltage_min)"),
            (3, "wheelSpeed"),
        ];
        for (id, full) in headers {
            let name = SignalName::parse(full);
            let series = Series::new(
                id,
                name.short_name.clone(),
                name.description.clone(),
                vec![0, 10],
                vec![id as f64, id as f64],
            )
            .unwrap();
            store.by_id.insert(id, series);
            store.id_of.insert(full.to_string(), id);
            store.names.insert(id, name);
            store.header_order.push(id);
            store.total_points += 2;
        }
        store
    }

    #[test]
    fn test_lookup_key_variants() {
        let store = store();
        assert_eq!(store.get(2u32).unwrap().id(), 2);
        assert_eq!(store.get("ams.pack.voltage").unwrap().id(), 1);
        assert_eq!(store.get("Pack Voltage (ams.pack.voltage)").unwrap().id(), 1);
        assert_eq!(store.get(&"wheelSpeed".to_string()).unwrap().id(), 3);

        let resolved = store.get(1u32).unwrap();
        assert!(std::ptr::eq(store.get(resolved).unwrap(), resolved));
    }

    #[test]
    fn test_exact_match_beats_earlier_containment() {
        let store = store();
        // "voltage_min" is only contained in id 2
        assert_eq!(store.get("voltage_min").unwrap().id(), 2);
        // "Pack Voltage" is contained in both; header order picks id 1
        assert_eq!(store.get("Pack Voltage").unwrap().id(), 1);
        assert_eq!(store.get("ams.pack.voltage_min").unwrap().id(), 2);
    }

    #[test]
    fn test_unknown_keys() {
        let store = store();
        assert!(matches!(store.get(42u32), Err(CanlogError::SignalNotFound(_))));
        assert!(matches!(store.get("brakes"), Err(CanlogError::SignalNotFound(_))));
        assert!(!store.contains(""));
        assert!(store.contains("wheel"));
    }

    #[test]
    fn test_signals_and_search() {
        let store = store();
        let signals = store.signals();
        assert_eq!(signals.iter().map(|s| s.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(signals[0].name, "ams.pack.voltage");
        assert_eq!(signals[0].description, "Pack Voltage");

        let hits = store.search("voltage min").unwrap();
        assert_eq!(hits[0].id, 2);
        assert_eq!(hits[0].score, 2);
        assert_eq!(hits.len(), 2);
        assert!(store.search("   ").is_err());
    }
}
