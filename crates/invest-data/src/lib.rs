use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};

/// Column holding the outcome value in the semicolon-delimited export.
const VALUE_FIELD: usize = 2;
/// Column holding the flagged-entry marker, compared byte-for-byte to "True".
const FLAG_FIELD: usize = 17;

/// One historical outcome. `flagged` marks entries excluded from clean
/// statistics (known-bad records kept for the unfiltered view).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub value: f64,
    pub flagged: bool,
}

/// Immutable, ordered set of historical observations.
///
/// Ingestion order is preserved in `observations` for reproducible display;
/// two sorted value arrays are built once at construction so survival counts
/// are a binary search instead of a full scan per threshold.
#[derive(Debug, Clone)]
pub struct ObservationStore {
    observations: Vec<Observation>,
    sorted_all: Vec<f64>,
    sorted_clean: Vec<f64>,
}

impl ObservationStore {
    pub fn from_observations(observations: Vec<Observation>) -> Self {
        let mut sorted_all: Vec<f64> = observations.iter().map(|o| o.value).collect();
        let mut sorted_clean: Vec<f64> = observations
            .iter()
            .filter(|o| !o.flagged)
            .map(|o| o.value)
            .collect();
        sorted_all.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        sorted_clean.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        Self {
            observations,
            sorted_all,
            sorted_clean,
        }
    }

    /// Load observations from a semicolon-delimited export file.
    ///
    /// Ingestion is best-effort: rows with too few fields or a non-numeric
    /// value column are dropped without error, and non-UTF-8 bytes elsewhere
    /// in a row never fail the load. An empty file yields an empty store.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("failed to open observation file: {}", path.display()))?;

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .flexible(true)
            .from_reader(file);

        let mut observations = Vec::new();
        let mut skipped = 0usize;
        let mut record = csv::ByteRecord::new();
        while reader
            .read_byte_record(&mut record)
            .with_context(|| format!("failed to read observation file: {}", path.display()))?
        {
            match parse_record(&record) {
                Some(obs) => observations.push(obs),
                None => skipped += 1,
            }
        }

        tracing::debug!(
            "Loaded {} observations from {} ({} rows skipped)",
            observations.len(),
            path.display(),
            skipped
        );

        Ok(Self::from_observations(observations))
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.observations.iter()
    }

    pub fn flagged_count(&self) -> usize {
        self.sorted_all.len() - self.sorted_clean.len()
    }

    /// Number of observations with value strictly above `threshold`.
    ///
    /// When `include_flagged` is false, flagged observations are left out of
    /// the count entirely.
    pub fn count_above(&self, threshold: f64, include_flagged: bool) -> usize {
        let sorted = if include_flagged {
            &self.sorted_all
        } else {
            &self.sorted_clean
        };
        // Strict comparison: the boundary value itself does not count.
        sorted.len() - sorted.partition_point(|v| *v <= threshold)
    }
}

fn parse_record(record: &csv::ByteRecord) -> Option<Observation> {
    let value_field = record.get(VALUE_FIELD)?;
    let flag_field = record.get(FLAG_FIELD)?;
    let value: f64 = std::str::from_utf8(value_field).ok()?.trim().parse().ok()?;
    let flagged = flag_field == b"True";
    Some(Observation { value, flagged })
}
