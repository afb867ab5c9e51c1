//! Historical order loading and the seeded train/held-out split.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Timelike};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::TrainingDataError;
use crate::schema::{LABEL_COLUMN, TIMESTAMP_COLUMN};
use crate::types::{InferenceRecord, TrainingRecord};

/// Columns that must be present in the CSV header. `order_id` is optional and,
/// like any other extra column, never read.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    TIMESTAMP_COLUMN,
    "distance_km",
    "order_items",
    "weather",
    "traffic",
    "rider_queue",
    "prep_time_min",
    LABEL_COLUMN,
];

const NAIVE_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M",
];

#[derive(Debug, Deserialize)]
struct RawOrder {
    order_time: String,
    distance_km: f64,
    order_items: i64,
    weather: String,
    traffic: i64,
    rider_queue: i64,
    prep_time_min: i64,
    delivery_time_min: f64,
}

/// Hour of day of a raw `order_time` value.
pub fn order_hour(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.hour());
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.hour())
}

pub fn load_csv(path: &Path) -> Result<Vec<TrainingRecord>, TrainingDataError> {
    let file = File::open(path).map_err(|source| TrainingDataError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let records = read_csv(BufReader::new(file))?;
    tracing::info!(path = %path.display(), rows = records.len(), "loaded training data");
    Ok(records)
}

/// Parses training rows, deriving `order_hour` and dropping identifier and
/// raw timestamp columns.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<TrainingRecord>, TrainingDataError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|source| TrainingDataError::Malformed { line: 1, source })?
        .clone();
    if let Some(&column) = REQUIRED_COLUMNS
        .iter()
        .find(|c| !headers.iter().any(|h| h == **c))
    {
        return Err(TrainingDataError::MissingColumn { column });
    }

    let mut records = Vec::new();
    for result in reader.deserialize::<RawOrder>() {
        let raw = result.map_err(|source| TrainingDataError::Malformed {
            line: source.position().map_or(0, |p| p.line()),
            source,
        })?;
        // header occupies line 1
        let line = records.len() as u64 + 2;

        let hour = order_hour(&raw.order_time).ok_or_else(|| TrainingDataError::InvalidTimestamp {
            line,
            value: raw.order_time.clone(),
        })?;

        let features = InferenceRecord {
            distance_km: raw.distance_km,
            order_items: raw.order_items,
            weather: raw.weather,
            traffic: raw.traffic,
            rider_queue: raw.rider_queue,
            prep_time_min: raw.prep_time_min,
            order_hour: i64::from(hour),
        };
        features
            .validate()
            .map_err(|source| TrainingDataError::InvalidRow { line, source })?;

        if !raw.delivery_time_min.is_finite() || raw.delivery_time_min < 0.0 {
            return Err(TrainingDataError::InvalidLabel {
                line,
                value: raw.delivery_time_min,
            });
        }

        records.push(TrainingRecord {
            features,
            delivery_time_min: raw.delivery_time_min,
        });
    }

    if records.is_empty() {
        return Err(TrainingDataError::Empty);
    }
    Ok(records)
}

/// Row indices of each partition, in shuffled order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl SplitIndices {
    /// Seeded shuffle; the first `ceil(n * test_fraction)` indices are held out.
    pub fn new(n: usize, test_fraction: f64, seed: u64) -> Result<Self, TrainingDataError> {
        if !(test_fraction > 0.0 && test_fraction < 1.0) {
            return Err(TrainingDataError::InvalidTestFraction(test_fraction));
        }
        let n_test = (n as f64 * test_fraction).ceil() as usize;
        if n_test == 0 || n_test >= n {
            return Err(TrainingDataError::TooFewRows {
                rows: n,
                test_fraction,
            });
        }

        let mut idx: Vec<usize> = (0..n).collect();
        idx.shuffle(&mut StdRng::seed_from_u64(seed));
        let train = idx.split_off(n_test);
        Ok(Self { train, test: idx })
    }

    pub fn select<'a, T>(indices: &[usize], rows: &'a [T]) -> Vec<&'a T> {
        indices.iter().map(|&i| &rows[i]).collect()
    }
}
