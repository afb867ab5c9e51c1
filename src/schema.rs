//! The one authoritative description of the feature layout.
//!
//! Both the training path and the serving path read column order from here;
//! a copy is persisted inside every artifact and compared on load.

use serde::{Deserialize, Serialize};

use crate::types::InferenceRecord;

/// Training label column.
pub const LABEL_COLUMN: &str = "delivery_time_min";

/// Raw timestamp column `order_hour` is derived from.
pub const TIMESTAMP_COLUMN: &str = "order_time";

/// Columns consumed during data preparation and never encoded.
pub const EXCLUDED_COLUMNS: [&str; 2] = ["order_id", TIMESTAMP_COLUMN];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoricalField {
    Weather,
}

impl CategoricalField {
    pub const ALL: [CategoricalField; 1] = [CategoricalField::Weather];

    pub fn name(self) -> &'static str {
        match self {
            CategoricalField::Weather => "weather",
        }
    }

    pub fn value(self, record: &InferenceRecord) -> &str {
        match self {
            CategoricalField::Weather => &record.weather,
        }
    }
}

/// Numeric passthrough columns. Declaration order of `ALL` is the output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericField {
    DistanceKm,
    OrderItems,
    Traffic,
    RiderQueue,
    PrepTimeMin,
    OrderHour,
}

impl NumericField {
    pub const ALL: [NumericField; 6] = [
        NumericField::DistanceKm,
        NumericField::OrderItems,
        NumericField::Traffic,
        NumericField::RiderQueue,
        NumericField::PrepTimeMin,
        NumericField::OrderHour,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NumericField::DistanceKm => "distance_km",
            NumericField::OrderItems => "order_items",
            NumericField::Traffic => "traffic",
            NumericField::RiderQueue => "rider_queue",
            NumericField::PrepTimeMin => "prep_time_min",
            NumericField::OrderHour => "order_hour",
        }
    }

    pub fn value(self, record: &InferenceRecord) -> f64 {
        match self {
            NumericField::DistanceKm => record.distance_km,
            NumericField::OrderItems => record.order_items as f64,
            NumericField::Traffic => record.traffic as f64,
            NumericField::RiderQueue => record.rider_queue as f64,
            NumericField::PrepTimeMin => record.prep_time_min as f64,
            NumericField::OrderHour => record.order_hour as f64,
        }
    }
}

/// Serializable snapshot of the field layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub categorical: Vec<String>,
    pub numeric: Vec<String>,
}

impl FeatureSchema {
    /// Layout compiled into this build.
    pub fn current() -> Self {
        Self {
            categorical: CategoricalField::ALL
                .iter()
                .map(|f| f.name().to_string())
                .collect(),
            numeric: NumericField::ALL
                .iter()
                .map(|f| f.name().to_string())
                .collect(),
        }
    }

    /// Describes the first difference against the compiled layout, if any.
    pub fn diff_against_current(&self) -> Option<String> {
        let current = Self::current();
        if self.categorical != current.categorical {
            return Some(format!(
                "categorical fields {:?} != {:?}",
                self.categorical, current.categorical
            ));
        }
        if self.numeric != current.numeric {
            return Some(format!(
                "numeric fields {:?} != {:?}",
                self.numeric, current.numeric
            ));
        }
        None
    }
}
