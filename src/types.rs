use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SchemaError;

/// One order as supplied at prediction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRecord {
    pub distance_km: f64,
    pub order_items: i64,
    pub weather: String,
    pub traffic: i64,
    pub rider_queue: i64,
    pub prep_time_min: i64,
    pub order_hour: i64, // 0..=23, derived from order_time during training
}

/// Historical order with its observed delivery time.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingRecord {
    pub features: InferenceRecord,
    pub delivery_time_min: f64,
}

impl InferenceRecord {
    /// Builds a typed record from a loosely-typed JSON object, reporting the
    /// first offending field.
    pub fn from_json(value: &Value) -> Result<Self, SchemaError> {
        let obj = value.as_object().ok_or(SchemaError::NotAnObject)?;

        let record = Self {
            distance_km: number(obj, "distance_km")?,
            order_items: integer(obj, "order_items")?,
            weather: text(obj, "weather")?,
            traffic: integer(obj, "traffic")?,
            rider_queue: integer(obj, "rider_queue")?,
            prep_time_min: integer(obj, "prep_time_min")?,
            order_hour: integer(obj, "order_hour")?,
        };
        record.validate()?;
        Ok(record)
    }

    /// Range checks shared by the serving and training paths.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if !self.distance_km.is_finite() || self.distance_km <= 0.0 {
            return Err(out_of_range("distance_km", self.distance_km, "> 0"));
        }
        if self.order_items < 1 {
            return Err(out_of_range("order_items", self.order_items, ">= 1"));
        }
        if self.rider_queue < 0 {
            return Err(out_of_range("rider_queue", self.rider_queue, ">= 0"));
        }
        if self.prep_time_min < 0 {
            return Err(out_of_range("prep_time_min", self.prep_time_min, ">= 0"));
        }
        if !(0..=23).contains(&self.order_hour) {
            return Err(out_of_range("order_hour", self.order_hour, "0..=23"));
        }
        Ok(())
    }
}

fn out_of_range(field: &'static str, value: impl ToString, expected: &'static str) -> SchemaError {
    SchemaError::OutOfRange {
        field,
        value: value.to_string(),
        expected,
    }
}

fn present<'a>(obj: &'a Map<String, Value>, field: &'static str) -> Result<&'a Value, SchemaError> {
    match obj.get(field) {
        None | Some(Value::Null) => Err(SchemaError::MissingField { field }),
        Some(v) => Ok(v),
    }
}

fn number(obj: &Map<String, Value>, field: &'static str) -> Result<f64, SchemaError> {
    let v = present(obj, field)?;
    v.as_f64().ok_or_else(|| SchemaError::NotNumeric {
        field,
        value: v.to_string(),
    })
}

fn integer(obj: &Map<String, Value>, field: &'static str) -> Result<i64, SchemaError> {
    let v = present(obj, field)?;
    if let Some(i) = v.as_i64() {
        return Ok(i);
    }
    let f = number(obj, field)?;
    // 3.0 is accepted as 3; anything with a fractional part is not
    if f.fract() != 0.0 || f.abs() > i64::MAX as f64 {
        return Err(SchemaError::NotInteger { field, value: f });
    }
    Ok(f as i64)
}

fn text(obj: &Map<String, Value>, field: &'static str) -> Result<String, SchemaError> {
    present(obj, field)?
        .as_str()
        .map(str::to_owned)
        .ok_or(SchemaError::NotText { field })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid() -> Value {
        json!({
            "distance_km": 5.0,
            "order_items": 3,
            "weather": "clear",
            "traffic": 2,
            "rider_queue": 1,
            "prep_time_min": 10,
            "order_hour": 18
        })
    }

    #[test]
    fn parses_valid_record() {
        let r = InferenceRecord::from_json(&valid()).unwrap();
        assert_eq!(r.distance_km, 5.0);
        assert_eq!(r.weather, "clear");
        assert_eq!(r.order_hour, 18);
    }

    #[test]
    fn missing_prep_time_is_schema_error() {
        let mut v = valid();
        v.as_object_mut().unwrap().remove("prep_time_min");
        assert_eq!(
            InferenceRecord::from_json(&v),
            Err(SchemaError::MissingField {
                field: "prep_time_min"
            })
        );
    }

    #[test]
    fn null_counts_as_missing() {
        let mut v = valid();
        v["traffic"] = Value::Null;
        assert!(matches!(
            InferenceRecord::from_json(&v),
            Err(SchemaError::MissingField { field: "traffic" })
        ));
    }

    #[test]
    fn order_hour_bounds() {
        let mut v = valid();
        v["order_hour"] = json!(24);
        assert!(matches!(
            InferenceRecord::from_json(&v),
            Err(SchemaError::OutOfRange {
                field: "order_hour",
                ..
            })
        ));

        v["order_hour"] = json!(23);
        assert!(InferenceRecord::from_json(&v).is_ok());

        v["order_hour"] = json!(-1);
        assert!(InferenceRecord::from_json(&v).is_err());
    }

    #[test]
    fn non_numeric_and_fractional_values_rejected() {
        let mut v = valid();
        v["distance_km"] = json!("far");
        assert!(matches!(
            InferenceRecord::from_json(&v),
            Err(SchemaError::NotNumeric {
                field: "distance_km",
                ..
            })
        ));

        let mut v = valid();
        v["order_items"] = json!(2.5);
        assert!(matches!(
            InferenceRecord::from_json(&v),
            Err(SchemaError::NotInteger {
                field: "order_items",
                ..
            })
        ));

        let mut v = valid();
        v["order_items"] = json!(2.0);
        assert_eq!(InferenceRecord::from_json(&v).unwrap().order_items, 2);
    }

    #[test]
    fn weather_must_be_text() {
        let mut v = valid();
        v["weather"] = json!(7);
        assert_eq!(
            InferenceRecord::from_json(&v),
            Err(SchemaError::NotText { field: "weather" })
        );
    }

    #[test]
    fn rejects_non_object() {
        assert_eq!(
            InferenceRecord::from_json(&json!([1, 2, 3])),
            Err(SchemaError::NotAnObject)
        );
    }
}
