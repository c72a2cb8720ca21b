use chrono::DateTime;
use chrono_tz::Tz;
use indexmap::IndexMap;
use tracing::debug;

use crate::schema;

/// A parsed field value. Unit-label lines parse as `Text`, measurement lines
/// as `Number`; schema fields absent from a batch are stored as `Missing`
/// rather than omitted.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Missing,
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }
}

/// One timestamped snapshot of all channels from one poll cycle. Every field
/// in [`schema::FIELDS`] is present, in schema order.
#[derive(Debug, Clone)]
pub struct Reading {
    pub recorded_at: DateTime<Tz>,

    pub fields: IndexMap<&'static str, Value>,
}

impl Reading {
    /// Builds a reading from a parsed field map, filling every schema field
    /// absent from the map with [`Value::Missing`]. Keys the schema does not
    /// recognize are dropped.
    pub fn from_parsed(
        recorded_at: DateTime<Tz>,
        mut parsed: IndexMap<String, Value>,
    ) -> Self {
        let fields = schema::FIELDS
            .iter()
            .map(|&field| {
                let value = parsed.shift_remove(field).unwrap_or(Value::Missing);
                (field, value)
            })
            .collect();

        for key in parsed.keys() {
            debug!("dropping field not in schema: {key}");
        }

        Self {
            recorded_at,
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use chrono_tz::Tz;

    use super::*;

    fn timestamp() -> DateTime<Tz> {
        chrono_tz::UTC.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn fills_absent_schema_fields_with_missing() {
        let mut parsed = IndexMap::new();
        parsed.insert("co2".to_string(), Value::Number(812.3));
        parsed.insert("co2_unit".to_string(), Value::Text("ppm".to_string()));

        let reading = Reading::from_parsed(timestamp(), parsed);

        assert_eq!(reading.fields.len(), schema::FIELDS.len());
        assert_eq!(reading.get("co2"), Some(&Value::Number(812.3)));
        assert_eq!(
            reading.get("co2_unit"),
            Some(&Value::Text("ppm".to_string()))
        );
        assert_eq!(reading.get("humidity"), Some(&Value::Missing));
        assert_eq!(
            reading.fields.values().filter(|v| !v.is_missing()).count(),
            2
        );
    }

    #[test]
    fn drops_keys_outside_schema() {
        let mut parsed = IndexMap::new();
        parsed.insert("not_a_channel".to_string(), Value::Number(1.0));

        let reading = Reading::from_parsed(timestamp(), parsed);

        assert!(reading.get("not_a_channel").is_none());
        assert!(reading.fields.values().all(Value::is_missing));
    }

    #[test]
    fn fields_follow_schema_order() {
        let reading = Reading::from_parsed(timestamp(), IndexMap::new());
        let keys: Vec<&str> = reading.fields.keys().copied().collect();
        assert_eq!(keys, schema::FIELDS);
    }
}
