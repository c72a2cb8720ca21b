use indexmap::IndexMap;
use tracing::warn;

use crate::reading::Value;

/// Parses one batch of raw sensor lines into a field map.
///
/// Lines are expected as `KEY: VALUE` or `"KEY": "VALUE"`, optionally with a
/// trailing comma. Values that parse as `f64` become [`Value::Number`], the
/// rest are kept as [`Value::Text`]. Malformed lines are logged and skipped;
/// they never abort the rest of the batch, since line loss and corruption are
/// expected on the wire.
pub fn parse_lines<I, S>(lines: I) -> IndexMap<String, Value>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut fields = IndexMap::new();

    for line in lines {
        let line = line.as_ref().trim().trim_matches(',');

        let Some((key, value)) = line.split_once(':') else {
            if !line.is_empty() {
                warn!("skipping invalid line: {line}");
            }
            continue;
        };

        let key = key.trim().trim_matches('"');
        let value = value.trim().trim_matches('"');

        let parsed = match value.parse::<f64>() {
            Ok(number) => Value::Number(number),
            Err(_) => Value::Text(value.to_string()),
        };

        fields.insert(key.to_string(), parsed);
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_and_unquoted_forms_parse_identically() {
        let quoted = parse_lines(["\"co2\": \"812.3\""]);
        let unquoted = parse_lines(["co2: 812.3"]);

        assert_eq!(quoted, unquoted);
        assert_eq!(quoted.get("co2"), Some(&Value::Number(812.3)));
    }

    #[test]
    fn trailing_commas_are_stripped() {
        let fields = parse_lines(["\"temperature\": \"22.1\","]);
        assert_eq!(fields.get("temperature"), Some(&Value::Number(22.1)));
    }

    #[test]
    fn non_numeric_values_are_kept_as_text() {
        let fields = parse_lines(["\"co2_unit\": \"ppm\""]);
        assert_eq!(
            fields.get("co2_unit"),
            Some(&Value::Text("ppm".to_string()))
        );
    }

    #[test]
    fn malformed_lines_never_suppress_valid_ones() {
        let fields = parse_lines([
            "\"co2\": \"812.3\"",
            "\"temperature\": \"22.1\"",
            "garbage_no_colon",
            "\"humidity\": \"41\"",
        ]);

        assert_eq!(fields.len(), 3);
        assert_eq!(fields.get("co2"), Some(&Value::Number(812.3)));
        assert_eq!(fields.get("temperature"), Some(&Value::Number(22.1)));
        assert_eq!(fields.get("humidity"), Some(&Value::Number(41.0)));
        assert!(fields.get("garbage_no_colon").is_none());
    }

    #[test]
    fn empty_and_whitespace_lines_are_skipped() {
        let fields = parse_lines(["", "   ", ",", "co2: 400"]);
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn splits_on_first_colon_only() {
        let fields = parse_lines(["note: reboot at 12:30"]);
        assert_eq!(
            fields.get("note"),
            Some(&Value::Text("reboot at 12:30".to_string()))
        );
    }
}
