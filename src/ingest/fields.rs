use super::IngestError;
use serde::Deserialize;
use serde_json::Value;

/// Free-text description
pub const FIELD_DESCRIPTION: i64 = 1;
/// Trail length in kilometres
pub const FIELD_LENGTH: i64 = 99;
/// Water temperature sensor device name
pub const FIELD_TEMPERATURE_SENSOR: i64 = 230;

#[derive(Debug, Deserialize)]
struct FieldEntry {
    id: i64,
    #[serde(default)]
    value: Value,
}

/// Attributes recognised in a feature's field list
#[derive(Debug, Default, PartialEq)]
pub struct Attributes {
    pub description: Option<String>,
    /// Device name without namespace prefix
    pub sensor: Option<String>,
    pub length: Option<f64>,
}

/// Maps known field ids to attributes, ignoring everything else.
pub fn extract(feature_id: i64, fields: Value) -> Result<Attributes, IngestError> {
    if fields.is_null() {
        return Ok(Attributes::default());
    }

    let entries: Vec<FieldEntry> =
        serde_json::from_value(fields).map_err(|e| IngestError::MalformedAttributes {
            feature_id,
            reason: e.to_string(),
        })?;

    let mut attributes = Attributes::default();

    for entry in entries {
        match entry.id {
            FIELD_DESCRIPTION => {
                attributes.description = text_value(feature_id, entry.id, &entry.value)?;
            }
            FIELD_TEMPERATURE_SENSOR => {
                attributes.sensor = text_value(feature_id, entry.id, &entry.value)?;
            }
            FIELD_LENGTH => {
                attributes.length = numeric_value(feature_id, entry.id, &entry.value)?;
            }
            _ => {}
        }
    }

    Ok(attributes)
}

fn text_value(feature_id: i64, field_id: i64, value: &Value) -> Result<Option<String>, IngestError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s.trim().to_string())),
        other => Err(IngestError::MalformedAttributes {
            feature_id,
            reason: format!("field {} expected text, got {}", field_id, other),
        }),
    }
}

fn numeric_value(feature_id: i64, field_id: i64, value: &Value) -> Result<Option<f64>, IngestError> {
    let malformed = |reason: String| IngestError::MalformedAttributes { feature_id, reason };

    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| malformed(format!("field {} is not a finite number", field_id))),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        // Feed editors use a decimal comma
        Value::String(s) => s
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| malformed(format!("field {} expected a number, got '{}'", field_id, s))),
        other => Err(malformed(format!(
            "field {} expected a number, got {}",
            field_id, other
        ))),
    }
}
