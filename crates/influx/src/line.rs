//! InfluxDB line protocol encoding.
//!
//! `measurement[,tag=value...] field=value[,field=value...] [timestamp_ns]`

use collector_core::{Error, FieldValue, Point, Result};

/// Line breaks become spaces. A run of backslashes directly before a special
/// character or at the end is dropped: it would escape the delimiter after it.
fn escape(s: &str, special: &[char]) -> String {
    let chars: Vec<char> = s
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();

    let mut out = String::with_capacity(s.len());
    for (i, &c) in chars.iter().enumerate() {
        if c == '\\' {
            let next = chars[i..].iter().find(|&&n| n != '\\');
            if next.map_or(true, |n| special.contains(n)) {
                continue;
            }
        }
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn escape_measurement(s: &str) -> String {
    escape(s, &[',', ' '])
}

/// Tag keys, tag values and field keys.
fn escape_key(s: &str) -> String {
    escape(s, &[',', '=', ' '])
}

fn encode_field(key: &str, value: &FieldValue) -> Result<String> {
    let value = match value {
        FieldValue::Integer(v) => format!("{}i", v),
        FieldValue::Float(v) if !v.is_finite() => {
            return Err(Error::invalid_point(format!("field '{}' is not finite", key)));
        }
        FieldValue::Float(v) => format!("{}", v),
        FieldValue::Boolean(v) => v.to_string(),
        FieldValue::String(v) => {
            format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\""))
        }
    };
    Ok(format!("{}={}", escape_key(key), value))
}

/// Encode one point as a line.
///
/// Tags with empty values are left out: the protocol has no empty tag.
pub fn encode_point(point: &Point) -> Result<String> {
    point.validate()?;

    let mut line = escape_measurement(&point.measurement);
    for (key, value) in &point.tags {
        let value = escape_key(value);
        if value.is_empty() {
            continue;
        }
        line.push(',');
        line.push_str(&escape_key(key));
        line.push('=');
        line.push_str(&value);
    }

    let fields = point
        .fields
        .iter()
        .map(|(k, v)| encode_field(k, v))
        .collect::<Result<Vec<_>>>()?;
    line.push(' ');
    line.push_str(&fields.join(","));

    if let Some(ts) = point.timestamp {
        let nanos = ts
            .timestamp_nanos_opt()
            .ok_or_else(|| Error::invalid_point("timestamp out of range"))?;
        line.push(' ');
        line.push_str(&nanos.to_string());
    }

    Ok(line)
}

/// Encode a batch, one line per point.
pub fn encode_batch(points: &[Point]) -> Result<String> {
    let lines = points.iter().map(encode_point).collect::<Result<Vec<_>>>()?;
    Ok(lines.join("\n"))
}
