//! CSV line rendering
//!
//! Fields are numeric only, so no quoting or escaping is needed. Floats use
//! Rust's shortest round-trip form, always with a fractional part
//! (`0.0`, `12.5`).

use super::reading::Reading;

macro_rules! header {
    () => {
        "latitude,longitude,altitude,accuracy,speed,bearing,timestamp_ns"
    };
}

/// Column names, without the trailing newline
pub const HEADER: &str = header!();

/// Header line as written to the file
pub const HEADER_LINE: &str = concat!(header!(), "\n");

const SEPARATOR: char = ',';

/// Render one reading as a newline-terminated line
pub fn format_reading(reading: &Reading) -> String {
    // `{:?}` on floats gives the shortest representation that parses back exactly
    format!(
        "{:?}{sep}{:?}{sep}{:?}{sep}{:?}{sep}{:?}{sep}{:?}{sep}{}\n",
        reading.latitude,
        reading.longitude,
        reading.altitude,
        reading.accuracy,
        reading.speed,
        reading.bearing,
        reading.timestamp_ns,
        sep = SEPARATOR,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::traits::RawLocation;
    use crate::recorder::reading::normalize;

    #[test]
    fn test_header_line_matches_columns() {
        assert_eq!(HEADER_LINE, format!("{}\n", HEADER));
        assert_eq!(HEADER.split(',').count(), 7);
    }

    #[test]
    fn test_unavailable_fields_render_as_zero() {
        let raw = RawLocation {
            elapsed_realtime_nanos: Some(123_456_789),
            ..RawLocation::new(45.5, -73.25, 0)
        };
        let line = format_reading(&normalize(&raw));
        assert_eq!(line, "45.5,-73.25,0.0,0.0,0.0,0.0,123456789\n");
    }

    #[test]
    fn test_fields_parse_back_exactly() {
        let raw = RawLocation {
            latitude: 52.520008,
            longitude: 13.404954,
            altitude: Some(34.123456789),
            accuracy: Some(4.7),
            speed: Some(0.1),
            bearing: Some(359.9),
            time_ms: 0,
            elapsed_realtime_nanos: Some(1),
        };
        let reading = normalize(&raw);
        let line = format_reading(&reading);
        let fields: Vec<&str> = line.trim_end().split(',').collect();
        assert_eq!(fields.len(), 7);
        assert_eq!(fields[0].parse::<f64>().unwrap(), reading.latitude);
        assert_eq!(fields[2].parse::<f64>().unwrap(), reading.altitude);
        assert_eq!(fields[3].parse::<f32>().unwrap(), reading.accuracy);
        assert_eq!(fields[5].parse::<f32>().unwrap(), reading.bearing);
        assert_eq!(fields[6], "1");
    }

    #[test]
    fn test_integral_values_keep_fraction() {
        let raw = RawLocation {
            altitude: Some(100.0),
            elapsed_realtime_nanos: Some(5),
            ..RawLocation::new(10.0, 20.0, 0)
        };
        let line = format_reading(&normalize(&raw));
        assert!(line.starts_with("10.0,20.0,100.0,"));
    }
}
