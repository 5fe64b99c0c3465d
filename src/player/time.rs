//! Clock-style formatting for playback positions.

/// Format a number of seconds as `m:ss`.
///
/// Seconds are floored. NaN, infinite and negative inputs render as `0:00`,
/// which is also what an unknown duration shows.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".to_string();
    }

    let total = seconds.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Format an optional duration, falling back to the zero placeholder
pub fn format_duration(seconds: Option<f64>) -> String {
    seconds.map(format_time).unwrap_or_else(|| format_time(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(f64::NAN), "0:00");
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(65.0), "1:05");
        assert_eq!(format_time(599.9), "9:59");
        assert_eq!(format_time(3600.0), "60:00");
    }

    #[test]
    fn test_format_time_rejects_garbage() {
        assert_eq!(format_time(-3.0), "0:00");
        assert_eq!(format_time(f64::INFINITY), "0:00");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(None), "0:00");
        assert_eq!(format_duration(Some(125.4)), "2:05");
    }
}
