use std::time::Duration;

const NANOS_PER_MILLI: u128 = 1_000_000;

/// `MM:SS.mmm`, rounded half-up to the millisecond. Minutes are not capped at 59.
pub fn format_duration(duration: Duration) -> String {
    let millis = (duration.as_nanos() + NANOS_PER_MILLI / 2) / NANOS_PER_MILLI;
    let minutes = millis / 60_000;
    let seconds = (millis / 1_000) % 60;
    format!("{minutes:02}:{seconds:02}.{:03}", millis % 1_000)
}

pub fn format_millis(millis: u64) -> String {
    format_duration(Duration::from_millis(millis))
}

/// For averages, which carry fractions of a millisecond.
pub fn format_millis_f64(millis: f64) -> String {
    format_duration(Duration::try_from_secs_f64(millis / 1_000.0).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::ZERO), "00:00.000");
        assert_eq!(
            format_duration(Duration::from_secs(75 * 60 + 30)),
            "75:30.000"
        );
        assert_eq!(format_duration(Duration::from_micros(1_000_500)), "00:01.001");
        assert_eq!(format_duration(Duration::from_micros(1_000_400)), "00:01.000");
        assert_eq!(format_duration(Duration::from_micros(59_999_600)), "01:00.000");
    }

    #[test]
    fn test_format_millis() {
        assert_eq!(format_millis(61_234), "01:01.234");
        assert_eq!(format_millis_f64(1_500.4), "00:01.500");
        assert_eq!(format_millis_f64(-3.0), "00:00.000");
    }
}
