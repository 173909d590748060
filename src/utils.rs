use std::time::{Duration, UNIX_EPOCH};

/// Formats a millisecond timestamp as `HH:MM:SS.mmm` (UTC) for log lines.
pub fn format_timestamp(timestamp_ms: i64) -> String {
    if timestamp_ms < 0 {
        return format!("Invalid timestamp: {}", timestamp_ms);
    }

    match UNIX_EPOCH.checked_add(Duration::from_millis(timestamp_ms as u64)) {
        Some(system_time) => match system_time.duration_since(UNIX_EPOCH) {
            Ok(d) => {
                let total_ms = d.as_millis();
                let seconds = total_ms / 1000;
                let ms = total_ms % 1000;

                let hours = (seconds / 3600) % 24;
                let minutes = (seconds / 60) % 60;
                let secs = seconds % 60;

                format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, ms)
            }
            Err(_) => format!("Invalid timestamp: {}", timestamp_ms),
        },
        None => format!("Invalid timestamp: {}", timestamp_ms),
    }
}

/// Arithmetic mean; 0.0 for an empty input.
pub fn mean<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Population variance; 0.0 for an empty input.
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let avg = mean(values.iter().copied());
    values.iter().map(|v| (v - avg) * (v - avg)).sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "00:00:00.000");
        assert_eq!(format_timestamp(3_723_004), "01:02:03.004");
        assert!(format_timestamp(-5).starts_with("Invalid"));
    }

    #[test]
    fn test_mean_and_variance() {
        assert_eq!(mean(Vec::<f64>::new()), 0.0);
        assert_eq!(variance(&[]), 0.0);

        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((mean(values.iter().copied()) - 5.0).abs() < 1e-12);
        assert!((variance(&values) - 4.0).abs() < 1e-12);
    }
}
