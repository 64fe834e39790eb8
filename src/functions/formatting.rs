use chrono::{DateTime, Timelike, Utc};

/// Whole percent of `part` in `total`, 0 when `total` is 0.
#[inline]
pub fn percent(part: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    ((f64::from(part) / f64::from(total)) * 100.0).round() as u32
}

/// "HH:00" label for an hour of the day.
#[inline]
pub fn hour_label(hour: u32) -> String {
    format!("{:02}:00", hour % 24)
}

/// Labels for the `count` hours ending with the hour of `now`, oldest first.
pub fn trailing_hour_labels(now: DateTime<Utc>, count: usize) -> Vec<String> {
    let current = now.hour() as i64;
    (0..count as i64)
        .rev()
        .map(|back| hour_label((current - back).rem_euclid(24) as u32))
        .collect()
}

/// "HH:MM" clock time, used for the estimated completion.
#[inline]
pub fn clock_time(at: DateTime<Utc>) -> String {
    at.format("%H:%M").to_string()
}

#[inline]
pub fn rate(value: f64) -> String {
    format!("{value:.0} cars/h")
}
