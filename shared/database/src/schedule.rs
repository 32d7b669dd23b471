use campusmentor_common::AppError;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

/// Slots offered on the booking form.
pub const TIME_SLOTS: [&str; 8] = [
    "10:00 AM", "11:00 AM", "12:00 PM", "02:00 PM", "03:00 PM", "04:00 PM", "05:00 PM", "06:00 PM",
];

pub const DEFAULT_DURATION_MINUTES: i32 = 15;

/// Parses a 12-hour clock label such as `"02:15 PM"`.
///
/// `12:xx AM` is hour 0, `12:xx PM` is hour 12, every other PM hour gets 12
/// added.
pub fn parse_clock_label(label: &str) -> Result<NaiveTime, AppError> {
    let invalid = || AppError::Validation(format!("Invalid time slot: {:?}", label));

    let normalized = label.trim().to_ascii_uppercase();
    let (clock, is_pm) = if let Some(clock) = normalized.strip_suffix("PM") {
        (clock.trim_end(), true)
    } else if let Some(clock) = normalized.strip_suffix("AM") {
        (clock.trim_end(), false)
    } else {
        return Err(invalid());
    };

    let (hour, minute) = clock.split_once(':').ok_or_else(invalid)?;
    let hour: u32 = hour.trim().parse().map_err(|_| invalid())?;
    let minute: u32 = minute.trim().parse().map_err(|_| invalid())?;

    if !(1..=12).contains(&hour) || minute > 59 {
        return Err(invalid());
    }

    let hour = match (hour, is_pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, true) => h + 12,
        (h, false) => h,
    };

    NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(invalid)
}

/// Resolves a calendar date plus a clock label, read in `offset`, to an
/// absolute instant.
pub fn resolve_session_time(
    date: NaiveDate,
    label: &str,
    offset: FixedOffset,
) -> Result<DateTime<Utc>, AppError> {
    let time = parse_clock_label(label)?;
    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| AppError::Validation("Session time cannot be resolved".to_string()))
}
