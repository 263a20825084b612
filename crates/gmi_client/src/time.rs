#![forbid(unsafe_code)]

use gmi_contracts::UnixMillis;

const MILLIS_PER_DAY: u64 = 86_400_000;

/// Render a unix-millis instant as `YYYY-MM-DDTHH:MM:SS.mmmZ`, the
/// timestamp format stored on records. Days-to-date is the civil-calendar
/// conversion; inputs are at or after the epoch so no negative-day
/// handling is needed.
pub fn format_utc_iso8601(now: UnixMillis) -> String {
    let days = now.0 / MILLIS_PER_DAY;
    let millis_of_day = now.0 % MILLIS_PER_DAY;

    let (year, month, day) = civil_from_days(days);
    let hour = millis_of_day / 3_600_000;
    let minute = (millis_of_day / 60_000) % 60;
    let second = (millis_of_day / 1_000) % 60;
    let millis = millis_of_day % 1_000;

    format!("{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}.{millis:03}Z")
}

fn civil_from_days(days_since_epoch: u64) -> (u64, u64, u64) {
    let z = days_since_epoch + 719_468;
    let era = z / 146_097;
    let doe = z % 146_097;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let year = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = if month <= 2 { year + 1 } else { year };
    (year, month, day)
}
