use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, Offset, Utc};

/// Format used for week keys (`2025-01-06`).
pub const WEEK_KEY_FORMAT: &str = "%Y-%m-%d";

/// Monday on or before `date`.
///
/// ```
/// use chrono::NaiveDate;
/// use mini_2048::leaderboard::week_start;
/// let sunday = NaiveDate::from_ymd_opt(2025, 1, 12).unwrap();
/// assert_eq!(week_start(sunday), NaiveDate::from_ymd_opt(2025, 1, 6).unwrap());
/// ```
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_monday()))
}

/// Week start of `now` as seen from a fixed UTC offset (in minutes).
///
/// Offsets outside ±24h fall back to UTC.
pub fn week_bucket(now: DateTime<Utc>, utc_offset_minutes: i32) -> NaiveDate {
    let offset = utc_offset_minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix());
    week_start(now.with_timezone(&offset).date_naive())
}

/// `YYYY-MM-DD` key of the week containing `date`.
pub fn week_key(date: NaiveDate) -> String {
    week_start(date).format(WEEK_KEY_FORMAT).to_string()
}

/// Parse a week key (or any date) back into the week's Monday.
pub fn parse_week(s: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(s.trim(), WEEK_KEY_FORMAT).map(week_start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn every_day_maps_to_its_monday() {
        let monday = d(2024, 12, 30);
        for offset in 0..7 {
            assert_eq!(week_start(monday + Days::new(offset)), monday);
        }
        assert_eq!(week_start(d(2025, 1, 6)), d(2025, 1, 6));
        assert_eq!(week_key(d(2025, 1, 1)), "2024-12-30");
    }

    #[test]
    fn bucket_respects_offset() {
        // Sunday 20:00 UTC is already Monday in UTC+5:30.
        let now = Utc.with_ymd_and_hms(2025, 1, 12, 20, 0, 0).unwrap();
        assert_eq!(week_bucket(now, 0), d(2025, 1, 6));
        assert_eq!(week_bucket(now, 330), d(2025, 1, 13));
        assert_eq!(week_bucket(now, 100_000), d(2025, 1, 6));
    }

    #[test]
    fn parse_roundtrips_to_monday() {
        assert_eq!(parse_week("2025-01-08").unwrap(), d(2025, 1, 6));
        assert!(parse_week("last week").is_err());
    }
}
