use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

/// Fixed-width and lexically sortable; embedded in every backup filename.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

pub fn timestamp() -> String {
    format_timestamp(&Local::now())
}

pub fn format_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    if value.len() != 15 {
        return None;
    }
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn timestamps_are_fixed_width_and_parse_back() {
        let value = timestamp();
        assert_eq!(value.len(), 15);
        assert_eq!(value.as_bytes()[8], b'_');
        assert!(parse_timestamp(&value).is_some());
    }

    #[test]
    fn lexical_order_matches_time_order() {
        let earlier = Local
            .from_local_datetime(
                &NaiveDate::from_ymd_opt(2024, 1, 9)
                    .and_then(|d| d.and_hms_opt(23, 59, 59))
                    .expect("valid date"),
            )
            .single()
            .expect("unambiguous local time");
        let later = earlier + chrono::Duration::seconds(1);

        let a = format_timestamp(&earlier);
        let b = format_timestamp(&later);
        assert_eq!(a, "20240109_235959");
        assert_eq!(b, "20240110_000000");
        assert!(a < b);
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(parse_timestamp("2024011_120000").is_none());
        assert!(parse_timestamp("20241301_120000").is_none());
        assert!(parse_timestamp("20240101-120000").is_none());
    }
}
