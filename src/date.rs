//! Calendar helpers for xBase dates.
//!
//! Dates travel through the engine as `Option<NaiveDate>`; `None` is the
//! blank date stored in an empty date field.

use chrono::{Datelike, Local, NaiveDate, Weekday};

/// Julian day number of 0001-01-01 minus one.
const JULIAN_OFFSET: i64 = 1_721_425;

/// Width of a `CCYYMMDD` date string.
pub const DATE8_LEN: usize = 8;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Today's date on the local clock.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parse an eight digit `CCYYMMDD` string.
pub fn parse_date8(text: &str) -> Option<NaiveDate> {
    if text.len() != DATE8_LEN || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = text[0..4].parse().ok()?;
    let month = text[4..6].parse().ok()?;
    let day = text[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Render as `CCYYMMDD`, or eight blanks for a null date.
pub fn format_date8(date: Option<NaiveDate>) -> String {
    match date {
        Some(d) => d.format("%Y%m%d").to_string(),
        None => " ".repeat(DATE8_LEN),
    }
}

pub fn julian_day(date: NaiveDate) -> i64 {
    date.num_days_from_ce() as i64 + JULIAN_OFFSET
}

pub fn from_julian_day(jd: i64) -> Option<NaiveDate> {
    let days = i32::try_from(jd - JULIAN_OFFSET).ok()?;
    NaiveDate::from_num_days_from_ce_opt(days)
}

/// Day of week counted from Saturday as 0 through Friday as 6.
pub fn day_of_week(date: NaiveDate) -> u32 {
    (date.weekday().num_days_from_sunday() + 1) % 7
}

pub fn day_name(date: NaiveDate) -> &'static str {
    match date.weekday() {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

pub fn month_name(date: NaiveDate) -> &'static str {
    MONTH_NAMES[date.month0() as usize]
}

/// Century for a two digit year using an 80/20 window around `reference_year`.
pub fn rolling_century(two_digit_year: i32, reference_year: i32) -> i32 {
    let this_century = reference_year / 100;
    let this_year = reference_year % 100;
    if this_year < 80 && two_digit_year < this_year + 20 {
        this_century
    } else if this_year >= 80 && two_digit_year < this_year && two_digit_year >= this_year - 80 {
        this_century
    } else {
        this_century - 1
    }
}

/// Mirror a date around 2999-12-31 so that later dates sort first.
pub fn descend(date: NaiveDate) -> Option<NaiveDate> {
    let base = NaiveDate::from_ymd_opt(1900, 1, 1)?;
    let ceiling = NaiveDate::from_ymd_opt(2999, 12, 31)?;
    from_julian_day(julian_day(base) + julian_day(ceiling) - julian_day(date))
}

/// Format a date with an xBase picture such as `MM/DD/YY` or `YYYY-MM-DD`.
///
/// Recognised runs: `YYYY`/`CCYY`, `YY`, `MMMM`, `MMM`, `MM`, `M`, `DDDD`,
/// `DDD`, `DD`, `D`. Everything else is copied through.
pub fn format_picture(date: NaiveDate, picture: &str) -> String {
    let chars: Vec<char> = picture.chars().collect();
    let mut out = String::with_capacity(picture.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let run = chars[i..].iter().take_while(|&&x| x == c).count();
        match c {
            'C' if chars[i + run..].iter().take_while(|&&x| x == 'Y').count() >= 2 => {
                out.push_str(&format!("{:04}", date.year()));
                i += run + 2;
                continue;
            }
            'Y' if run >= 4 => out.push_str(&format!("{:04}", date.year())),
            'Y' if run >= 2 => out.push_str(&format!("{:02}", date.year() % 100)),
            'M' if run >= 4 => out.push_str(month_name(date)),
            'M' if run == 3 => out.push_str(&month_name(date)[..3]),
            'M' if run == 2 => out.push_str(&format!("{:02}", date.month())),
            'M' => out.push_str(&date.month().to_string()),
            'D' if run >= 4 => out.push_str(day_name(date)),
            'D' if run == 3 => out.push_str(&day_name(date)[..3]),
            'D' if run == 2 => out.push_str(&format!("{:02}", date.day())),
            'D' => out.push_str(&date.day().to_string()),
            _ => {
                for _ in 0..run {
                    out.push(c);
                }
            }
        }
        i += run;
    }
    out
}

/// Width of a picture once rendered, counting name runs at their widest.
pub fn picture_width(picture: &str) -> usize {
    match NaiveDate::from_ymd_opt(2000, 9, 13) {
        Some(widest) => format_picture(widest, picture).len(),
        None => picture.len(),
    }
}

/// Parse character date text laid out like `picture`.
///
/// Only the order of the month, day and year fields is taken from the
/// picture; any non-digit character separates fields. Two digit years are
/// placed with [`rolling_century`].
pub fn parse_picture(text: &str, picture: &str, reference_year: i32) -> Option<NaiveDate> {
    let mut order = Vec::with_capacity(3);
    for c in picture.chars() {
        let c = if c == 'C' { 'Y' } else { c };
        if matches!(c, 'M' | 'D' | 'Y') && order.last() != Some(&c) {
            order.push(c);
        }
    }
    if order.len() != 3 {
        return None;
    }

    let fields: Vec<&str> = text
        .trim()
        .split(|c: char| !c.is_ascii_digit())
        .filter(|s| !s.is_empty())
        .collect();
    if fields.len() != 3 {
        return None;
    }

    let (mut year, mut month, mut day) = (None, None, None);
    for (kind, field) in order.iter().zip(fields) {
        match kind {
            'Y' => {
                let value: i32 = field.parse().ok()?;
                year = Some(if field.len() <= 2 {
                    rolling_century(value, reference_year) * 100 + value
                } else {
                    value
                });
            }
            'M' => month = field.parse().ok(),
            _ => day = field.parse().ok(),
        }
    }
    NaiveDate::from_ymd_opt(year?, month?, day?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_date8_round_trip() {
        assert_eq!(parse_date8("20171014"), Some(ymd(2017, 10, 14)));
        assert_eq!(parse_date8("20170230"), None);
        assert_eq!(parse_date8("2017101"), None);
        assert_eq!(format_date8(Some(ymd(1989, 3, 3))), "19890303");
        assert_eq!(format_date8(None), "        ");
    }

    #[test]
    fn test_julian_day() {
        assert_eq!(julian_day(ymd(1900, 1, 1)), 2_415_021);
        assert_eq!(from_julian_day(2_415_021), Some(ymd(1900, 1, 1)));
        assert_eq!(julian_day(ymd(2012, 7, 8)) - julian_day(ymd(1989, 3, 3)), 8528);
    }

    #[test]
    fn test_day_of_week() {
        assert_eq!(day_of_week(ymd(2017, 10, 17)), 3);
        assert_eq!(day_of_week(ymd(2017, 10, 21)), 0);
        assert_eq!(day_of_week(ymd(2017, 10, 15)), 1);
        assert_eq!(day_name(ymd(2017, 10, 14)), "Saturday");
        assert_eq!(month_name(ymd(2017, 11, 1)), "November");
    }

    #[test]
    fn test_rolling_century() {
        assert_eq!(rolling_century(30, 2017), 20);
        assert_eq!(rolling_century(37, 2017), 19);
        assert_eq!(rolling_century(89, 2017), 19);
        assert_eq!(rolling_century(50, 1985), 19);
        assert_eq!(rolling_century(90, 1985), 18);
    }

    #[test]
    fn test_descend() {
        assert_eq!(descend(ymd(1989, 3, 3)), Some(ymd(2910, 10, 31)));
    }

    #[test]
    fn test_format_picture() {
        let d = ymd(2017, 10, 14);
        assert_eq!(format_picture(d, "MM/DD/YY"), "10/14/17");
        assert_eq!(format_picture(d, "YYYYMMDD"), "20171014");
        assert_eq!(format_picture(d, "CCYY-MM-DD"), "2017-10-14");
        assert_eq!(format_picture(d, "DDD MMM D"), "Sat Oct 14");
        assert_eq!(picture_width("MM/DD/YY"), 8);
    }

    #[test]
    fn test_parse_picture() {
        assert_eq!(parse_picture("10/14/17", "MM/DD/YY", 2017), Some(ymd(2017, 10, 14)));
        assert_eq!(parse_picture("03\\03\\89", "MM/DD/YY", 2017), Some(ymd(1989, 3, 3)));
        assert_eq!(parse_picture("2017-10-14", "YYYY-MM-DD", 2017), Some(ymd(2017, 10, 14)));
        assert_eq!(parse_picture("13/40/17", "MM/DD/YY", 2017), None);
        assert_eq!(parse_picture("  /  /  ", "MM/DD/YY", 2017), None);
    }
}
