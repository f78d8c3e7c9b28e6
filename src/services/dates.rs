// src/services/dates.rs
use chrono::{Days, NaiveDate, Utc};
use chrono_tz::Tz;
use regex::Regex;
use std::sync::OnceLock;

/// Timezone every staleness check is evaluated in.
pub const MARKET_TZ: Tz = chrono_tz::America::New_York;

const EXTERNAL_FORMAT: &str = "%d/%m/%Y";
const INTERNAL_FORMAT: &str = "%Y-%m-%d";

fn external_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{2}/\d{2}/\d{4}$").expect("valid date regex"))
}

fn internal_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date regex"))
}

pub fn parse_external(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if !external_re().is_match(s) {
        return None;
    }
    NaiveDate::parse_from_str(s, EXTERNAL_FORMAT).ok()
}

pub fn parse_internal(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if !internal_re().is_match(s) {
        return None;
    }
    NaiveDate::parse_from_str(s, INTERNAL_FORMAT).ok()
}

pub fn format_external(date: NaiveDate) -> String {
    date.format(EXTERNAL_FORMAT).to_string()
}

pub fn format_internal(date: NaiveDate) -> String {
    date.format(INTERNAL_FORMAT).to_string()
}

/// "DD/MM/YYYY" -> "YYYY-MM-DD", `None` when the input is not a valid date.
pub fn to_internal(s: &str) -> Option<String> {
    parse_external(s).map(format_internal)
}

/// "YYYY-MM-DD" -> "DD/MM/YYYY", `None` when the input is not a valid date.
pub fn to_external(s: &str) -> Option<String> {
    parse_internal(s).map(format_external)
}

pub fn today(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

pub fn today_internal(tz: Tz) -> String {
    format_internal(today(tz))
}

/// One week either side of `today`, the window the tabular source is queried with.
pub fn lookup_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = today.checked_sub_days(Days::new(7)).unwrap_or(today);
    let end = today.checked_add_days(Days::new(7)).unwrap_or(today);
    (start, end)
}
