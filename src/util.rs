use chrono::format::{DelayedFormat, StrftimeItems};
use rand::Rng;
use std::time::Duration;

/// Gets the time in a pretty format. Ideal for logging.
///
/// # Returns
/// The formatted time, e.g. `02/05 11:23:15 PM`
#[inline]
pub fn get_pretty_time() -> DelayedFormat<StrftimeItems<'static>> {
    let time = chrono::offset::Local::now();
    time.format("%m/%d %I:%M:%S %p")
}

/// Returns the number of non-leap-milliseconds since January 1, 1970 UTC
///
/// This is essentially just an alias for `chrono::offset::Local.now().timestamp_millis`.
///
/// # Returns
/// The number of non-leap-milliseconds since January 1, 1970 UTC.
#[inline]
pub fn get_epoch_time() -> i64 {
    chrono::offset::Local::now().timestamp_millis()
}

/// `base` plus a small fixed 50-200ms jitter, independent of `base`'s magnitude.
pub fn jitter(base: Duration) -> Duration {
    base + Duration::from_millis(rand::thread_rng().gen_range(50..=200))
}

/// A small random delay in the given millisecond range, used to stagger crawl batches.
pub fn random_delay(lo_ms: u64, hi_ms: u64) -> Duration {
    Duration::from_millis(rand::thread_rng().gen_range(lo_ms..=hi_ms))
}

/// A course code is four uppercase letters, four digits, and an optional trailing
/// uppercase letter (e.g. `CSSE1001`, `MATH1051A`).
pub fn is_course_code(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != 8 && bytes.len() != 9 {
        return false;
    }
    let prefix_ok = bytes[0..4].iter().all(|b| b.is_ascii_uppercase());
    let digits_ok = bytes[4..8].iter().all(|b| b.is_ascii_digit());
    let suffix_ok = bytes.len() == 8 || bytes[8].is_ascii_uppercase();
    prefix_ok && digits_ok && suffix_ok
}

/// A "level-7" course is one whose first digit (the fifth character of the code) is `7`.
/// These are postgraduate courses and are excluded from every output.
pub fn is_level_7(code: &str) -> bool {
    code.as_bytes().get(4).map(|b| *b == b'7').unwrap_or(false)
}

/// The numeric level of a course code (the four digits after the subject prefix), used
/// for level-range filtering during seed harvest.
pub fn course_level(code: &str) -> Option<u32> {
    code.get(4..8)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_course_codes() {
        assert!(is_course_code("CSSE1001"));
        assert!(is_course_code("MATH1051A"));
        assert!(!is_course_code("csse1001"));
        assert!(!is_course_code("CSSE100"));
        assert!(!is_course_code("TOO_LONG_CODE"));
    }

    #[test]
    fn detects_level_7() {
        assert!(is_level_7("CSSE7030"));
        assert!(!is_level_7("CSSE1001"));
    }

    #[test]
    fn extracts_level() {
        assert_eq!(course_level("MATH1051"), Some(1051));
        assert_eq!(course_level("X"), None);
    }
}
