use lazy_static::lazy_static;
use regex::Regex;
use time::{macros::format_description, Date};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Birth dates arrive as `YYYY-MM-DD`; anything else is a validation error.
pub(crate) fn parse_birth_date(raw: &str) -> Result<Date, time::error::Parse> {
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
}

/// Calendar-correct age: subtract the birth year, minus one if the birthday
/// hasn't occurred yet this year.
pub(crate) fn age_on(today: Date, birth: Date) -> i32 {
    let mut age = today.year() - birth.year();
    if (today.month() as u8, today.day()) < (birth.month() as u8, birth.day()) {
        age -= 1;
    }
    age
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn accepts_plain_addresses() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("user.name+tag@sub.example.co"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("user@nodot"));
        assert!(!is_valid_email("spaces in@example.com"));
        assert!(!is_valid_email("user@@example.com"));
    }

    #[test]
    fn parses_iso_dates_only() {
        assert_eq!(parse_birth_date("1990-06-15").unwrap(), date!(1990 - 06 - 15));
        assert!(parse_birth_date("15/06/1990").is_err());
        assert!(parse_birth_date("1990-13-01").is_err());
        assert!(parse_birth_date("yesterday").is_err());
    }

    #[test]
    fn age_counts_completed_years() {
        let today = date!(2026 - 08 - 06);
        assert_eq!(age_on(today, date!(1990 - 06 - 15)), 36);
        assert_eq!(age_on(today, date!(1990 - 12 - 31)), 35);
    }

    #[test]
    fn eighteenth_birthday_is_the_boundary() {
        let today = date!(2026 - 08 - 06);
        // exactly 18 today: accepted
        assert_eq!(age_on(today, date!(2008 - 08 - 06)), 18);
        // 18 tomorrow: still 17
        assert_eq!(age_on(today, date!(2008 - 08 - 07)), 17);
        // 18 yesterday
        assert_eq!(age_on(today, date!(2008 - 08 - 05)), 18);
    }

    #[test]
    fn leap_day_births_age_on_march_first() {
        assert_eq!(age_on(date!(2026 - 02 - 28), date!(2008 - 02 - 29)), 17);
        assert_eq!(age_on(date!(2026 - 03 - 01), date!(2008 - 02 - 29)), 18);
    }
}
