//! Display helpers for amounts, dates and contact details (en-NG conventions).

use chrono::{Datelike, NaiveDate};

const CURRENCY_SYMBOL: &str = "₦";

/// `1234.5` -> `₦1,234.50`
pub fn format_currency(amount: f64) -> String {
    let sign = if amount < 0.0 { "-" } else { "" };
    let fixed = format!("{:.2}", amount.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    format!("{sign}{CURRENCY_SYMBOL}{}.{fraction}", group_thousands(whole))
}

/// `1985-05-15` -> `15 May 1985`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%-d %B %Y").to_string()
}

/// `1985-05-15` -> `15/05/1985`
pub fn format_short_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Takes a value already expressed in percent: `5.2` -> `5.20%`.
pub fn format_percentage(value: f64) -> String {
    format!("{value:.2}%")
}

/// Groups the integer part and keeps at most three fraction digits.
pub fn format_number(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let fixed = format!("{:.3}", value.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        format!("{sign}{}", group_thousands(whole))
    } else {
        format!("{sign}{}.{fraction}", group_thousands(whole))
    }
}

/// Whole years elapsed between `date_of_birth` and `today`.
pub fn calculate_age(date_of_birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age
}

/// Formats Nigerian numbers as `+234 XXX XXX XXXX`; anything else is
/// returned unchanged.
pub fn format_phone_number(phone_number: &str) -> String {
    let digits: String = phone_number.chars().filter(char::is_ascii_digit).collect();

    if digits.len() == 13 && digits.starts_with("234") {
        return format!(
            "+{} {} {} {}",
            &digits[0..3],
            &digits[3..6],
            &digits[6..9],
            &digits[9..]
        );
    }

    if digits.len() == 11 && digits.starts_with('0') {
        return format!("+234 {} {} {}", &digits[1..4], &digits[4..7], &digits[7..]);
    }

    phone_number.to_string()
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn currency_groups_and_rounds() {
        assert_eq!(format_currency(1234.5), "₦1,234.50");
        assert_eq!(format_currency(0.0), "₦0.00");
        assert_eq!(format_currency(1_000_000.0), "₦1,000,000.00");
        assert_eq!(format_currency(-45_000.0), "-₦45,000.00");
        assert_eq!(format_currency(999.999), "₦1,000.00");
    }

    #[test]
    fn dates_use_day_first_order() {
        assert_eq!(format_date(date(1985, 5, 15)), "15 May 1985");
        assert_eq!(format_short_date(date(1985, 5, 5)), "05/05/1985");
    }

    #[test]
    fn numbers_and_percentages() {
        assert_eq!(format_number(1_234_567.0), "1,234,567");
        assert_eq!(format_number(12.5), "12.5");
        assert_eq!(format_number(100.0), "100");
        assert_eq!(format_percentage(5.2), "5.20%");
    }

    #[test]
    fn age_counts_only_completed_years() {
        let dob = date(1985, 5, 15);
        assert_eq!(calculate_age(dob, date(2024, 5, 14)), 38);
        assert_eq!(calculate_age(dob, date(2024, 5, 15)), 39);
        assert_eq!(calculate_age(dob, date(2024, 12, 1)), 39);
    }

    #[test]
    fn phone_numbers_in_both_nigerian_forms() {
        assert_eq!(format_phone_number("+2348012345678"), "+234 801 234 5678");
        assert_eq!(format_phone_number("08012345678"), "+234 801 234 5678");
        assert_eq!(format_phone_number("+1 555 0100"), "+1 555 0100");
    }
}
