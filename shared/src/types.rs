//! Common types used across the platform

use chrono::NaiveDate;

/// Format a date as the six-digit `YYMMDD` segment used in generated codes
pub fn short_date(date: NaiveDate) -> String {
    date.format("%y%m%d").to_string()
}

/// Take `len` characters of a fresh v4 UUID, uppercased
pub fn random_token(len: usize) -> String {
    let mut token = uuid::Uuid::new_v4().simple().to_string();
    token.truncate(len);
    token.to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(short_date(date), "240307");
    }

    #[test]
    fn test_random_token_shape() {
        let token = random_token(6);
        assert_eq!(token.len(), 6);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }
}
