use chrono::{DateTime, Utc};
use uuid::Uuid;

pub const ORDER_CODE_PREFIX: &str = "MP";

/// Attempts made before a code collision is reported as a storage failure.
pub const MAX_CODE_ATTEMPTS: usize = 3;

/// Build a shareable order code such as `MP-250114-3FA9C2`.
pub fn generate_order_code(now: DateTime<Utc>) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}",
        ORDER_CODE_PREFIX,
        now.format("%y%m%d"),
        random[..6].to_uppercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    #[test]
    fn code_has_prefix_date_and_suffix() {
        let now = Utc.with_ymd_and_hms(2025, 1, 14, 9, 30, 0).unwrap();
        let code = generate_order_code(now);
        let parts: Vec<&str> = code.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "MP");
        assert_eq!(parts[1], "250114");
        assert_eq!(parts[2].len(), 6);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn codes_vary_between_calls() {
        let now = Utc::now();
        let codes: HashSet<String> = (0..200).map(|_| generate_order_code(now)).collect();
        assert!(codes.len() > 190);
    }
}
