use chrono::{DateTime, Utc};

/// 以印度盧比格式輸出金額：最後三位一組，之後每兩位一組，例如 `₹1,23,456`
pub fn format_inr(amount: u64) -> String {
    let digits = amount.to_string();
    if digits.len() <= 3 {
        return format!("₹{}", digits);
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    format!("₹{},{}", groups.join(","), tail)
}

pub fn format_date(value: Option<DateTime<Utc>>) -> String {
    match value {
        Some(date) => date.format("%-d %b %Y").to_string(),
        None => "N/A".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_inr_grouping() {
        assert_eq!(format_inr(0), "₹0");
        assert_eq!(format_inr(999), "₹999");
        assert_eq!(format_inr(1000), "₹1,000");
        assert_eq!(format_inr(53_988), "₹53,988");
        assert_eq!(format_inr(123_456), "₹1,23,456");
        assert_eq!(format_inr(12_345_678), "₹1,23,45,678");
    }

    #[test]
    fn test_format_date() {
        let date = Utc.with_ymd_and_hms(2026, 10, 5, 8, 30, 0).unwrap();
        assert_eq!(format_date(Some(date)), "5 Oct 2026");
        assert_eq!(format_date(None), "N/A");
    }
}
