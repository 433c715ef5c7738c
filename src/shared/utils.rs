//! Utility functions and helpers

/// Format a numeraire amount for log lines
pub fn format_amount(amount: f64) -> String {
    format!("{:.6}", amount)
}

/// Generate unique ID
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0.5), "0.500000");
        assert_ne!(generate_id(), generate_id());
    }
}
