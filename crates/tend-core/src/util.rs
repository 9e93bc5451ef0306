//! Shared utility functions used across multiple modules.

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Current Unix timestamp in milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Timestamp for a local mutation of a record last stamped at `previous`.
///
/// Never returns a value at or below `previous`, so a record's own history
/// stays strictly ordered when the wall clock stalls or steps backwards.
pub fn next_mutation_timestamp(previous: Option<i64>) -> i64 {
    let now = now_millis();
    match previous {
        Some(previous) if previous >= now => previous.saturating_add(1),
        _ => now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_option_rejects_empty() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some("   ".to_string())), None);
    }

    #[test]
    fn normalize_text_option_trims_value() {
        assert_eq!(
            normalize_text_option(Some(" /tmp/remote.json ".to_string())),
            Some("/tmp/remote.json".to_string())
        );
    }

    #[test]
    fn next_mutation_timestamp_moves_past_future_previous() {
        let far_future = now_millis() + 60_000;
        assert_eq!(next_mutation_timestamp(Some(far_future)), far_future + 1);
    }

    #[test]
    fn next_mutation_timestamp_uses_clock_when_ahead() {
        let stamped = next_mutation_timestamp(Some(5));
        assert!(stamped > 5);
        assert!(next_mutation_timestamp(None) > 0);
    }
}
