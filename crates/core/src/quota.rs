//! Storage quota arithmetic.

use crate::error::CoreError;

/// Remaining object slots, never negative.
pub fn available(object_count: i64, object_quota: i64) -> i64 {
    (object_quota - object_count).max(0)
}

/// Fail with [`CoreError::StorageQuotaExceeded`] when `needed` slots are not
/// available. Zero needed always passes.
pub fn ensure_available(needed: i64, available: i64) -> Result<(), CoreError> {
    if needed <= 0 || needed <= available {
        return Ok(());
    }
    Err(CoreError::StorageQuotaExceeded { needed, available })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn available_saturates_at_zero() {
        assert_eq!(available(10, 12), 2);
        assert_eq!(available(15, 12), 0);
    }

    #[test]
    fn exact_fit_passes() {
        assert!(ensure_available(2, 2).is_ok());
        assert!(ensure_available(0, 0).is_ok());
    }

    #[test]
    fn shortfall_reports_numbers() {
        assert_matches!(
            ensure_available(3, 2),
            Err(CoreError::StorageQuotaExceeded { needed: 3, available: 2 })
        );
    }
}
