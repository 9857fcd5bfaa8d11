//! Accumulation of non-fatal stage failures.

use crate::errors::{AggregateError, StageFailure};

/// Records the failures of continue-on-error stages during one phase run.
///
/// Owned by the run; an empty memo converts to `Ok(())`.
#[derive(Debug, Default)]
pub struct ErrorMemo {
    failures: Vec<StageFailure>,
}

impl ErrorMemo {
    /// Creates an empty memo.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failure.
    pub fn memorize(&mut self, failure: StageFailure) {
        self.failures.push(failure);
    }

    /// Returns the number of recorded failures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Converts the memo into the phase result.
    pub fn into_result(self) -> Result<(), AggregateError> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(AggregateError::new(self.failures))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_memo_is_ok() {
        let memo = ErrorMemo::new();
        assert!(memo.is_empty());
        assert!(memo.into_result().is_ok());
    }

    #[test]
    fn test_memo_keeps_order() {
        let mut memo = ErrorMemo::new();
        memo.memorize(StageFailure::new("homebrew", anyhow::anyhow!("tap not found")));
        memo.memorize(StageFailure::new("scoop", anyhow::anyhow!("bucket not found")));
        assert_eq!(memo.len(), 2);

        let err = memo.into_result().unwrap_err();
        assert_eq!(err.stages(), vec!["homebrew", "scoop"]);
        assert_eq!(
            err.to_string(),
            "2 errors occurred:\n\t* homebrew: tap not found\n\t* scoop: bucket not found"
        );
    }
}
