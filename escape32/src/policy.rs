//! Mismatch policy shared by every protocol check.
//!
//! Each exchange with the ESC ends in a comparison of what the device sent
//! against what the protocol expects: an acknowledgment value, or the length
//! of a returned record. The outcome of a failed comparison is decided here
//! and nowhere else:
//!
//! - [`StrictPolicy`] aborts the run with [`Error::Mismatch`].
//! - [`ForcePolicy`] logs the mismatch and carries on as if the check passed.
//!
//! Transport failures never reach a policy; they propagate as I/O errors.

use crate::error::{Error, Result};
use log::warn;
use std::fmt;

/// A failed protocol check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// What was being checked.
    pub what: &'static str,
    /// Value received, `None` if the reply frame was corrupt.
    pub actual: Option<u32>,
    /// Value the protocol expects.
    pub expected: u32,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.actual {
            Some(actual) => write!(
                f,
                "{} (result {actual}, expected {})",
                self.what, self.expected
            ),
            None => write!(
                f,
                "{} (no valid reply, expected {})",
                self.what, self.expected
            ),
        }
    }
}

/// Strategy deciding what a failed check does to the run.
pub trait MismatchPolicy: Send + Sync {
    /// Handle a failed check.
    fn resolve(&self, mismatch: Mismatch) -> Result<()>;

    /// Compare a received value (or length) against the expected one.
    fn check(&self, what: &'static str, actual: Option<u32>, expected: u32) -> Result<()> {
        if actual == Some(expected) {
            return Ok(());
        }
        self.resolve(Mismatch {
            what,
            actual,
            expected,
        })
    }
}

/// Abort on the first mismatch.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictPolicy;

impl MismatchPolicy for StrictPolicy {
    fn resolve(&self, mismatch: Mismatch) -> Result<()> {
        Err(Error::Mismatch(mismatch))
    }
}

/// Ignore mismatches (forced update).
#[derive(Debug, Clone, Copy, Default)]
pub struct ForcePolicy;

impl MismatchPolicy for ForcePolicy {
    fn resolve(&self, mismatch: Mismatch) -> Result<()> {
        warn!("Ignoring: {mismatch}");
        Ok(())
    }
}

/// Policy implied by the force flag.
pub fn for_force(force: bool) -> Box<dyn MismatchPolicy> {
    if force {
        Box::new(ForcePolicy)
    } else {
        Box::new(StrictPolicy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_values_pass_both_policies() {
        assert!(StrictPolicy.check("probe", Some(0), 0).is_ok());
        assert!(ForcePolicy.check("probe", Some(0), 0).is_ok());
    }

    #[test]
    fn test_strict_policy_reports_label_and_values() {
        let err = StrictPolicy
            .check("Error writing data", Some(1), 0)
            .unwrap_err();
        assert!(err.is_mismatch());
        assert_eq!(
            err.to_string(),
            "Error writing data (result 1, expected 0)"
        );
    }

    #[test]
    fn test_strict_policy_rejects_corrupt_reply() {
        let err = StrictPolicy
            .check("Connection failed", None, 0)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Connection failed (no valid reply, expected 0)"
        );
    }

    #[test]
    fn test_force_policy_tolerates_mismatch() {
        assert!(ForcePolicy.check("Error reading data", Some(12), 32).is_ok());
        assert!(ForcePolicy.check("Update failed", None, 0).is_ok());
    }

    #[test]
    fn test_for_force_selects_policy() {
        assert!(for_force(false).check("x", Some(1), 0).is_err());
        assert!(for_force(true).check("x", Some(1), 0).is_ok());
    }
}
