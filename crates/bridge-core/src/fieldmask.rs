//! Update masks for partial updates.
//!
//! A mask lists dotted field paths (`spec.serial_number`). An empty mask means
//! every mutable field; `*` alone means the same and may not be combined with
//! other paths.

use crate::{BridgeError, Result};
use serde::{Deserialize, Serialize};

pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMask {
    #[serde(default)]
    pub paths: Vec<String>,
}

impl FieldMask {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Check every path against the fields an update may touch.
    pub fn validate(&self, allowed: &[&str]) -> Result<()> {
        let has_wildcard = self.paths.iter().any(|p| p == WILDCARD);
        if has_wildcard && self.paths.len() > 1 {
            return Err(BridgeError::invalid_argument(
                "invalid field path: '*' must not be used with other paths",
            ));
        }
        for path in &self.paths {
            if path != WILDCARD && !allowed.contains(&path.as_str()) {
                return Err(BridgeError::invalid_argument(format!(
                    "invalid field path: {}",
                    path
                )));
            }
        }
        Ok(())
    }

    /// Whether `field` should be taken from the update.
    ///
    /// A path also covers every field below it, so `spec` covers
    /// `spec.serial_number`.
    pub fn covers(&self, field: &str) -> bool {
        if self.paths.is_empty() {
            return true;
        }
        self.paths.iter().any(|p| {
            p == WILDCARD
                || p == field
                || field
                    .strip_prefix(p.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALLOWED: &[&str] = &["spec", "spec.serial_number", "spec.model_number"];

    #[test]
    fn test_wildcard_alone_is_valid() {
        assert!(FieldMask::new(["*"]).validate(ALLOWED).is_ok());
        assert!(FieldMask::default().validate(ALLOWED).is_ok());
    }

    #[test]
    fn test_wildcard_with_other_paths_is_rejected() {
        let err = FieldMask::new(["*", "spec.serial_number"])
            .validate(ALLOWED)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid field path: '*' must not be used with other paths"
        );
    }

    #[test]
    fn test_unknown_path_is_rejected() {
        let err = FieldMask::new(["status.firmware_revision"])
            .validate(ALLOWED)
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid field path: status.firmware_revision");
    }

    #[test]
    fn test_covers() {
        let mask = FieldMask::new(["spec.serial_number"]);
        assert!(mask.covers("spec.serial_number"));
        assert!(!mask.covers("spec.model_number"));

        let parent = FieldMask::new(["spec"]);
        assert!(parent.covers("spec.model_number"));
        assert!(!parent.covers("specification"));

        assert!(FieldMask::default().covers("anything"));
        assert!(FieldMask::new(["*"]).covers("spec.nqn"));
    }
}
