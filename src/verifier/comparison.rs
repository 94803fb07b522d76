use snafu::Snafu;

use crate::ext::PathReportExt;
use crate::state::DirectorySet;

pub const NONE_PLACEHOLDER: &str = "*none*";

/// Expected and reported directories reduced to their final path segment.
/// Two directories sharing a name compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparison {
    pub notified: Vec<String>,
    pub expected: Vec<String>,
    notification_count: usize,
    expected_count: usize,
}

impl Comparison {
    pub fn new(expected: &DirectorySet, actual: &DirectorySet) -> Self {
        let mut notified = base_names(actual);
        let mut expected = base_names(expected);
        let notification_count = notified.len();
        let expected_count = expected.len();

        let padded_len = notification_count.max(expected_count);
        notified.resize(padded_len, NONE_PLACEHOLDER.to_string());
        expected.resize(padded_len, NONE_PLACEHOLDER.to_string());

        Self {
            notified,
            expected,
            notification_count,
            expected_count,
        }
    }

    pub fn notification_count(&self) -> usize {
        self.notification_count
    }

    pub fn expected_count(&self) -> usize {
        self.expected_count
    }

    pub fn verify(&self) -> Result<usize, VerificationError> {
        if self.notification_count != self.expected_count {
            return Err(VerificationError::LengthMismatch {
                notifications: self.notification_count,
                expected: self.expected_count,
            });
        }

        for (matches, (notification, expected)) in
            self.notified.iter().zip(&self.expected).enumerate()
        {
            if notification != expected {
                return Err(VerificationError::ContentMismatch {
                    notification: notification.clone(),
                    expected: expected.clone(),
                    matches,
                });
            }
        }
        Ok(self.expected_count)
    }
}

fn base_names(dirs: &DirectorySet) -> Vec<String> {
    let mut names = dirs
        .iter()
        .map(|dir| dir.base_name())
        .collect::<Vec<_>>();
    names.sort();
    names
}

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum VerificationError {
    #[snafu(display(
        "Received {} notifications but expected {}",
        notifications,
        expected
    ))]
    LengthMismatch { notifications: usize, expected: usize },
    #[snafu(display(
        "Notification '{}' does not match expected '{}' after {} matches",
        notification,
        expected,
        matches
    ))]
    ContentMismatch {
        notification: String,
        expected: String,
        matches: usize,
    },
}

impl VerificationError {
    pub fn matches(&self) -> usize {
        match self {
            VerificationError::LengthMismatch { .. } => 0,
            VerificationError::ContentMismatch { matches, .. } => *matches,
        }
    }
}
