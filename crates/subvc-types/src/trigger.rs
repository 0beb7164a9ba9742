use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Why a version was recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerType {
    /// The author explicitly saved.
    Manual,
    /// Periodic automatic save.
    AutoSave,
    /// A file was uploaded.
    FileUpload,
    /// An AI feedback cycle completed.
    AiFeedback,
    /// The submission was submitted.
    Submission,
    /// The submission was graded.
    GradeReceived,
    /// A project milestone was reached.
    Milestone,
}

impl TriggerType {
    pub const ALL: [TriggerType; 7] = [
        Self::Manual,
        Self::AutoSave,
        Self::FileUpload,
        Self::AiFeedback,
        Self::Submission,
        Self::GradeReceived,
        Self::Milestone,
    ];

    /// Canonical upper-case name, as stored and displayed.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "MANUAL",
            Self::AutoSave => "AUTO_SAVE",
            Self::FileUpload => "FILE_UPLOAD",
            Self::AiFeedback => "AI_FEEDBACK",
            Self::Submission => "SUBMISSION",
            Self::GradeReceived => "GRADE_RECEIVED",
            Self::Milestone => "MILESTONE",
        }
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the canonical name in any case, with `-` or `_` separators.
impl FromStr for TriggerType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| TypeError::UnknownTrigger(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_canonical_name() {
        assert_eq!(TriggerType::AutoSave.to_string(), "AUTO_SAVE");
        assert_eq!(TriggerType::GradeReceived.to_string(), "GRADE_RECEIVED");
    }

    #[test]
    fn parse_is_lenient() {
        assert_eq!("manual".parse::<TriggerType>().unwrap(), TriggerType::Manual);
        assert_eq!(
            "file-upload".parse::<TriggerType>().unwrap(),
            TriggerType::FileUpload
        );
        assert_eq!(
            "AI_FEEDBACK".parse::<TriggerType>().unwrap(),
            TriggerType::AiFeedback
        );
    }

    #[test]
    fn parse_unknown_fails() {
        let err = "rebase".parse::<TriggerType>().unwrap_err();
        assert_eq!(err, TypeError::UnknownTrigger("rebase".into()));
    }

    #[test]
    fn every_variant_roundtrips_through_str() {
        for trigger in TriggerType::ALL {
            assert_eq!(trigger.as_str().parse::<TriggerType>().unwrap(), trigger);
        }
    }

    #[test]
    fn serde_uses_canonical_name() {
        let json = serde_json::to_string(&TriggerType::AutoSave).unwrap();
        assert_eq!(json, "\"AUTO_SAVE\"");
    }
}
