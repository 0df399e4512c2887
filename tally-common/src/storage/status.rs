//! SCORM-style objective record types

use serde::{Deserialize, Serialize};

/// Objective completion status with the SCORM wire strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionStatus {
    #[serde(rename = "not attempted")]
    NotAttempted,
    #[serde(rename = "incomplete")]
    Incomplete,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "unknown")]
    Unknown,
}

impl CompletionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionStatus::NotAttempted => "not attempted",
            CompletionStatus::Incomplete => "incomplete",
            CompletionStatus::Completed => "completed",
            CompletionStatus::Unknown => "unknown",
        }
    }
}

/// Objective success status with the SCORM wire strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuccessStatus {
    Passed,
    Failed,
    Unknown,
}

impl SuccessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuccessStatus::Passed => "passed",
            SuccessStatus::Failed => "failed",
            SuccessStatus::Unknown => "unknown",
        }
    }
}

/// Objective score triple written under `objectiveScore/{id}`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveScore {
    pub score: f64,
    pub min_score: f64,
    pub max_score: f64,
}

/// Objective status pair written under `objectiveStatus/{id}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveStatus {
    pub completion: CompletionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<SuccessStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_strings() {
        let status = ObjectiveStatus {
            completion: CompletionStatus::NotAttempted,
            success: None,
        };
        let json = serde_json::to_string(&status).expect("serialize");
        assert!(json.contains("\"not attempted\""));
        assert!(!json.contains("success"));

        let status = ObjectiveStatus {
            completion: CompletionStatus::Completed,
            success: Some(SuccessStatus::Passed),
        };
        let json = serde_json::to_string(&status).expect("serialize");
        assert!(json.contains("\"completed\""));
        assert!(json.contains("\"passed\""));
    }

    #[test]
    fn test_score_round_trip() {
        let score = ObjectiveScore {
            score: 7.0,
            min_score: 0.0,
            max_score: 10.0,
        };
        let json = serde_json::to_string(&score).expect("serialize");
        let back: ObjectiveScore = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, score);
    }
}
