use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::{
    eligibility::{EligibilityCriteria, FilterOutcome},
    notify::{NotifySummary, PipelineFailure, PipelineStage},
};

/// One notification request as recorded in history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRun {
    pub id: i64,
    pub internship_name: String,
    pub min_cgpa: f64,
    pub required_skills: Vec<String>,
    pub evaluated: usize,
    pub notified_count: usize,
    pub status: RunStatus,
    /// Last pipeline stage the run completed
    pub last_stage: String,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum RunStatus {
    Completed,
    Failed,
    DryRun,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Completed => write!(f, "Completed"),
            RunStatus::Failed => write!(f, "Failed"),
            RunStatus::DryRun => write!(f, "DryRun"),
        }
    }
}

impl std::str::FromStr for RunStatus {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Completed" => Ok(RunStatus::Completed),
            "Failed" => Ok(RunStatus::Failed),
            "DryRun" => Ok(RunStatus::DryRun),
            _ => Err(()),
        }
    }
}

impl NotificationRun {
    fn base(criteria: &EligibilityCriteria, status: RunStatus, stage: PipelineStage) -> Self {
        Self {
            id: 0, // assigned by the database
            internship_name: criteria.internship_name.clone(),
            min_cgpa: criteria.min_cgpa,
            required_skills: criteria.required_skills.clone(),
            evaluated: 0,
            notified_count: 0,
            status,
            last_stage: stage.to_string(),
            error: None,
            created_at: Utc::now(),
        }
    }

    pub fn completed(criteria: &EligibilityCriteria, summary: &NotifySummary) -> Self {
        Self {
            evaluated: summary.evaluated,
            notified_count: summary.notified_count,
            ..Self::base(criteria, RunStatus::Completed, summary.stage)
        }
    }

    pub fn failed(criteria: &EligibilityCriteria, failure: &PipelineFailure) -> Self {
        Self {
            evaluated: failure.evaluated,
            error: Some(failure.error.to_string()),
            ..Self::base(criteria, RunStatus::Failed, failure.last_stage())
        }
    }

    pub fn dry_run(criteria: &EligibilityCriteria, outcome: &FilterOutcome) -> Self {
        Self {
            evaluated: outcome.evaluated,
            ..Self::base(criteria, RunStatus::DryRun, PipelineStage::Filtered)
        }
    }
}
