use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::{
    eligibility::{filter_roster, EligibilityCriteria, FilterOutcome},
    error::{NotifyError, Result},
    notify::{mailer::Mailer, message::compose},
    roster::{RosterSource, StudentRecord},
};

/// Linear progress of one notification request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineStage {
    Received,
    RosterLoaded,
    Filtered,
    Dispatched,
    Responded,
    Failed,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineStage::Received => "Received",
            PipelineStage::RosterLoaded => "RosterLoaded",
            PipelineStage::Filtered => "Filtered",
            PipelineStage::Dispatched => "Dispatched",
            PipelineStage::Responded => "Responded",
            PipelineStage::Failed => "Failed",
        };
        write!(f, "{}", name)
    }
}

/// Result reported back to the caller of `handle`
#[derive(Debug, Clone, Serialize)]
pub struct NotifySummary {
    pub internship_name: String,
    /// Addresses submitted for delivery; bounces are not observed
    pub notified_count: usize,
    pub evaluated: usize,
    pub stage: PipelineStage,
}

impl NotifySummary {
    /// Summary of a pass where no student qualified; nothing is dispatched
    pub fn nobody_eligible(criteria: &EligibilityCriteria, evaluated: usize) -> Self {
        Self {
            internship_name: criteria.internship_name.clone(),
            notified_count: 0,
            evaluated,
            stage: PipelineStage::Responded,
        }
    }

    pub fn message(&self) -> String {
        format!("Notified {} eligible students.", self.notified_count)
    }
}

/// A request that stopped before responding
#[derive(Debug)]
pub struct PipelineFailure {
    pub error: NotifyError,
    /// Students evaluated before the failure; 0 when filtering never ran
    pub evaluated: usize,
}

impl PipelineFailure {
    /// Last stage that completed before the request failed
    pub fn last_stage(&self) -> PipelineStage {
        self.error.failed_after()
    }
}

impl std::fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl From<NotifyError> for PipelineFailure {
    fn from(error: NotifyError) -> Self {
        Self { error, evaluated: 0 }
    }
}

impl From<PipelineFailure> for NotifyError {
    fn from(failure: PipelineFailure) -> Self {
        failure.error
    }
}

/// Load roster, filter, dispatch, report
pub struct NotificationPipeline {
    roster: Arc<dyn RosterSource>,
    mailer: Arc<dyn Mailer>,
}

impl NotificationPipeline {
    pub fn new(roster: Arc<dyn RosterSource>, mailer: Arc<dyn Mailer>) -> Self {
        Self { roster, mailer }
    }

    /// Notify every eligible student for one internship.
    ///
    /// Record-level problems never abort the pass. Any roster or dispatch
    /// failure aborts the whole request; nothing is partially reported.
    pub async fn handle(
        &self,
        criteria: &EligibilityCriteria,
    ) -> std::result::Result<NotifySummary, PipelineFailure> {
        let outcome = match self.filter(criteria).await {
            Ok(outcome) => outcome,
            Err(e) => return Err(report(criteria, e.into())),
        };
        self.deliver(criteria, outcome).await
    }

    /// Load and filter without dispatching anything
    pub async fn preview(&self, criteria: &EligibilityCriteria) -> Result<FilterOutcome> {
        self.filter(criteria).await
    }

    /// Dispatch an outcome that was already filtered, without reloading the roster
    pub async fn deliver(
        &self,
        criteria: &EligibilityCriteria,
        outcome: FilterOutcome,
    ) -> std::result::Result<NotifySummary, PipelineFailure> {
        let name = criteria.internship_name.as_str();
        let evaluated = outcome.evaluated;
        let notified_count = outcome.recipients.len();

        if notified_count > 0 {
            let email = compose(name, outcome.recipients);
            if let Err(error) = self.mailer.send(&email).await {
                return Err(report(criteria, PipelineFailure { error, evaluated }));
            }
            enter(PipelineStage::Dispatched, name);
        } else {
            info!("No eligible students for '{}', nothing to send", name);
        }

        let stage = enter(PipelineStage::Responded, name);
        info!(
            "Notified {} of {} students for '{}'",
            notified_count, evaluated, name
        );

        Ok(NotifySummary {
            internship_name: criteria.internship_name.clone(),
            notified_count,
            evaluated,
            stage,
        })
    }

    async fn filter(&self, criteria: &EligibilityCriteria) -> Result<FilterOutcome> {
        let name = criteria.internship_name.as_str();
        criteria.validate()?;
        enter(PipelineStage::Received, name);

        let records = self.load_roster().await?;
        enter(PipelineStage::RosterLoaded, name);

        let outcome = filter_roster(&records, criteria);
        enter(PipelineStage::Filtered, name);
        Ok(outcome)
    }

    async fn load_roster(&self) -> Result<Vec<StudentRecord>> {
        load_blocking(Arc::clone(&self.roster)).await
    }
}

/// Load a roster on the blocking pool; file parsing never runs on the async workers
pub async fn load_blocking(roster: Arc<dyn RosterSource>) -> Result<Vec<StudentRecord>> {
    tokio::task::spawn_blocking(move || roster.load())
        .await
        .map_err(|e| NotifyError::Other(e.into()))?
}

fn enter(stage: PipelineStage, internship_name: &str) -> PipelineStage {
    debug!("[{}] -> {}", internship_name, stage);
    stage
}

fn report(criteria: &EligibilityCriteria, failure: PipelineFailure) -> PipelineFailure {
    enter(PipelineStage::Failed, &criteria.internship_name);
    error!(
        "Notification for '{}' failed after {} ({}): {}",
        criteria.internship_name,
        failure.last_stage(),
        failure.error.kind(),
        failure.error
    );
    failure
}
