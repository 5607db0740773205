use serde::{Deserialize, Serialize};

use crate::error::{NotifyError, Result};

/// Requirements an internship places on applicants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityCriteria {
    pub internship_name: String,
    pub min_cgpa: f64,
    /// Every listed skill must be present; matching ignores case
    pub required_skills: Vec<String>,
}

impl EligibilityCriteria {
    pub fn new(
        internship_name: impl Into<String>,
        min_cgpa: f64,
        required_skills: Vec<String>,
    ) -> Self {
        Self {
            internship_name: internship_name.into(),
            min_cgpa,
            required_skills,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.internship_name.trim().is_empty() {
            return Err(NotifyError::Validation(
                "internship_name must not be empty".to_string(),
            ));
        }
        if !self.min_cgpa.is_finite() {
            return Err(NotifyError::Validation(
                "min_cgpa must be a finite number".to_string(),
            ));
        }
        Ok(())
    }

    /// Required skills lowercased; surrounding whitespace is left as given
    pub fn normalized_skills(&self) -> Vec<String> {
        self.required_skills.iter().map(|s| s.to_lowercase()).collect()
    }
}
