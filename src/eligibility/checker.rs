use serde::Serialize;
use tracing::{debug, info};

use crate::{eligibility::criteria::EligibilityCriteria, roster::StudentRecord};

/// Result of checking one student
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub eligible: bool,
    pub recipient: Option<String>,
}

/// Why a student was or was not selected
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Eligible(String),
    BelowThreshold { cgpa: f64 },
    MissingSkills(Vec<String>),
    /// Meets the criteria but has no address to notify
    NoEmail,
}

impl Verdict {
    pub fn evaluation(&self) -> Evaluation {
        match self {
            Verdict::Eligible(email) => Evaluation {
                eligible: true,
                recipient: Some(email.clone()),
            },
            Verdict::NoEmail => Evaluation {
                eligible: true,
                recipient: None,
            },
            Verdict::BelowThreshold { .. } | Verdict::MissingSkills(_) => Evaluation {
                eligible: false,
                recipient: None,
            },
        }
    }
}

pub struct EligibilityChecker {
    min_cgpa: f64,
    required_skills: Vec<String>,
}

impl EligibilityChecker {
    pub fn new(criteria: &EligibilityCriteria) -> Self {
        Self {
            min_cgpa: criteria.min_cgpa,
            required_skills: criteria.normalized_skills(),
        }
    }

    /// Check a student against the criteria
    ///
    /// A student is eligible if:
    /// 1. cgpa >= min_cgpa (checked first; failing it short-circuits)
    /// 2. every required skill is among the student's skills
    ///
    /// An eligible student only becomes a recipient with a non-empty email.
    pub fn assess(&self, record: &StudentRecord) -> Verdict {
        let meets_grade = record.cgpa >= self.min_cgpa;
        if !meets_grade {
            return Verdict::BelowThreshold { cgpa: record.cgpa };
        }

        let missing: Vec<String> = self
            .required_skills
            .iter()
            .filter(|skill| !record.has_skill(skill))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Verdict::MissingSkills(missing);
        }

        match record.email.as_deref() {
            Some(email) if !email.is_empty() => Verdict::Eligible(email.to_string()),
            _ => Verdict::NoEmail,
        }
    }

    pub fn evaluate(&self, record: &StudentRecord) -> Evaluation {
        self.assess(record).evaluation()
    }

    /// Human readable explanation of the verdict
    pub fn eligibility_reason(&self, record: &StudentRecord) -> String {
        match self.assess(record) {
            Verdict::Eligible(_) => "Eligible".to_string(),
            Verdict::BelowThreshold { cgpa } => {
                format!("CGPA {:.2} is below the minimum of {:.2}", cgpa, self.min_cgpa)
            }
            Verdict::MissingSkills(skills) => format!("Missing skills: {}", skills.join(", ")),
            Verdict::NoEmail => "Eligible but has no email address".to_string(),
        }
    }
}

/// Evaluate one student against one set of criteria
pub fn evaluate(record: &StudentRecord, criteria: &EligibilityCriteria) -> Evaluation {
    EligibilityChecker::new(criteria).evaluate(record)
}

/// Outcome of filtering a whole roster
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterOutcome {
    /// Recipient addresses in roster order; duplicates are kept
    pub recipients: Vec<String>,
    pub evaluated: usize,
    pub below_threshold: usize,
    pub missing_skills: usize,
    pub missing_email: usize,
}

/// Run the checker over every record in roster order
pub fn filter_roster(records: &[StudentRecord], criteria: &EligibilityCriteria) -> FilterOutcome {
    let checker = EligibilityChecker::new(criteria);
    let mut outcome = FilterOutcome {
        evaluated: records.len(),
        ..Default::default()
    };

    for record in records {
        match checker.assess(record) {
            Verdict::Eligible(email) => outcome.recipients.push(email),
            Verdict::BelowThreshold { .. } => outcome.below_threshold += 1,
            Verdict::MissingSkills(missing) => {
                debug!("Student {:?} missing skills {:?}", record.email, missing);
                outcome.missing_skills += 1;
            }
            Verdict::NoEmail => outcome.missing_email += 1,
        }
    }

    info!(
        "Filtered {} students for '{}': {} eligible, {} below cgpa, {} missing skills, {} without email",
        outcome.evaluated,
        criteria.internship_name,
        outcome.recipients.len(),
        outcome.below_threshold,
        outcome.missing_skills,
        outcome.missing_email
    );

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criteria(min_cgpa: f64, skills: &[&str]) -> EligibilityCriteria {
        EligibilityCriteria::new(
            "Data Intern",
            min_cgpa,
            skills.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn student(email: &str, cgpa: f64, skills: &str) -> StudentRecord {
        StudentRecord::new(Some(email), cgpa, skills)
    }

    #[test]
    fn test_below_threshold_never_eligible() {
        let c = criteria(7.0, &[]);
        for cgpa in [0.0, 3.5, 6.99] {
            let result = evaluate(&student("a@x.com", cgpa, "python, sql"), &c);
            assert!(!result.eligible);
            assert_eq!(result.recipient, None);
        }
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let result = evaluate(&student("a@x.com", 7.0, ""), &criteria(7.0, &[]));
        assert!(result.eligible);
        assert_eq!(result.recipient.as_deref(), Some("a@x.com"));
    }

    #[test]
    fn test_all_required_skills_needed() {
        let c = criteria(6.0, &["Python", "SQL"]);
        assert!(evaluate(&student("a@x.com", 8.0, "python, sql, excel"), &c).eligible);
        assert!(!evaluate(&student("a@x.com", 8.0, "python"), &c).eligible);
        assert!(!evaluate(&student("a@x.com", 8.0, "python sql"), &c).eligible);
    }

    #[test]
    fn test_case_insensitive_skills() {
        let c = criteria(6.0, &["python", "sql"]);
        assert!(evaluate(&student("a@x.com", 8.0, "Python, SQL"), &c).eligible);

        let c = criteria(6.0, &["PYTHON"]);
        assert!(evaluate(&student("a@x.com", 8.0, "pYtHoN"), &c).eligible);
    }

    #[test]
    fn test_empty_required_skills_never_excludes() {
        let c = criteria(5.0, &[]);
        assert!(evaluate(&student("a@x.com", 5.0, ""), &c).eligible);
        assert!(evaluate(&student("b@x.com", 9.0, ",,"), &c).eligible);
    }

    #[test]
    fn test_required_skill_whitespace_is_not_trimmed() {
        let c = criteria(5.0, &[" sql"]);
        let verdict = EligibilityChecker::new(&c).assess(&student("a@x.com", 8.0, "sql"));
        assert_eq!(verdict, Verdict::MissingSkills(vec![" sql".to_string()]));
    }

    #[test]
    fn test_empty_skill_tokens_are_inert() {
        // Trailing commas produce "" tokens; they only match an empty required skill
        let record = student("a@x.com", 8.0, "python,,");
        assert_eq!(record.skills, vec!["python", "", ""]);
        assert!(!evaluate(&record, &criteria(5.0, &["sql"])).eligible);
        assert!(evaluate(&record, &criteria(5.0, &["python"])).eligible);
    }

    #[test]
    fn test_missing_email_is_not_recipient() {
        let c = criteria(7.0, &["python"]);
        let no_email = StudentRecord::new(None, 9.0, "python");
        let empty_email = StudentRecord::new(Some(""), 9.0, "python");

        for record in [no_email, empty_email] {
            let result = evaluate(&record, &c);
            assert!(result.eligible);
            assert_eq!(result.recipient, None);
        }
    }

    #[test]
    fn test_nan_cgpa_is_not_eligible() {
        let record = StudentRecord::new(Some("a@x.com"), f64::NAN, "python");
        assert!(!evaluate(&record, &criteria(0.0, &[])).eligible);
    }

    #[test]
    fn test_zero_cgpa_passes_zero_threshold() {
        let record = StudentRecord::from_row(&crate::roster::RawRow::new());
        let c = criteria(0.0, &[]);
        let verdict = EligibilityChecker::new(&c).assess(&record);
        assert_eq!(verdict, Verdict::NoEmail);
    }

    #[test]
    fn test_eligibility_reason() {
        let checker = EligibilityChecker::new(&criteria(7.0, &["rust"]));
        assert_eq!(
            checker.eligibility_reason(&student("a@x.com", 6.5, "rust")),
            "CGPA 6.50 is below the minimum of 7.00"
        );
        assert_eq!(
            checker.eligibility_reason(&student("a@x.com", 8.0, "go")),
            "Missing skills: rust"
        );
        assert_eq!(
            checker.eligibility_reason(&student("a@x.com", 8.0, "rust")),
            "Eligible"
        );
    }

    #[test]
    fn test_filter_roster_scenario() {
        let roster = vec![
            student("a@x.com", 8.5, "python, sql"),
            student("b@x.com", 6.0, "python"),
            StudentRecord::new(Some(""), 9.0, "python, sql"),
        ];
        let c = criteria(7.0, &["Python", "SQL"]);

        let outcome = filter_roster(&roster, &c);
        assert_eq!(outcome.recipients, vec!["a@x.com"]);
        assert_eq!(outcome.evaluated, 3);
        assert_eq!(outcome.below_threshold, 1);
        assert_eq!(outcome.missing_email, 1);
        assert_eq!(outcome.missing_skills, 0);
    }

    #[test]
    fn test_filter_roster_keeps_duplicates_in_order() {
        let roster = vec![
            student("b@x.com", 9.0, "go"),
            student("a@x.com", 9.0, "go"),
            student("b@x.com", 9.0, "go"),
        ];
        let outcome = filter_roster(&roster, &criteria(8.0, &["go"]));
        assert_eq!(outcome.recipients, vec!["b@x.com", "a@x.com", "b@x.com"]);
    }
}
