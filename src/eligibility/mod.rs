pub mod checker;
pub mod criteria;

pub use checker::{evaluate, filter_roster, EligibilityChecker, Evaluation, FilterOutcome, Verdict};
pub use criteria::EligibilityCriteria;
