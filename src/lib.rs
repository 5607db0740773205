pub mod cli;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod notify;
pub mod roster;
pub mod server;
pub mod storage;
pub mod utils;

pub use config::Config;
pub use eligibility::{evaluate, EligibilityCriteria, Evaluation};
pub use error::{NotifyError, Result};
pub use notify::{Mailer, NotificationPipeline, NotifySummary, SmtpMailer};
pub use roster::{FileRoster, RosterSource, StudentRecord};
