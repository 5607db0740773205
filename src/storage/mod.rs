pub mod db;
pub mod models;

pub use db::{record_run, Database, DatabaseStats};
pub use models::{NotificationRun, RunStatus};
