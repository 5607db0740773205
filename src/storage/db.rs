use rusqlite::{Connection, params};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    error::{NotifyError, Result},
    storage::models::{NotificationRun, RunStatus},
};

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn new(path: &str) -> Result<Self> {
        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS notification_runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                internship_name TEXT NOT NULL,
                min_cgpa REAL NOT NULL,
                required_skills TEXT NOT NULL,
                evaluated INTEGER NOT NULL,
                notified_count INTEGER NOT NULL,
                status TEXT NOT NULL,
                last_stage TEXT NOT NULL,
                error TEXT,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_runs_created ON notification_runs(created_at)",
            [],
        )?;

        Ok(())
    }

    pub fn save_run(&self, run: &NotificationRun) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO notification_runs
             (internship_name, min_cgpa, required_skills, evaluated, notified_count,
              status, last_stage, error, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                run.internship_name,
                run.min_cgpa,
                serde_json::to_string(&run.required_skills)?,
                run.evaluated as i64,
                run.notified_count as i64,
                run.status.to_string(),
                run.last_stage,
                run.error,
                run.created_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_run_history(&self, limit: Option<usize>) -> Result<Vec<NotificationRun>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, internship_name, min_cgpa, required_skills, evaluated, notified_count,
                    status, last_stage, error, created_at
             FROM notification_runs
             ORDER BY id DESC
             LIMIT ?1",
        )?;

        // SQLite treats a negative LIMIT as no limit
        let limit = limit.map(|l| l as i64).unwrap_or(-1);

        let rows = stmt
            .query_map([limit], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, Option<String>>(8)?,
                    row.get::<_, String>(9)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(
                |(id, name, min_cgpa, skills, evaluated, notified, status, last_stage, error, created)|
                 -> Result<NotificationRun> {
                    Ok(NotificationRun {
                        id,
                        internship_name: name,
                        min_cgpa,
                        required_skills: serde_json::from_str(&skills)?,
                        evaluated: evaluated as usize,
                        notified_count: notified as usize,
                        status: status.parse().map_err(|_| {
                            NotifyError::Other(anyhow::anyhow!("Unknown run status: {}", status))
                        })?,
                        last_stage,
                        error,
                        created_at: created
                            .parse()
                            .map_err(|e| NotifyError::Other(anyhow::anyhow!("Bad timestamp: {}", e)))?,
                    })
                },
            )
            .collect()
    }

    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let count_status = |status: RunStatus| -> Result<i64> {
            Ok(self.conn.query_row(
                "SELECT COUNT(*) FROM notification_runs WHERE status = ?1",
                [status.to_string()],
                |row| row.get(0),
            )?)
        };

        let total_runs: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM notification_runs",
            [],
            |row| row.get(0),
        )?;

        let total_notified: Option<i64> = self.conn.query_row(
            "SELECT SUM(notified_count) FROM notification_runs WHERE status = 'Completed'",
            [],
            |row| row.get(0),
        )?;

        Ok(DatabaseStats {
            total_runs: total_runs as usize,
            completed_runs: count_status(RunStatus::Completed)? as usize,
            failed_runs: count_status(RunStatus::Failed)? as usize,
            dry_runs: count_status(RunStatus::DryRun)? as usize,
            total_notified: total_notified.unwrap_or(0) as usize,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseStats {
    pub total_runs: usize,
    pub completed_runs: usize,
    pub failed_runs: usize,
    pub dry_runs: usize,
    pub total_notified: usize,
}

/// Append a run to history. Failures are logged and never surface to the caller.
pub fn record_run(path: &str, run: &NotificationRun) {
    match Database::new(path).and_then(|db| db.save_run(run)) {
        Ok(id) => debug!("Recorded notification run {} for '{}'", id, run.internship_name),
        Err(e) => warn!("Failed to record notification run: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eligibility::EligibilityCriteria;
    use crate::notify::{NotifySummary, PipelineFailure, PipelineStage};

    fn criteria() -> EligibilityCriteria {
        EligibilityCriteria::new("Data Intern", 7.0, vec!["Python".into(), "SQL".into()])
    }

    fn completed(notified: usize) -> NotificationRun {
        NotificationRun::completed(
            &criteria(),
            &NotifySummary {
                internship_name: "Data Intern".into(),
                notified_count: notified,
                evaluated: 10,
                stage: PipelineStage::Responded,
            },
        )
    }

    #[test]
    fn test_save_and_read_history() {
        let db = Database::new(":memory:").unwrap();
        db.save_run(&completed(3)).unwrap();
        db.save_run(&NotificationRun::failed(
            &criteria(),
            &PipelineFailure {
                error: NotifyError::Dispatch("connection refused".into()),
                evaluated: 7,
            },
        ))
        .unwrap();

        let history = db.get_run_history(None).unwrap();
        assert_eq!(history.len(), 2);

        // Newest first
        assert_eq!(history[0].status, RunStatus::Failed);
        assert_eq!(history[0].last_stage, "Filtered");
        assert_eq!(history[0].evaluated, 7);
        assert!(history[0].error.as_deref().unwrap().contains("connection refused"));

        assert_eq!(history[1].status, RunStatus::Completed);
        assert_eq!(history[1].notified_count, 3);
        assert_eq!(history[1].required_skills, vec!["Python", "SQL"]);
        assert_eq!(history[1].last_stage, "Responded");
    }

    #[test]
    fn test_history_limit() {
        let db = Database::new(":memory:").unwrap();
        for n in 0..5 {
            db.save_run(&completed(n)).unwrap();
        }
        let history = db.get_run_history(Some(2)).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].notified_count, 4);
    }

    #[test]
    fn test_stats() {
        let db = Database::new(":memory:").unwrap();
        db.save_run(&completed(3)).unwrap();
        db.save_run(&completed(2)).unwrap();
        db.save_run(&NotificationRun::failed(
            &criteria(),
            &PipelineFailure::from(NotifyError::DataSource("missing".into())),
        ))
        .unwrap();

        let stats = db.get_stats().unwrap();
        assert_eq!(stats.total_runs, 3);
        assert_eq!(stats.completed_runs, 2);
        assert_eq!(stats.failed_runs, 1);
        assert_eq!(stats.dry_runs, 0);
        assert_eq!(stats.total_notified, 5);
    }

    #[test]
    fn test_record_run_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history").join("runs.db");
        let path = path.to_str().unwrap();

        record_run(path, &completed(1));

        let db = Database::new(path).unwrap();
        assert_eq!(db.get_run_history(None).unwrap().len(), 1);
    }
}
