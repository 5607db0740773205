use calamine::{open_workbook_auto, Data, Reader};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::{
    error::{NotifyError, Result},
    roster::record::{Cell, RawRow, StudentRecord, CGPA_COLUMN, EMAIL_COLUMN, SKILLS_COLUMN},
};

/// Produces the students evaluated by one notification pass
pub trait RosterSource: Send + Sync {
    fn load(&self) -> Result<Vec<StudentRecord>>;
}

/// Roster backed by a spreadsheet or CSV file on disk
#[derive(Debug, Clone)]
pub struct FileRoster {
    path: PathBuf,
    sheet: Option<String>,
}

impl FileRoster {
    pub fn new(path: impl Into<PathBuf>, sheet: Option<String>) -> Self {
        Self {
            path: path.into(),
            sheet,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the roster file with uploaded contents once they parse.
    ///
    /// The upload must use the same format as the configured file. Returns the
    /// number of student rows; on any failure the current roster is untouched.
    pub fn replace(&self, file_name: Option<&str>, contents: &[u8]) -> Result<usize> {
        let extension = extension_of(&self.path);
        if let Some(name) = file_name {
            if extension_of(Path::new(name)) != extension {
                return Err(NotifyError::Validation(format!(
                    "Expected a .{} roster, got '{}'",
                    extension, name
                )));
            }
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let staging = self.path.with_extension(format!("upload.{}", extension));
        std::fs::write(&staging, contents)?;

        let rows = match read_rows(&staging, self.sheet.as_deref()) {
            Ok(rows) => rows,
            Err(e) => {
                if let Err(cleanup) = std::fs::remove_file(&staging) {
                    warn!("Failed to remove {}: {}", staging.display(), cleanup);
                }
                return Err(NotifyError::Validation(format!(
                    "Uploaded roster is unreadable: {}",
                    e
                )));
            }
        };

        std::fs::rename(&staging, &self.path)?;
        info!(
            "Replaced roster {} ({} students)",
            self.path.display(),
            rows.len()
        );
        Ok(rows.len())
    }
}

impl RosterSource for FileRoster {
    fn load(&self) -> Result<Vec<StudentRecord>> {
        let rows = read_rows(&self.path, self.sheet.as_deref())?;
        let records: Vec<StudentRecord> = rows.iter().map(StudentRecord::from_row).collect();

        info!(
            "Loaded {} students from {}",
            records.len(),
            self.path.display()
        );

        Ok(records)
    }
}

/// Fixed in-memory roster
#[derive(Debug, Clone, Default)]
pub struct StaticRoster {
    records: Vec<StudentRecord>,
}

impl StaticRoster {
    pub fn new(records: Vec<StudentRecord>) -> Self {
        Self { records }
    }
}

impl RosterSource for StaticRoster {
    fn load(&self) -> Result<Vec<StudentRecord>> {
        Ok(self.records.clone())
    }
}

/// Reads every data row of a roster file as column-keyed cells
pub fn read_rows(path: &Path, sheet: Option<&str>) -> Result<Vec<RawRow>> {
    if !path.exists() {
        return Err(NotifyError::DataSource(format!(
            "Roster file not found: {}",
            path.display()
        )));
    }

    let table = match extension_of(path).as_str() {
        "csv" => read_csv(path)?,
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook(path, sheet)?,
        other => {
            return Err(NotifyError::DataSource(format!(
                "Unsupported roster format '{}' for {}",
                other,
                path.display()
            )))
        }
    };

    Ok(into_rows(table))
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

/// Header row plus data rows, before keying by column name
struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

fn read_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let headers = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(csv_cell).collect());
    }

    Ok(Table { headers, rows })
}

fn csv_cell(field: &str) -> Cell {
    match field.trim().parse::<f64>() {
        Ok(value) => Cell::number(value),
        Err(_) => Cell::text(field),
    }
}

fn read_workbook(path: &Path, sheet: Option<&str>) -> Result<Table> {
    let mut workbook = open_workbook_auto(path)?;

    let range = match sheet {
        Some(name) => workbook.worksheet_range(name)?,
        None => workbook.worksheet_range_at(0).ok_or_else(|| {
            NotifyError::DataSource(format!("Workbook {} has no sheets", path.display()))
        })??,
    };

    let mut rows = range.rows();
    let headers = match rows.next() {
        Some(header) => header
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect(),
        None => Vec::new(),
    };

    let rows = rows
        .map(|row| row.iter().map(workbook_cell).collect())
        .collect();

    Ok(Table { headers, rows })
}

fn workbook_cell(data: &Data) -> Cell {
    match data {
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::number(*f),
        Data::String(s) => Cell::text(s.clone()),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => Cell::number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::text(s.clone()),
        Data::Error(_) | Data::Empty => Cell::Missing,
    }
}

fn into_rows(table: Table) -> Vec<RawRow> {
    let missing: Vec<&str> = [EMAIL_COLUMN, CGPA_COLUMN, SKILLS_COLUMN]
        .into_iter()
        .filter(|col| !table.headers.iter().any(|h| h == col))
        .collect();
    if !missing.is_empty() {
        warn!("Roster is missing columns: {}", missing.join(", "));
    }

    let mut rows = Vec::with_capacity(table.rows.len());
    let mut skipped = 0usize;

    for cells in table.rows {
        if cells.iter().all(Cell::is_missing) {
            skipped += 1;
            continue;
        }

        let row: RawRow = table
            .headers
            .iter()
            .cloned()
            .zip(cells.into_iter().chain(std::iter::repeat(Cell::Missing)))
            .collect();
        rows.push(row);
    }

    if skipped > 0 {
        debug!("Skipped {} blank roster rows", skipped);
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eligibility::{filter_roster, EligibilityCriteria};
    use std::io::Write;

    fn workbook_fixture() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/students.xlsx")
    }

    fn data_intern() -> EligibilityCriteria {
        EligibilityCriteria::new("Data Intern", 7.0, vec!["Python".into(), "SQL".into()])
    }

    fn csv_roster(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_csv_roster() {
        let file = csv_roster(
            "email,cgpa,skills\n\
             a@x.com,8.5,\"python, sql\"\n\
             b@x.com,6.0,python\n\
             ,9.0,\"python, sql\"\n",
        );

        let records = FileRoster::new(file.path(), None).load().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].email.as_deref(), Some("a@x.com"));
        assert_eq!(records[0].cgpa, 8.5);
        assert_eq!(records[0].skills, vec!["python", "sql"]);
        assert_eq!(records[2].email, None);
        assert_eq!(records[2].cgpa, 9.0);
    }

    #[test]
    fn test_blank_and_malformed_cells() {
        let file = csv_roster(
            "email,cgpa,skills\n\
             c@x.com,,rust\n\
             d@x.com,NaN,rust\n\
             e@x.com,n/a\n\
             ,,\n",
        );

        let records = FileRoster::new(file.path(), None).load().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].cgpa, 0.0);
        assert_eq!(records[1].cgpa, 0.0);
        assert_eq!(records[2].cgpa, 0.0);
        assert_eq!(records[2].skills, vec![""]);
    }

    #[test]
    fn test_na_email_does_not_reach_recipients() {
        let file = csv_roster(
            "email,cgpa,skills\n\
             a@x.com,8.5,python\n\
             N/A,9.0,python\n\
             null,9.5,python\n",
        );

        let records = FileRoster::new(file.path(), None).load().unwrap();
        assert_eq!(records[1].email, None);
        assert_eq!(records[2].email, None);

        let outcome = filter_roster(
            &records,
            &EligibilityCriteria::new("Data Intern", 7.0, vec!["python".into()]),
        );
        assert_eq!(outcome.recipients, vec!["a@x.com"]);
        assert_eq!(outcome.missing_email, 2);
    }

    #[test]
    fn test_load_workbook_roster() {
        let records = FileRoster::new(workbook_fixture(), None).load().unwrap();

        // Blank row 5 is skipped
        assert_eq!(records.len(), 6);
        assert_eq!(records[0], StudentRecord::new(Some("a@x.com"), 8.5, "python, sql"));
        assert_eq!(records[1].cgpa, 6.0);
        // "N/A" email text reads as no email
        assert_eq!(records[2].email, None);
        assert_eq!(records[2].cgpa, 9.0);
        // Blank and #N/A cgpa cells both become 0
        assert_eq!(records[3].email.as_deref(), Some("c@x.com"));
        assert_eq!(records[3].cgpa, 0.0);
        assert_eq!(records[4].cgpa, 0.0);
        assert_eq!(records[5].skills, vec!["sql", "python", "excel"]);
    }

    #[test]
    fn test_workbook_headers_are_trimmed() {
        let rows = read_rows(&workbook_fixture(), None).unwrap();
        assert!(rows[0].contains_key(EMAIL_COLUMN));
        assert!(rows[0].contains_key(SKILLS_COLUMN));
        assert_eq!(rows[0].get(CGPA_COLUMN), Some(&Cell::Number(8.5)));
    }

    #[test]
    fn test_workbook_roster_filters_end_to_end() {
        let records = FileRoster::new(workbook_fixture(), None).load().unwrap();
        let outcome = filter_roster(&records, &data_intern());

        assert_eq!(outcome.recipients, vec!["a@x.com", "e@x.com"]);
        assert_eq!(outcome.evaluated, 6);
        assert_eq!(outcome.below_threshold, 3);
        assert_eq!(outcome.missing_email, 1);
    }

    #[test]
    fn test_workbook_sheet_selection() {
        let roster = FileRoster::new(workbook_fixture(), Some("Archive".to_string()));
        let records = roster.load().unwrap();
        assert_eq!(records, vec![StudentRecord::new(Some("z@x.com"), 9.9, "python, sql")]);

        let missing = FileRoster::new(workbook_fixture(), Some("Nope".to_string())).load();
        assert!(matches!(missing, Err(NotifyError::DataSource(_))));
    }

    #[test]
    fn test_header_whitespace_is_trimmed() {
        let file = csv_roster(" email , cgpa ,skills\nf@x.com,7.0,go\n");
        let records = FileRoster::new(file.path(), None).load().unwrap();
        assert_eq!(records[0].email.as_deref(), Some("f@x.com"));
        assert_eq!(records[0].cgpa, 7.0);
    }

    #[test]
    fn test_missing_file_is_data_source_error() {
        let roster = FileRoster::new("/nonexistent/students.xlsx", None);
        assert!(matches!(roster.load(), Err(NotifyError::DataSource(_))));
    }

    #[test]
    fn test_unsupported_extension() {
        let file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        let result = read_rows(file.path(), None);
        assert!(matches!(result, Err(NotifyError::DataSource(_))));
    }

    #[test]
    fn test_corrupt_workbook_is_data_source_error() {
        let mut file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        file.write_all(b"definitely not a zip archive").unwrap();
        let result = FileRoster::new(file.path(), None).load();
        assert!(matches!(result, Err(NotifyError::DataSource(_))));
    }

    #[test]
    fn test_replace_roster() {
        let dir = tempfile::tempdir().unwrap();
        let roster = FileRoster::new(dir.path().join("data").join("students.csv"), None);

        let total = roster
            .replace(
                Some("Students.CSV"),
                b"email,cgpa,skills\na@x.com,8.5,python\nb@x.com,6.0,sql\n",
            )
            .unwrap();
        assert_eq!(total, 2);
        assert_eq!(roster.load().unwrap().len(), 2);
        assert!(!roster.path().with_extension("upload.csv").exists());
    }

    #[test]
    fn test_replace_rejects_unreadable_upload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("students.xlsx");
        std::fs::copy(workbook_fixture(), &path).unwrap();
        let roster = FileRoster::new(&path, None);

        let result = roster.replace(Some("students.xlsx"), b"not a workbook");
        assert!(matches!(result, Err(NotifyError::Validation(_))));
        assert!(!path.with_extension("upload.xlsx").exists());

        // Current roster still loads
        assert_eq!(roster.load().unwrap().len(), 6);
    }

    #[test]
    fn test_replace_rejects_other_format() {
        let dir = tempfile::tempdir().unwrap();
        let roster = FileRoster::new(dir.path().join("students.xlsx"), None);

        let result = roster.replace(Some("students.csv"), b"email,cgpa,skills\n");
        assert!(matches!(result, Err(NotifyError::Validation(_))));
        assert!(!roster.path().exists());
    }

    #[test]
    fn test_static_roster() {
        let roster = StaticRoster::new(vec![StudentRecord::new(Some("a@x.com"), 9.0, "rust")]);
        assert_eq!(roster.load().unwrap().len(), 1);
    }
}
