use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

pub const EMAIL_COLUMN: &str = "email";
pub const CGPA_COLUMN: &str = "cgpa";
pub const SKILLS_COLUMN: &str = "skills";

/// Text that spreadsheet tooling conventionally writes for an absent value.
/// Compared after trimming, case-sensitively.
pub const NA_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// One cell as read from the roster file.
///
/// Blank cells, NA placeholder text, NaN and infinities all arrive as
/// `Missing` so later stages only ever see one representation of "no value".
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
    Bool(bool),
    Missing,
}

impl Cell {
    /// Builds a numeric cell, folding non-finite values into `Missing`
    pub fn number(value: f64) -> Self {
        if value.is_finite() {
            Cell::Number(value)
        } else {
            Cell::Missing
        }
    }

    /// Builds a text cell, folding blank strings and NA markers into `Missing`
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() || NA_MARKERS.contains(&trimmed) {
            Cell::Missing
        } else {
            Cell::Text(value)
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    /// Text form used when a text column holds a non-text value
    fn as_text(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            Cell::Number(n) => n.to_string(),
            Cell::Bool(b) => if *b { "True" } else { "False" }.to_string(),
            Cell::Missing => String::new(),
        }
    }
}

/// Column-name keyed row straight from the roster file
pub type RawRow = HashMap<String, Cell>;

/// Typed student produced by normalizing a `RawRow`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentRecord {
    pub email: Option<String>,
    pub cgpa: f64,
    /// Lowercased, trimmed tokens of the comma-separated skills field.
    /// Empty tokens from stray commas are kept.
    pub skills: Vec<String>,
}

impl StudentRecord {
    pub fn new(email: Option<&str>, cgpa: f64, skills: &str) -> Self {
        Self {
            email: email
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(str::to_string),
            cgpa,
            skills: normalize_skills(skills),
        }
    }

    /// Normalizes a raw row. Never fails: malformed fields degrade to defaults.
    pub fn from_row(row: &RawRow) -> Self {
        let email = match row.get(EMAIL_COLUMN) {
            Some(Cell::Text(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        };

        let cgpa = parse_cgpa(row.get(CGPA_COLUMN).unwrap_or(&Cell::Missing));

        let skills_text = row
            .get(SKILLS_COLUMN)
            .map(Cell::as_text)
            .unwrap_or_default();

        Self {
            email,
            cgpa,
            skills: normalize_skills(&skills_text),
        }
    }

    pub fn has_skill(&self, skill: &str) -> bool {
        self.skills.iter().any(|s| s == skill)
    }
}

/// Parses the loosely typed cgpa cell; anything unusable becomes 0
pub fn parse_cgpa(cell: &Cell) -> f64 {
    match cell {
        Cell::Number(n) => *n,
        Cell::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Cell::Text(s) => match s.trim().parse::<f64>() {
            Ok(value) => value,
            Err(_) => {
                debug!("Unparsable cgpa {:?}, treating as 0", s);
                0.0
            }
        },
        Cell::Missing => 0.0,
    }
}

pub fn normalize_skills(raw: &str) -> Vec<String> {
    raw.split(',').map(|s| s.trim().to_lowercase()).collect()
}
