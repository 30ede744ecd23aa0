//! Per-subject results workbooks with duplicate-row suppression.

pub mod lock;
pub mod schema;
pub mod workbook;

use crate::config::LockWait;
use crate::error::LedgerError;
use crate::model::TestKind;
use crate::utils::file_name_component;
use std::fs;
use std::path::{Path, PathBuf};
use workbook::Workbook;

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Empty,
}

impl CellValue {
    /// Compares against a cell as read back from a workbook.
    pub fn matches(&self, stored: &str) -> bool {
        match self {
            Self::Text(text) => stored == text,
            Self::Number(number) => stored
                .trim()
                .parse::<f64>()
                .is_ok_and(|value| value == *number),
            Self::Bool(flag) => {
                let text = if *flag { "TRUE" } else { "FALSE" };
                stored.eq_ignore_ascii_case(text)
            }
            Self::Empty => stored.is_empty(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for CellValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<f64> for CellValue {
    fn from(number: f64) -> Self {
        Self::Number(number)
    }
}

impl From<bool> for CellValue {
    fn from(flag: bool) -> Self {
        Self::Bool(flag)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Empty)
    }
}

/// One results row together with the header it belongs under.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerRow {
    pub headers: Vec<String>,
    pub values: Vec<CellValue>,
}

impl LedgerRow {
    pub fn push(&mut self, header: impl Into<String>, value: impl Into<CellValue>) {
        self.headers.push(header.into());
        self.values.push(value.into());
    }

    pub fn width(&self) -> usize {
        self.values.len()
    }

    /// Cell-by-cell equality; cells past the candidate's width must be blank.
    pub fn matches(&self, stored: &[String]) -> bool {
        if stored.len() < self.values.len() {
            let padded: Vec<String> = stored
                .iter()
                .cloned()
                .chain(std::iter::repeat(String::new()))
                .take(self.values.len())
                .collect();
            return self.matches(&padded);
        }
        self.values
            .iter()
            .zip(stored)
            .all(|(value, cell)| value.matches(cell))
            && stored[self.values.len()..].iter().all(String::is_empty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Created,
    Appended,
    Duplicate,
    /// The workbook stayed locked past the wait timeout; nothing was written.
    Locked,
}

pub struct Ledger {
    dir: PathBuf,
    wait: LockWait,
}

impl Ledger {
    pub fn new(dir: impl AsRef<Path>, wait: LockWait) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            wait,
        }
    }

    pub fn path_for(&self, subject: &str) -> PathBuf {
        self.dir
            .join(format!("Results_{}.xlsx", file_name_component(subject)))
    }

    /// Appends `row` to the `kind` sheet of the subject's workbook unless an
    /// identical row is already there.
    pub fn append(
        &self,
        subject: &str,
        kind: TestKind,
        row: &LedgerRow,
    ) -> Result<AppendOutcome, LedgerError> {
        let path = self.path_for(subject);
        let sheet = kind.name();

        if !path.is_file() {
            fs::create_dir_all(&self.dir)?;
            let mut book = Workbook::create(&path);
            book.add_sheet(sheet, &row.headers)?;
            book.append_row(sheet, &row.values)?;
            book.save()?;
            let file = path.display();
            log::info!("Created {file} with {sheet} results for {subject}");
            return Ok(AppendOutcome::Created);
        }

        if !lock::wait_until_writable(&path, &self.wait)? {
            let file = path.display();
            log::debug!("Skipping {sheet} results for {subject}: {file} stayed locked");
            return Ok(AppendOutcome::Locked);
        }

        let mut book = Workbook::open(&path)?;
        if !book.has_sheet(sheet) {
            book.add_sheet(sheet, &row.headers)?;
        }

        if book.rows(sheet)?.iter().any(|stored| row.matches(stored)) {
            log::info!(
                "Series date {}, patient {subject}, test {sheet} already analyzed.",
                row.values
                    .first()
                    .map(|value| match value {
                        CellValue::Text(text) => text.as_str(),
                        _ => "?",
                    })
                    .unwrap_or("?")
            );
            return Ok(AppendOutcome::Duplicate);
        }

        if row.width() > book.header_width(sheet)? {
            book.set_header(sheet, &row.headers)?;
        }
        book.append_row(sheet, &row.values)?;
        book.save()?;
        log::info!("Saved {sheet} results for {subject} to {}", path.display());
        Ok(AppendOutcome::Appended)
    }
}
