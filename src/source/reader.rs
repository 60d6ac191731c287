use crate::utils::{ImportError, Result};
use csv::StringRecord;
use std::path::PathBuf;

/// Columns of the register: four levels, the additional level, the object
/// category and the object name.
const LEVEL_COLUMNS: usize = 5;
const CATEGORY_COLUMN: usize = 5;
const NAME_COLUMN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KatottgRow {
    pub line: u64,
    /// Non-empty level codes, outermost first. The last one is the row's own.
    pub levels: Vec<String>,
    pub category: String,
    pub name: String,
}

impl KatottgRow {
    pub fn code(&self) -> &str {
        self.levels.last().map(String::as_str).unwrap_or_default()
    }

    pub fn ancestors(&self) -> &[String] {
        &self.levels[..self.levels.len().saturating_sub(1)]
    }
}

pub struct KatottgReader {
    path: PathBuf,
    delimiter: u8,
    has_headers: bool,
}

impl KatottgReader {
    pub fn new(path: impl Into<PathBuf>, delimiter: u8, has_headers: bool) -> Self {
        Self {
            path: path.into(),
            delimiter,
            has_headers,
        }
    }

    pub fn iter_rows(&self) -> Result<KatottgRowIterator> {
        if !self.path.exists() {
            return Err(ImportError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("register not found: {}", self.path.display()),
            )));
        }

        let reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(self.has_headers)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)?;

        Ok(KatottgRowIterator { reader })
    }
}

pub struct KatottgRowIterator {
    reader: csv::Reader<std::fs::File>,
}

impl Iterator for KatottgRowIterator {
    type Item = Result<KatottgRow>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut record = StringRecord::new();
        loop {
            match self.reader.read_record(&mut record) {
                Ok(true) if is_blank(&record) => continue,
                Ok(true) => return Some(parse_row(&record)),
                Ok(false) => return None,
                Err(e) => return Some(Err(ImportError::CsvError(e))),
            }
        }
    }
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(str::is_empty)
}

fn parse_row(record: &StringRecord) -> Result<KatottgRow> {
    let line = record.position().map(|p| p.line()).unwrap_or(0);
    let field = |index: usize| record.get(index).unwrap_or_default().to_string();

    let levels: Vec<String> = (0..LEVEL_COLUMNS)
        .map(field)
        .filter(|code| !code.is_empty())
        .collect();

    if levels.is_empty() {
        return Err(ImportError::ParseError {
            line,
            message: "row has no level codes".to_string(),
        });
    }

    let name = field(NAME_COLUMN);
    if name.is_empty() {
        return Err(ImportError::ParseError {
            line,
            message: format!("row {} has no object name", levels.join("/")),
        });
    }

    Ok(KatottgRow {
        line,
        levels,
        category: field(CATEGORY_COLUMN),
        name,
    })
}
