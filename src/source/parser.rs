use crate::merger::dtos::{DivisionCode, DivisionItem, DivisionLevel};
use crate::merger::seeker::KATOTTG_SEEKER;
use crate::source::reader::{KatottgReader, KatottgRow};
use crate::state::SourceMetadata;
use crate::utils::{ImportError, Result, SourceConfig};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    pub delimiter: u8,
    pub has_headers: bool,
}

impl From<&SourceConfig> for ParseOptions {
    fn from(config: &SourceConfig) -> Self {
        Self {
            delimiter: config.delimiter as u8,
            has_headers: config.has_headers,
        }
    }
}

/// Tag for a register category letter.
pub fn category_type(category: &str) -> String {
    match category {
        "O" => "region",
        "K" => "special_status_city",
        "P" => "district",
        "H" => "hromada",
        "M" => "city",
        "T" => "urban_settlement",
        "C" => "village",
        "X" => "rural_settlement",
        "B" => "city_district",
        other => return other.to_lowercase(),
    }
    .to_string()
}

fn katottg_code(value: &str) -> DivisionCode {
    DivisionCode::new(KATOTTG_SEEKER.name, value)
}

pub fn row_to_division(row: &KatottgRow) -> Result<DivisionItem> {
    let level = DivisionLevel::from_depth(row.levels.len()).ok_or_else(|| {
        ImportError::ParseError {
            line: row.line,
            message: format!("unsupported depth {}", row.levels.len()),
        }
    })?;

    let mut types = BTreeSet::new();
    if !row.category.is_empty() {
        types.insert(category_type(&row.category));
    }

    Ok(DivisionItem {
        name: row.name.clone(),
        code: katottg_code(row.code()),
        path: row.ancestors().iter().map(|c| katottg_code(c)).collect(),
        level,
        types,
    })
}

/// The parsed register: divisions ordered by depth, read by offset.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    items: Vec<DivisionItem>,
}

impl ParsedFile {
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let items: Vec<DivisionItem> = serde_json::from_reader(BufReader::new(file))?;
        Ok(Self { items })
    }

    pub fn items(&self) -> &[DivisionItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Writes `items` as a JSON array. The file appears under `into` only once
/// fully written.
pub fn write_parsed_file(items: &[DivisionItem], into: &Path) -> Result<()> {
    if let Some(parent) = into.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp = into.with_extension("json.tmp");
    {
        let mut writer = BufWriter::new(std::fs::File::create(&tmp)?);
        serde_json::to_writer(&mut writer, items)?;
        writer.flush()?;
    }
    std::fs::rename(&tmp, into)?;

    Ok(())
}

/// Reads the register at `source`, orders it by depth and writes the parsed
/// file to `into`.
pub fn parse_source(source: &Path, into: &Path, options: ParseOptions) -> Result<SourceMetadata> {
    let reader = KatottgReader::new(source, options.delimiter, options.has_headers);

    let mut items = Vec::new();
    for row in reader.iter_rows()? {
        items.push(row_to_division(&row?)?);
    }

    // Register rows come depth-first; parents must precede every deeper row.
    items.sort_by_key(DivisionItem::depth);

    let mut records_per_depth = BTreeMap::new();
    for item in &items {
        *records_per_depth.entry(item.depth()).or_insert(0) += 1;
    }

    write_parsed_file(&items, into)?;

    let metadata = SourceMetadata {
        source_file: source.display().to_string(),
        file_size_bytes: std::fs::metadata(source)?.len(),
        total_records: items.len(),
        records_per_depth,
        parsed_at: crate::utils::unix_now(),
    };

    info!(
        source = %source.display(),
        parsed_file = %into.display(),
        records = metadata.total_records,
        "Register parsed"
    );

    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const REGISTER: &str = "\
L1;L2;L3;L4;L5;Cat;Name
UA01000000000013043;;;;;O;Автономна Республіка Крим
UA01000000000013043;UA01020000000022387;;;;P;Бахчисарайський
UA01000000000013043;UA01020000000022387;UA01020010000048857;;;H;Бахчисарайська
UA01000000000013043;UA01020000000022387;UA01020010000048857;UA01020010010063194;;M;Бахчисарай
UA05000000000010236;;;;;O;Вінницька
UA05000000000010236;UA05020000000026686;;;;P;Вінницький
";

    #[test]
    fn parses_and_orders_by_depth() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("katottg.csv");
        let parsed = dir.path().join("run").join("parsed.json");
        std::fs::write(&source, REGISTER).unwrap();

        let metadata = parse_source(
            &source,
            &parsed,
            ParseOptions {
                delimiter: b';',
                has_headers: true,
            },
        )
        .unwrap();

        assert_eq!(metadata.total_records, 6);
        assert_eq!(metadata.records_per_depth.get(&0), Some(&2));
        assert_eq!(metadata.records_per_depth.get(&1), Some(&2));

        let file = ParsedFile::load(&parsed).unwrap();
        let depths: Vec<usize> = file.items().iter().map(DivisionItem::depth).collect();
        assert_eq!(depths, vec![0, 0, 1, 1, 2, 3]);

        let names: Vec<&str> = file.items().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Автономна Республіка Крим",
                "Вінницька",
                "Бахчисарайський",
                "Вінницький",
                "Бахчисарайська",
                "Бахчисарай",
            ]
        );

        let city = &file.items()[5];
        assert_eq!(city.level, DivisionLevel::Locality);
        assert!(city.types.contains("city"));
        assert_eq!(city.parent().map(|c| c.value()), Some("UA01020010000048857"));
        assert!(!parsed.with_extension("json.tmp").exists());
    }

    #[test]
    fn unknown_category_kept_lowercased() {
        assert_eq!(category_type("Z"), "z");
        assert_eq!(category_type("H"), "hromada");
    }

    #[test]
    fn malformed_parsed_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        let parsed = dir.path().join("parsed.json");
        std::fs::write(&parsed, r#"[{"name": "x", "path": []}]"#).unwrap();

        assert!(matches!(
            ParsedFile::load(&parsed),
            Err(ImportError::JsonError(_))
        ));
    }
}
