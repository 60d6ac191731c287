use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A code in one identifier namespace, serialised as `[seeker, value]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DivisionCode(pub String, pub String);

impl DivisionCode {
    pub fn new(seeker: impl Into<String>, value: impl Into<String>) -> Self {
        Self(seeker.into(), value.into())
    }

    pub fn seeker(&self) -> &str {
        &self.0
    }

    pub fn value(&self) -> &str {
        &self.1
    }

    /// Key under which the code is indexed in the division store.
    pub fn key(&self) -> String {
        format!("{}:{}", self.0, self.1)
    }
}

impl fmt::Display for DivisionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.0, self.1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DivisionLevel {
    Country,
    Region,
    Subregion,
    Municipality,
    Locality,
    Sublocality,
}

impl DivisionLevel {
    /// Level of a register row found `depth` levels below the country.
    pub fn from_depth(depth: usize) -> Option<Self> {
        u8::try_from(depth).ok().and_then(|d| Self::try_from(d).ok())
    }
}

impl From<DivisionLevel> for u8 {
    fn from(level: DivisionLevel) -> Self {
        match level {
            DivisionLevel::Country => 0,
            DivisionLevel::Region => 1,
            DivisionLevel::Subregion => 2,
            DivisionLevel::Municipality => 3,
            DivisionLevel::Locality => 4,
            DivisionLevel::Sublocality => 5,
        }
    }
}

impl TryFrom<u8> for DivisionLevel {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(DivisionLevel::Country),
            1 => Ok(DivisionLevel::Region),
            2 => Ok(DivisionLevel::Subregion),
            3 => Ok(DivisionLevel::Municipality),
            4 => Ok(DivisionLevel::Locality),
            5 => Ok(DivisionLevel::Sublocality),
            other => Err(format!("unknown division level {}", other)),
        }
    }
}

impl fmt::Display for DivisionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DivisionLevel::Country => write!(f, "country"),
            DivisionLevel::Region => write!(f, "region"),
            DivisionLevel::Subregion => write!(f, "subregion"),
            DivisionLevel::Municipality => write!(f, "municipality"),
            DivisionLevel::Locality => write!(f, "locality"),
            DivisionLevel::Sublocality => write!(f, "sublocality"),
        }
    }
}

/// One administrative division as it enters the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivisionItem {
    pub name: String,
    pub code: DivisionCode,
    /// Ancestor codes from the root down to the direct parent.
    pub path: Vec<DivisionCode>,
    pub level: DivisionLevel,
    #[serde(default)]
    pub types: BTreeSet<String>,
}

impl DivisionItem {
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    pub fn parent(&self) -> Option<&DivisionCode> {
        self.path.last()
    }

    /// Same item with `root` inserted at the front of its path.
    pub fn with_root(mut self, root: &DivisionCode) -> Self {
        self.path.insert(0, root.clone());
        self
    }
}

/// Localized name for a division that must already exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivisionTranslationItem {
    pub name: String,
    pub code: DivisionCode,
}

impl From<&DivisionItem> for DivisionTranslationItem {
    fn from(item: &DivisionItem) -> Self {
        Self {
            name: item.name.clone(),
            code: item.code.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsed_record_schema() {
        let item: DivisionItem = serde_json::from_str(
            r#"{
                "name": "Автономна Республіка Крим",
                "code": ["KATOTTG", "UA01000000000013043"],
                "path": [],
                "level": 1,
                "types": ["region"]
            }"#,
        )
        .unwrap();

        assert_eq!(item.code.seeker(), "KATOTTG");
        assert_eq!(item.level, DivisionLevel::Region);
        assert_eq!(item.depth(), 0);
        assert!(item.types.contains("region"));

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["code"][1], "UA01000000000013043");
        assert_eq!(json["level"], 1);
    }

    #[test]
    fn unknown_level_is_rejected() {
        let result: std::result::Result<DivisionItem, _> = serde_json::from_str(
            r#"{"name": "x", "code": ["KATOTTG", "x"], "path": [], "level": 9, "types": []}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn with_root_prefixes_path() {
        let root = DivisionCode::new("ISO3166", "UA");
        let item = DivisionItem {
            name: "Район".to_string(),
            code: DivisionCode::new("KATOTTG", "UA01020000000022387"),
            path: vec![DivisionCode::new("KATOTTG", "UA01000000000013043")],
            level: DivisionLevel::Subregion,
            types: BTreeSet::new(),
        }
        .with_root(&root);

        assert_eq!(item.path.first(), Some(&root));
        assert_eq!(item.depth(), 2);
        assert_eq!(item.parent().map(|c| c.value()), Some("UA01000000000013043"));
    }
}
