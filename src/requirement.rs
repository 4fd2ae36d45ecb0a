use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::model::ResolvedPackage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ge,
    Le,
    Gt,
    Lt,
    Compatible,
    Ne,
    Space,
    None,
}

// Tried top to bottom; `>=`/`<=` must precede `>`/`<`.
const OPERATOR_PATTERNS: [(Operator, &str); 8] = [
    (Operator::Eq, r"^([^=<>~!]+)==([^=<>~!]+)$"),
    (Operator::Ge, r"^([^=<>~!]+)>=([^=<>~!]+)$"),
    (Operator::Le, r"^([^=<>~!]+)<=([^=<>~!]+)$"),
    (Operator::Gt, r"^([^=<>~!]+)>([^=<>~!]+)$"),
    (Operator::Lt, r"^([^=<>~!]+)<([^=<>~!]+)$"),
    (Operator::Compatible, r"^([^=<>~!]+)~=([^=<>~!]+)$"),
    (Operator::Ne, r"^([^=<>~!]+)!=([^=<>~!]+)$"),
    (Operator::Space, r"^([^=<>~!]+)\s+([^=<>~!]+)$"),
];

static OPERATOR_TABLE: LazyLock<Vec<(Operator, Regex)>> = LazyLock::new(|| {
    OPERATOR_PATTERNS
        .iter()
        .map(|(operator, pattern)| {
            let re = Regex::new(pattern).expect("operator patterns are valid regexes");
            (*operator, re)
        })
        .collect()
});

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is a valid regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub name: String,
    pub operator: Operator,
    pub raw_version: Option<String>,
    pub version: Option<String>,
}

impl Requirement {
    pub fn parse(raw: &str) -> Self {
        let cleaned = strip_markers(raw);

        for (operator, re) in OPERATOR_TABLE.iter() {
            let Some(caps) = re.captures(&cleaned) else {
                continue;
            };
            let name = caps[1].trim().to_string();
            let raw_version = caps[2].trim().to_string();
            let version = numeric_version(&raw_version);
            return Self {
                name,
                operator: *operator,
                raw_version: Some(raw_version),
                version,
            };
        }

        Self {
            name: cleaned.trim().to_string(),
            operator: Operator::None,
            raw_version: None,
            version: None,
        }
    }

    pub fn resolved(&self) -> Option<ResolvedPackage> {
        self.version
            .as_deref()
            .map(|version| ResolvedPackage::new(&self.name, version))
    }
}

/// Drops environment markers (`;...`) and extras (`[...]`) and trims the rest.
pub fn strip_declaration(raw: &str) -> &str {
    let without_marker = raw.split(';').next().unwrap_or_default();
    without_marker.split('[').next().unwrap_or_default().trim()
}

fn strip_markers(raw: &str) -> String {
    let base = strip_declaration(raw);
    WHITESPACE_RE
        .replace_all(base, " ")
        .trim()
        .replace(['(', ')'], "")
}

fn numeric_version(raw: &str) -> Option<String> {
    let digits: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if digits.is_empty() { None } else { Some(digits) }
}

pub fn read_requirements(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read requirements from {}", path.display()))?;
    Ok(parse_requirement_lines(&content))
}

pub fn parse_requirement_lines(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
