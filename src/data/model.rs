use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use serde::Serialize;

use super::error::{DataError, Result};
use super::normalize::normalize;

// ---------------------------------------------------------------------------
// SiteId – normalized join key
// ---------------------------------------------------------------------------

/// A school/experiment site identifier.
///
/// The only constructor normalizes its input, so any two `SiteId`s compare in
/// canonical Unicode form no matter which tool produced the original text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SiteId(String);

impl SiteId {
    pub fn new(raw: &str) -> Self {
        SiteId(normalize(raw.trim()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SiteId {
    fn from(raw: &str) -> Self {
        SiteId::new(raw)
    }
}

// ---------------------------------------------------------------------------
// CellValue – an open-ended spreadsheet cell
// ---------------------------------------------------------------------------

/// A dynamically-typed cell from a growth sheet column that has no fixed
/// meaning in the schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// ISO-8601 date-time kept as text.
    DateTime(String),
    Empty,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) | CellValue::DateTime(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Empty => Ok(()),
        }
    }
}

impl CellValue {
    /// Finite numeric view of the cell; numeric text counts, `NaN` and
    /// infinities do not.
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            CellValue::Float(v) => *v,
            CellValue::Integer(i) => *i as f64,
            CellValue::Text(s) => s.trim().parse().ok()?,
            _ => return None,
        };
        value.is_finite().then_some(value)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One sensor sample from an environment log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentRecord {
    pub time: NaiveDateTime,
    pub temperature: f64,
    pub humidity: f64,
    pub ph: f64,
    pub ec: f64,
    pub site: SiteId,
}

/// One measured specimen from a growth sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthRecord {
    pub site: SiteId,
    /// Fresh weight in grams.
    pub fresh_weight: f64,
    /// Remaining sheet columns, in sheet order.
    pub metrics: Vec<(String, CellValue)>,
}

impl GrowthRecord {
    pub fn metric(&self, name: &str) -> Option<&CellValue> {
        self.metrics
            .iter()
            .find(|(col, _)| col == name)
            .map(|(_, v)| v)
    }
}

// ---------------------------------------------------------------------------
// Per-site tables
// ---------------------------------------------------------------------------

pub type SiteTables<R> = BTreeMap<SiteId, Vec<R>>;
pub type EnvironmentData = SiteTables<EnvironmentRecord>;
pub type GrowthData = SiteTables<GrowthRecord>;

/// Flatten a site mapping into one table, site by site.
pub fn combined<R>(tables: &SiteTables<R>) -> impl Iterator<Item = &R> {
    tables.values().flatten()
}

/// Names of the extra growth columns across `records`, in first-seen order.
pub fn metric_columns<'a>(records: impl IntoIterator<Item = &'a GrowthRecord>) -> Vec<&'a str> {
    let mut names: Vec<&str> = Vec::new();
    for record in records {
        for (name, _) in &record.metrics {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
    }
    names
}

/// Whether a keyword search found a dataset at all.
///
/// `Available` with empty tables means a file exists but holds no rows;
/// `Unavailable` means no file matched.
#[derive(Debug, Clone, PartialEq)]
pub enum Availability<T> {
    Available(T),
    Unavailable { keyword: String },
}

impl<T> Availability<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available(_))
    }

    pub fn into_result(self) -> Result<T> {
        match self {
            Availability::Available(data) => Ok(data),
            Availability::Unavailable { keyword } => Err(DataError::Unavailable { keyword }),
        }
    }
}

/// The pair of datasets the dashboard renders.
#[derive(Debug, Clone)]
pub struct Datasets {
    pub environment: EnvironmentData,
    pub growth: GrowthData,
}

impl Datasets {
    pub fn environment_rows(&self) -> usize {
        self.environment.values().map(Vec::len).sum()
    }

    pub fn growth_rows(&self) -> usize {
        self.growth.values().map(Vec::len).sum()
    }
}
