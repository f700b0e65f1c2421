use std::path::PathBuf;

use crate::data::error::{DataError, Result};
use crate::data::model::SiteId;

/// Keyword every environment log file name contains.
pub const ENVIRONMENT_KEYWORD: &str = "환경데이터";
/// Keyword the growth-result workbook name contains.
pub const GROWTH_KEYWORD: &str = "생육결과데이터";

/// Participating schools and their target EC concentration.
const SITE_EC: [(&str, f64); 4] = [
    ("송도고", 1.0),
    ("하늘고", 2.0),
    ("아라고", 4.0),
    ("동산고", 8.0),
];

// ---------------------------------------------------------------------------
// Site configuration
// ---------------------------------------------------------------------------

/// Static site → target EC table, in presentation order.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteConfig {
    entries: Vec<(SiteId, f64)>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self::from_entries(SITE_EC)
    }
}

impl SiteConfig {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, f64)>) -> Self {
        SiteConfig {
            entries: entries
                .into_iter()
                .map(|(name, ec)| (SiteId::new(name), ec))
                .collect(),
        }
    }

    /// Target EC for `site`; unknown sites are an error, never a default.
    pub fn target_ec(&self, site: &SiteId) -> Result<f64> {
        self.entries
            .iter()
            .find(|(id, _)| id == site)
            .map(|&(_, ec)| ec)
            .ok_or_else(|| DataError::UnknownSite(site.clone()))
    }

    pub fn sites(&self) -> impl Iterator<Item = &SiteId> {
        self.entries.iter().map(|(id, _)| id)
    }

    pub fn entries(&self) -> &[(SiteId, f64)] {
        &self.entries
    }
}

// ---------------------------------------------------------------------------
// Dashboard configuration
// ---------------------------------------------------------------------------

/// What to do when two environment files yield the same site id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicateSitePolicy {
    /// Keep the file processed last.
    #[default]
    Overwrite,
    /// Fail the load.
    Error,
    /// Concatenate the rows and re-sort by time.
    Merge,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub data_dir: PathBuf,
    pub environment_keyword: String,
    pub growth_keyword: String,
    pub duplicate_policy: DuplicateSitePolicy,
    pub sites: SiteConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            environment_keyword: ENVIRONMENT_KEYWORD.to_string(),
            growth_keyword: GROWTH_KEYWORD.to_string(),
            duplicate_policy: DuplicateSitePolicy::default(),
            sites: SiteConfig::default(),
        }
    }
}

impl DashboardConfig {
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }
}
