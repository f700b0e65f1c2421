use std::fmt;

use super::error::{DataError, Result};
use super::model::{SiteId, SiteTables};
use crate::config::SiteConfig;

/// Label of the "every site" choice in the site selector.
pub const ALL_SITES_LABEL: &str = "전체";

// ---------------------------------------------------------------------------
// Site selection: which tables a view covers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SiteSelection {
    #[default]
    All,
    Site(SiteId),
}

impl fmt::Display for SiteSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SiteSelection::All => f.write_str(ALL_SITES_LABEL),
            SiteSelection::Site(site) => write!(f, "{site}"),
        }
    }
}

impl SiteSelection {
    /// Selector choices: "all" first, then the configured sites in order.
    pub fn options(config: &SiteConfig) -> Vec<SiteSelection> {
        std::iter::once(SiteSelection::All)
            .chain(config.sites().cloned().map(SiteSelection::Site))
            .collect()
    }

    pub fn site(&self) -> Option<&SiteId> {
        match self {
            SiteSelection::All => None,
            SiteSelection::Site(site) => Some(site),
        }
    }
}

/// Borrow the `(site, table)` pairs covered by `selection`.
///
/// * `All` → every table, in key order
/// * `Site(s)` → the table of `s`; a site without a table is an error
pub fn select_tables<'a, R>(
    tables: &'a SiteTables<R>,
    selection: &SiteSelection,
) -> Result<Vec<(&'a SiteId, &'a [R])>> {
    match selection {
        SiteSelection::All => Ok(tables
            .iter()
            .map(|(site, table)| (site, table.as_slice()))
            .collect()),
        SiteSelection::Site(site) => tables
            .get_key_value(site)
            .map(|(site, table)| vec![(site, table.as_slice())])
            .ok_or_else(|| DataError::UnknownSite(site.clone())),
    }
}

/// Rows covered by `selection`, in table order.
pub fn selected_rows<'a, R>(
    tables: &'a SiteTables<R>,
    selection: &SiteSelection,
) -> Result<Vec<&'a R>> {
    Ok(select_tables(tables, selection)?
        .into_iter()
        .flat_map(|(_, table)| table.iter())
        .collect())
}
