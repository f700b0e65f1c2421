use std::path::PathBuf;
use std::sync::Arc;

use crate::color::SitePalette;
use crate::config::{DashboardConfig, SiteConfig};
use crate::data::aggregate::{
    best_ec, global_averages, growth_by_ec, growth_spread, site_env_means, site_series,
    site_summaries, total_specimens, EcGrowth, GlobalAverages, GrowthSpread, SiteEnvMeans,
    SiteSeries, SiteSummary,
};
use crate::data::cache::DatasetCache;
use crate::data::error::Result;
use crate::data::export::{self, ExportFormat, ExportTable};
use crate::data::filter::SiteSelection;
use crate::data::model::Datasets;

// ---------------------------------------------------------------------------
// Tabs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Overview,
    Environment,
    Growth,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Overview, Tab::Environment, Tab::Growth];

    pub fn label(self) -> &'static str {
        match self {
            Tab::Overview => "실험 개요",
            Tab::Environment => "환경 데이터",
            Tab::Growth => "생육 결과",
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregate views
// ---------------------------------------------------------------------------

/// Everything the tabs display, derived from one load of the datasets.
#[derive(Debug, Clone)]
pub struct DashboardViews {
    pub summaries: Vec<SiteSummary>,
    pub total_specimens: usize,
    pub averages: Option<GlobalAverages>,
    pub env_means: Vec<SiteEnvMeans>,
    pub ec_growth: Vec<EcGrowth>,
    pub spread: Vec<GrowthSpread>,
}

impl DashboardViews {
    pub fn compute(sites: &SiteConfig, data: &Datasets) -> Result<Self> {
        Ok(Self {
            summaries: site_summaries(sites, &data.growth),
            total_specimens: total_specimens(&data.growth),
            averages: global_averages(&data.environment),
            env_means: site_env_means(&data.environment),
            ec_growth: growth_by_ec(sites, &data.growth)?,
            spread: growth_spread(sites, &data.growth),
        })
    }

    pub fn best_ec(&self) -> Option<&EcGrowth> {
        best_ec(&self.ec_growth)
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: DashboardConfig,

    /// Loaded datasets (None until a load succeeds).
    pub datasets: Option<Arc<Datasets>>,

    /// Aggregates of `datasets`.
    pub views: Option<DashboardViews>,

    /// Site chosen in the side panel.
    pub selection: SiteSelection,

    pub palette: SitePalette,

    pub tab: Tab,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(DashboardConfig::default())
    }
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            palette: SitePalette::new(&config.sites),
            config,
            datasets: None,
            views: None,
            selection: SiteSelection::default(),
            tab: Tab::default(),
            status_message: None,
        }
    }

    /// Load (or fetch from the session cache) and aggregate the datasets.
    /// Any failure clears the dashboard so nothing partial is shown.
    pub fn load(&mut self) {
        let result = DatasetCache::global()
            .get_or_load(&self.config)
            .and_then(|data| {
                let views = DashboardViews::compute(&self.config.sites, &data)?;
                Ok((data, views))
            });

        match result {
            Ok((data, views)) => {
                log::info!(
                    "Dashboard ready: {} environment rows, {} growth rows",
                    data.environment_rows(),
                    data.growth_rows()
                );
                self.datasets = Some(data);
                self.views = Some(views);
                self.status_message = None;
            }
            Err(e) => {
                log::error!("Failed to load data: {e:#}");
                self.datasets = None;
                self.views = None;
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Drop the session cache and load again.
    pub fn reload(&mut self) {
        let cache = DatasetCache::global();
        if cache.is_loaded() {
            log::info!("Dropping cached datasets for {}", self.config.data_dir.display());
        }
        cache.reset();
        self.load();
    }

    pub fn set_data_dir(&mut self, dir: PathBuf) {
        self.config = self.config.clone().with_data_dir(dir);
        self.load();
    }

    /// Time series of the selected site, if a single site is selected.
    pub fn selected_series(&self) -> Option<Result<SiteSeries>> {
        let site = self.selection.site()?;
        let data = self.datasets.as_ref()?;
        Some(site_series(&self.config.sites, &data.environment, site))
    }

    /// Serialize a combined table for download.
    pub fn export(&self, table: ExportTable, format: ExportFormat) -> anyhow::Result<Vec<u8>> {
        let data = self
            .datasets
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no dataset loaded"))?;
        export::export(table, format, &self.config.sites, &data.environment, &data.growth)
    }
}
