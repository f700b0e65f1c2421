use std::collections::BTreeMap;

use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::config::SiteConfig;
use crate::data::model::SiteId;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.65, 0.5);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Site colours
// ---------------------------------------------------------------------------

/// One colour per configured site, stable across tabs and charts.
#[derive(Debug, Clone)]
pub struct SitePalette {
    mapping: BTreeMap<SiteId, Color32>,
    legend: Vec<(String, Color32)>,
    default_color: Color32,
}

impl SitePalette {
    pub fn new(sites: &SiteConfig) -> Self {
        let sites: Vec<&SiteId> = sites.sites().collect();
        let legend: Vec<(String, Color32)> = sites
            .iter()
            .zip(generate_palette(sites.len()))
            .map(|(site, c)| (site.to_string(), c))
            .collect();
        let mapping = sites
            .iter()
            .zip(&legend)
            .map(|(site, (_, c))| ((*site).clone(), *c))
            .collect();

        SitePalette {
            mapping,
            legend,
            default_color: Color32::GRAY,
        }
    }

    /// Colour of `site`; sites outside the configuration are grey.
    pub fn color_for(&self, site: &SiteId) -> Color32 {
        self.mapping
            .get(site)
            .copied()
            .unwrap_or(self.default_color)
    }

    /// Legend entries (site label → colour) in configuration order.
    pub fn legend_entries(&self) -> &[(String, Color32)] {
        &self.legend
    }
}
