use eframe::egui::{self, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use crate::color::SitePalette;
use crate::data::aggregate::{JoinedGrowth, SiteSummary};
use crate::data::model::EnvironmentRecord;

const ROW_HEIGHT: f32 = 18.0;
const RAW_TABLE_HEIGHT: f32 = 280.0;

// ---------------------------------------------------------------------------
// Overview
// ---------------------------------------------------------------------------

/// Site / target EC / specimen count table with the site colour swatch.
pub fn site_summary(ui: &mut Ui, summaries: &[SiteSummary], palette: &SitePalette) {
    egui::Grid::new("site_summary")
        .striped(true)
        .num_columns(3)
        .show(ui, |ui: &mut Ui| {
            ui.strong("학교명");
            ui.strong("EC 목표");
            ui.strong("개체수");
            ui.end_row();

            for s in summaries {
                ui.label(RichText::new(s.site.as_str()).color(palette.color_for(&s.site)));
                ui.label(format!("{:.1}", s.target_ec));
                ui.label(s.specimens.to_string());
                ui.end_row();
            }
        });
}

/// A labelled headline number.
pub fn metric(ui: &mut Ui, label: &str, value: String) {
    ui.group(|ui: &mut Ui| {
        ui.vertical(|ui: &mut Ui| {
            ui.label(label);
            ui.heading(value);
        });
    });
}

// ---------------------------------------------------------------------------
// Raw tables
// ---------------------------------------------------------------------------

pub fn environment_rows(ui: &mut Ui, rows: &[&EnvironmentRecord]) {
    const HEADERS: [&str; 6] = ["time", "temperature", "humidity", "ph", "ec", "학교"];

    ui.push_id("environment_rows", |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .max_scroll_height(RAW_TABLE_HEIGHT)
            .column(Column::auto().at_least(140.0))
            .columns(Column::auto().at_least(70.0), HEADERS.len() - 1)
            .header(ROW_HEIGHT + 2.0, |mut header| {
                for name in HEADERS {
                    header.col(|ui| {
                        ui.strong(name);
                    });
                }
            })
            .body(|body| {
                body.rows(ROW_HEIGHT, rows.len(), |mut row| {
                    let r = rows[row.index()];
                    let cells = [
                        r.time.format("%Y-%m-%d %H:%M:%S").to_string(),
                        format!("{:.2}", r.temperature),
                        format!("{:.2}", r.humidity),
                        format!("{:.2}", r.ph),
                        format!("{:.2}", r.ec),
                        r.site.to_string(),
                    ];
                    for cell in cells {
                        row.col(|ui| {
                            ui.label(cell);
                        });
                    }
                });
            });
    });
}

/// Growth rows with their joined target EC; `extra` names the open-ended
/// sheet columns to show after the fixed ones.
pub fn growth_rows(ui: &mut Ui, rows: &[JoinedGrowth<'_>], extra: &[&str]) {
    let fixed = ["학교", "EC", "생중량(g)"];

    ui.push_id("growth_rows", |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .max_scroll_height(RAW_TABLE_HEIGHT)
            .columns(Column::auto().at_least(60.0), fixed.len() + extra.len())
            .header(ROW_HEIGHT + 2.0, |mut header| {
                for name in fixed.iter().chain(extra) {
                    header.col(|ui| {
                        ui.strong(*name);
                    });
                }
            })
            .body(|body| {
                body.rows(ROW_HEIGHT, rows.len(), |mut row| {
                    let JoinedGrowth { record, target_ec } = rows[row.index()];
                    let mut cells = vec![
                        record.site.to_string(),
                        format!("{target_ec:.1}"),
                        format!("{:.2}", record.fresh_weight),
                    ];
                    cells.extend(
                        extra
                            .iter()
                            .map(|name| record.metric(name).map(ToString::to_string).unwrap_or_default()),
                    );
                    for cell in cells {
                        row.col(|ui| {
                            ui.label(cell);
                        });
                    }
                });
            });
    });
}
