use anyhow::Context;
use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::data::aggregate::join_records;
use crate::data::export::{ExportFormat, ExportTable};
use crate::data::filter::{selected_rows, SiteSelection};
use crate::data::model::metric_columns;
use crate::state::{AppState, Tab};
use crate::ui::{plot, tables};

// ---------------------------------------------------------------------------
// Left side panel – site selection
// ---------------------------------------------------------------------------

/// Render the left panel: site selector, colour legend, dataset info.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("학교 선택");
    ui.separator();

    let options = SiteSelection::options(&state.config.sites);
    egui::ComboBox::from_id_salt("site_selection")
        .selected_text(state.selection.to_string())
        .show_ui(ui, |ui: &mut Ui| {
            for option in options {
                let label = option.to_string();
                ui.selectable_value(&mut state.selection, option, label);
            }
        });
    ui.separator();

    ui.strong("Sites");
    for (label, color) in state.palette.legend_entries() {
        ui.label(RichText::new(format!("■ {label}")).color(*color));
    }
    ui.separator();

    ui.label(format!("Folder: {}", state.config.data_dir.display()));
    match &state.datasets {
        Some(data) => {
            ui.label(format!("{} environment rows", data.environment_rows()));
            ui.label(format!("{} growth rows", data.growth_rows()));
        }
        None => {
            ui.label("No dataset loaded.");
        }
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open data folder…").clicked() {
                open_folder_dialog(state);
                ui.close_menu();
            }
            if ui.button("Reload").clicked() {
                state.reload();
                ui.close_menu();
            }
        });

        ui.separator();
        for tab in Tab::ALL {
            ui.selectable_value(&mut state.tab, tab, tab.label());
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Tabs
// ---------------------------------------------------------------------------

/// Render the active tab, or a halting error when nothing is loaded.
pub fn central_panel(ui: &mut Ui, state: &mut AppState) {
    if state.views.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading(
                RichText::new("data 폴더 안의 파일을 찾을 수 없습니다.  (File → Open data folder…)")
                    .color(Color32::RED),
            );
        });
        return;
    }

    ui.heading("극지식물 최적 EC 농도 연구");
    ui.separator();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| match state.tab {
            Tab::Overview => overview_tab(ui, state),
            Tab::Environment => environment_tab(ui, state),
            Tab::Growth => growth_tab(ui, state),
        });
}

fn overview_tab(ui: &mut Ui, state: &AppState) {
    let Some(views) = &state.views else { return };

    ui.strong("연구 배경 및 목적");
    ui.label("EC 농도 변화에 따른 극지식물 생육 최적 조건을 분석한다.");
    ui.add_space(8.0);
    tables::site_summary(ui, &views.summaries, &state.palette);
    ui.add_space(8.0);

    ui.horizontal(|ui: &mut Ui| {
        tables::metric(ui, "총 개체수", views.total_specimens.to_string());
        match views.averages {
            Some(avg) => {
                tables::metric(ui, "평균 온도", format!("{:.2}℃", avg.temperature));
                tables::metric(ui, "평균 습도", format!("{:.2}%", avg.humidity));
            }
            None => {
                tables::metric(ui, "평균 온도", "-".into());
                tables::metric(ui, "평균 습도", "-".into());
            }
        }
        let best = views
            .best_ec()
            .map_or_else(|| "-".to_string(), |b| format!("{:.1}", b.ec));
        tables::metric(ui, "최적 EC", best);
    });
}

fn environment_tab(ui: &mut Ui, state: &mut AppState) {
    let (Some(views), Some(data)) = (&state.views, &state.datasets) else {
        return;
    };

    ui.strong("학교별 환경 평균 비교");
    plot::environment_means(ui, &views.env_means, &state.palette);

    if let Some(series) = state.selected_series() {
        ui.add_space(8.0);
        match series {
            Ok(series) => {
                ui.strong(format!("{} 환경 변화", series.site));
                plot::site_time_series(ui, &series);
            }
            Err(e) => {
                ui.label(RichText::new(format!("Error: {e}")).color(Color32::RED));
            }
        }
    }

    let data = data.clone();
    egui::CollapsingHeader::new("환경 데이터 원본")
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            match selected_rows(&data.environment, &state.selection) {
                Ok(rows) => tables::environment_rows(ui, &rows),
                Err(e) => {
                    ui.label(RichText::new(format!("Error: {e}")).color(Color32::RED));
                }
            }
            export_buttons(ui, state, ExportTable::Environment);
        });
}

fn growth_tab(ui: &mut Ui, state: &mut AppState) {
    let (Some(views), Some(data)) = (&state.views, &state.datasets) else {
        return;
    };

    ui.strong("EC별 생육 비교");
    let best = views.best_ec();
    tables::metric(
        ui,
        "최대 평균 생중량",
        best.map_or_else(|| "-".to_string(), |b| format!("{:.2} g", b.mean_fresh_weight)),
    );
    plot::growth_by_ec(ui, &views.ec_growth, best);
    ui.add_space(8.0);
    ui.strong("학교별 생중량 분포");
    plot::growth_distribution(ui, &views.spread, &state.palette);

    let data = data.clone();
    egui::CollapsingHeader::new("생육 데이터 원본")
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            let joined = selected_rows(&data.growth, &state.selection)
                .and_then(|rows| join_records(&state.config.sites, rows));
            match joined {
                Ok(rows) => {
                    let extra = metric_columns(rows.iter().map(|r| r.record));
                    tables::growth_rows(ui, &rows, &extra);
                }
                Err(e) => {
                    ui.label(RichText::new(format!("Error: {e}")).color(Color32::RED));
                }
            }
            export_buttons(ui, state, ExportTable::Growth);
        });
}

fn export_buttons(ui: &mut Ui, state: &mut AppState, table: ExportTable) {
    ui.horizontal(|ui: &mut Ui| {
        for format in ExportFormat::ALL {
            if ui.button(format!("{} 다운로드", format.label())).clicked() {
                save_export_dialog(state, table, format);
            }
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_folder_dialog(state: &mut AppState) {
    let folder = rfd::FileDialog::new()
        .set_title("Open data folder")
        .set_directory(&state.config.data_dir)
        .pick_folder();

    if let Some(dir) = folder {
        log::info!("Switching data folder to {}", dir.display());
        state.set_data_dir(dir);
    }
}

pub fn save_export_dialog(state: &mut AppState, table: ExportTable, format: ExportFormat) {
    let file = rfd::FileDialog::new()
        .set_title("Export table")
        .set_file_name(table.file_name(format))
        .add_filter(format.label(), &[format.extension()])
        .save_file();

    let Some(path) = file else { return };
    let result = state
        .export(table, format)
        .and_then(|bytes| std::fs::write(&path, bytes).with_context(|| format!("writing {}", path.display())));

    match result {
        Ok(()) => {
            log::info!("Exported {table:?} table to {}", path.display());
            state.status_message = None;
        }
        Err(e) => {
            log::error!("Failed to export: {e:#}");
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}
