use chrono::{DateTime, NaiveDateTime};
use eframe::egui::{Color32, Stroke, Ui};
use egui_plot::{
    Bar, BarChart, BoxElem, BoxPlot, BoxSpread, GridMark, HLine, Legend, Line, LineStyle, Plot,
    PlotPoints,
};

use crate::color::SitePalette;
use crate::data::aggregate::{EcGrowth, GrowthSpread, SeriesPoint, SiteEnvMeans, SiteSeries};

const SMALL_PLOT_HEIGHT: f32 = 220.0;

/// Axis labels for categorical x positions 0, 1, 2, …
fn category_formatter(names: Vec<String>) -> impl Fn(GridMark, &std::ops::RangeInclusive<f64>) -> String {
    move |mark, _range| {
        if mark.value < 0.0 || mark.value.fract() != 0.0 {
            return String::new();
        }
        names.get(mark.value as usize).cloned().unwrap_or_default()
    }
}

fn seconds(time: NaiveDateTime) -> f64 {
    time.and_utc().timestamp() as f64
}

fn series_points(series: &SiteSeries, f: fn(&SeriesPoint) -> f64) -> PlotPoints {
    series
        .points
        .iter()
        .map(|p| [seconds(p.time), f(p)])
        .collect()
}

fn time_label(secs: f64) -> String {
    DateTime::from_timestamp(secs as i64, 0)
        .map(|dt| dt.format("%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Environment tab
// ---------------------------------------------------------------------------

/// 2×2 grid of per-site means: temperature, humidity, pH, EC.
pub fn environment_means(ui: &mut Ui, means: &[SiteEnvMeans], palette: &SitePalette) {
    let panels: [(&str, fn(&SiteEnvMeans) -> f64); 4] = [
        ("온도", |m| m.temperature),
        ("습도", |m| m.humidity),
        ("pH", |m| m.ph),
        ("EC 비교", |m| m.ec),
    ];
    let names: Vec<String> = means.iter().map(|m| m.site.to_string()).collect();

    for pair in panels.chunks(2) {
        ui.columns(2, |cols| {
            for (col, (title, value)) in cols.iter_mut().zip(pair) {
                col.strong(*title);
                let bars: Vec<Bar> = means
                    .iter()
                    .enumerate()
                    .map(|(i, m)| {
                        Bar::new(i as f64, value(m))
                            .name(m.site.as_str())
                            .fill(palette.color_for(&m.site))
                            .width(0.6)
                    })
                    .collect();

                Plot::new(format!("env_mean_{title}"))
                    .height(SMALL_PLOT_HEIGHT)
                    .x_axis_formatter(category_formatter(names.clone()))
                    .allow_drag(false)
                    .allow_scroll(false)
                    .show(col, |plot_ui| {
                        plot_ui.bar_chart(BarChart::new(bars).name(*title));
                    });
            }
        });
    }
}

/// Temperature, humidity and EC over time for one site, with a dashed line
/// at the target EC.
pub fn site_time_series(ui: &mut Ui, series: &SiteSeries) {
    Plot::new("site_time_series")
        .legend(Legend::default())
        .height(320.0)
        .x_axis_formatter(|mark, _range| time_label(mark.value))
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new(series_points(series, |p| p.temperature)).name("온도").width(1.5));
            plot_ui.line(Line::new(series_points(series, |p| p.humidity)).name("습도").width(1.5));
            plot_ui.line(Line::new(series_points(series, |p| p.ec)).name("EC").width(1.5));
            plot_ui.hline(
                HLine::new(series.target_ec)
                    .name(format!("목표 EC {:.1}", series.target_ec))
                    .color(Color32::RED)
                    .style(LineStyle::dashed_dense()),
            );
        });
}

// ---------------------------------------------------------------------------
// Growth tab
// ---------------------------------------------------------------------------

/// Mean fresh weight per target EC.
pub fn growth_by_ec(ui: &mut Ui, groups: &[EcGrowth], best: Option<&EcGrowth>) {
    let bars: Vec<Bar> = groups
        .iter()
        .map(|g| {
            let fill = if best.is_some_and(|b| b.ec == g.ec) {
                Color32::from_rgb(46, 160, 67)
            } else {
                Color32::LIGHT_BLUE
            };
            Bar::new(g.ec, g.mean_fresh_weight)
                .name(format!("EC {}", g.ec))
                .fill(fill)
                .width(0.6)
        })
        .collect();

    Plot::new("growth_by_ec")
        .height(260.0)
        .x_axis_label("EC")
        .y_axis_label("생중량(g)")
        .allow_drag(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).name("평균 생중량"));
        });
}

/// Fresh-weight distribution per site.
pub fn growth_distribution(ui: &mut Ui, spread: &[GrowthSpread], palette: &SitePalette) {
    let names: Vec<String> = spread.iter().map(|s| s.site.to_string()).collect();
    let boxes: Vec<BoxElem> = spread
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let color = palette.color_for(&s.site);
            BoxElem::new(i as f64, BoxSpread::new(s.min, s.q1, s.median, s.q3, s.max))
                .name(s.site.as_str())
                .fill(color.gamma_multiply(0.4))
                .stroke(Stroke::new(1.5, color))
                .box_width(0.5)
        })
        .collect();

    Plot::new("growth_distribution")
        .height(260.0)
        .x_axis_formatter(category_formatter(names))
        .y_axis_label("생중량(g)")
        .allow_drag(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.box_plot(BoxPlot::new(boxes).name("생중량 분포"));
        });
}
