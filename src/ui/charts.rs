use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use eframe::egui::{Color32, RichText, Ui};
use egui_plot::{
    uniform_grid_spacer, Bar, BarChart, GridMark, Legend, Line, Plot, PlotPoints, PlotUi, Points,
};

use crate::color::ColorMap;
use crate::dashboard::{CategoryPanel, Dashboard};
use crate::data::model::CategoryValue;
use crate::data::query::{join_values, MeanIncome, SummaryTable};
use crate::ui::pie;

const CHART_HEIGHT: f32 = 260.0;

// ---------------------------------------------------------------------------
// Series: one coloured trace per sex
// ---------------------------------------------------------------------------

struct Series {
    name: String,
    color: Color32,
    points: Vec<[f64; 2]>,
    /// Group size behind each point.
    customers: Vec<usize>,
}

/// Split a summary table into one series per sex. Rows whose key has no
/// x position are skipped.
fn series_by_sex<K>(
    table: &SummaryTable<MeanIncome<K>>,
    colors: &ColorMap,
    x_of: impl Fn(&K) -> Option<f64>,
) -> Vec<Series> {
    let mut by_sex: BTreeMap<&str, Series> = BTreeMap::new();
    for row in table {
        if let Some(x) = x_of(&row.key) {
            let series = by_sex.entry(row.sex.as_str()).or_insert_with(|| Series {
                name: row.sex.clone(),
                color: colors.color_for(&row.sex),
                points: Vec::new(),
                customers: Vec::new(),
            });
            series.points.push([x, row.mean_income]);
            series.customers.push(row.customers);
        }
    }
    by_sex.into_values().collect()
}

/// Distinct keys of a summary table, in row order.
fn axis_keys<K: PartialEq + Clone>(table: &SummaryTable<MeanIncome<K>>) -> Vec<K> {
    let mut keys: Vec<K> = Vec::new();
    for row in table {
        if !keys.contains(&row.key) {
            keys.push(row.key.clone());
        }
    }
    keys
}

/// Show a non-interactive plot. With `labels`, the x axis is categorical:
/// integer positions are labelled with the matching entry.
fn show_plot(
    ui: &mut Ui,
    id: &str,
    x_title: &str,
    y_title: &str,
    labels: Option<Vec<String>>,
    add: impl FnOnce(&mut PlotUi),
) {
    let mut plot = Plot::new(id)
        .legend(Legend::default())
        .height(CHART_HEIGHT)
        .x_axis_label(x_title)
        .y_axis_label(y_title)
        .allow_drag(false)
        .allow_scroll(false)
        .allow_zoom(false)
        .allow_boxed_zoom(false);

    if let Some(labels) = labels {
        plot = plot
            .x_grid_spacer(uniform_grid_spacer(|_| [1.0, 5.0, 10.0]))
            .x_axis_formatter(move |mark: GridMark, _range: &RangeInclusive<f64>| {
                let idx = mark.value.round();
                if (mark.value - idx).abs() > 1e-6 || idx < 0.0 {
                    return String::new();
                }
                labels.get(idx as usize).cloned().unwrap_or_default()
            });
    }

    plot.show(ui, add);
}

fn empty_notice(ui: &mut Ui, title: &str) {
    ui.strong(title);
    ui.label("No data for the current selection.");
}

// ---------------------------------------------------------------------------
// Chart kinds
// ---------------------------------------------------------------------------

/// Bars grouped side by side per x position, one colour per series.
fn grouped_bars(ui: &mut Ui, id: &str, x_title: &str, y_title: &str, labels: Vec<String>, series: &[Series]) {
    let n = series.len().max(1) as f64;
    let width = 0.8 / n;

    show_plot(ui, id, x_title, y_title, Some(labels), |plot_ui| {
        for (i, s) in series.iter().enumerate() {
            let offset = (i as f64 - (n - 1.0) / 2.0) * width;
            let bars: Vec<Bar> = s
                .points
                .iter()
                .zip(&s.customers)
                .map(|(&[x, y], n)| {
                    Bar::new(x + offset, y)
                        .width(width)
                        .name(format!("{} ({n} customers)", s.name))
                })
                .collect();
            plot_ui.bar_chart(BarChart::new(bars).color(s.color).name(&s.name));
        }
    });
}

fn lines(
    ui: &mut Ui,
    id: &str,
    x_title: &str,
    y_title: &str,
    labels: Option<Vec<String>>,
    series: Vec<Series>,
) {
    show_plot(ui, id, x_title, y_title, labels, |plot_ui| {
        for s in series {
            let points: PlotPoints = s.points.iter().copied().collect();
            plot_ui.line(Line::new(points).name(&s.name).color(s.color).width(2.0));
            plot_ui.points(Points::new(s.points).color(s.color).radius(3.0));
        }
    });
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// Mean income per reference date, bars grouped by sex.
pub fn income_by_date(ui: &mut Ui, dashboard: &Dashboard, colors: &ColorMap) {
    let title = "Mean income × reference date (by sex)";
    if dashboard.by_date.is_empty() {
        empty_notice(ui, title);
        return;
    }
    let dates = axis_keys(&dashboard.by_date);
    let series = series_by_sex(&dashboard.by_date, colors, |d| {
        dates.iter().position(|x| x == d).map(|i| i as f64)
    });
    let labels = dates.iter().map(|d| d.format("%Y-%m-%d").to_string()).collect();

    ui.strong(title);
    grouped_bars(ui, "income_by_date", "Date", "Mean income", labels, &series);
}

/// Mean income per age, one line per sex.
pub fn income_by_age(ui: &mut Ui, dashboard: &Dashboard, colors: &ColorMap) {
    let title = "Mean income × age (by sex)";
    if dashboard.by_age.is_empty() {
        empty_notice(ui, title);
        return;
    }
    let series = series_by_sex(&dashboard.by_age, colors, |age| Some(f64::from(*age)));

    ui.strong(title);
    lines(ui, "income_by_age", "Age", "Mean income", None, series);
}

/// Mean income per canonical category value, one line per sex.
pub fn income_by_category(ui: &mut Ui, panel: &CategoryPanel, colors: &ColorMap) {
    let title = format!("Mean income × {} (by sex)", panel.column.label().to_lowercase());
    let ordered = match &panel.means {
        Ok(ordered) => ordered,
        Err(e) => {
            ui.strong(&title);
            ui.label(RichText::new(e.to_string()).color(Color32::RED));
            return;
        }
    };
    let means = &ordered.table;
    if means.is_empty() {
        empty_notice(ui, &title);
        return;
    }

    // Canonical values that have at least one group, in canonical order.
    let keys: Vec<&CategoryValue> = panel
        .order
        .values()
        .iter()
        .filter(|v| means.iter().any(|m| &m.key == *v))
        .collect();
    let series = series_by_sex(means, colors, |v| keys.iter().position(|k| *k == v).map(|i| i as f64));
    let labels = keys.iter().map(|k| k.to_string()).collect();

    ui.strong(&title);
    let id = format!("income_by_{}", panel.column.name());
    lines(ui, &id, panel.column.label(), "Mean income", Some(labels), series);
    if !ordered.dropped.is_empty() {
        ui.label(
            RichText::new(format!("Not shown: {}", join_values(&ordered.dropped)))
                .small()
                .color(Color32::YELLOW),
        );
    }
}

/// Mean income per flag value (vehicle / property ownership), bars by sex.
pub fn income_by_flag(
    ui: &mut Ui,
    id: &str,
    label: &str,
    table: &SummaryTable<MeanIncome<CategoryValue>>,
    colors: &ColorMap,
) {
    let title = format!("Mean income × {} (by sex)", label.to_lowercase());
    if table.is_empty() {
        empty_notice(ui, &title);
        return;
    }
    let keys = axis_keys(table);
    let series = series_by_sex(table, colors, |v| keys.iter().position(|k| k == v).map(|i| i as f64));
    let labels = keys.iter().map(|k| k.to_string()).collect();

    ui.strong(&title);
    grouped_bars(ui, id, label, "Mean income", labels, &series);
}

/// Render the whole chart grid for one frame.
pub fn dashboard(ui: &mut Ui, dashboard: &Dashboard, sex_colors: &ColorMap) {
    ui.heading("Income distribution");
    income_by_date(ui, dashboard, sex_colors);
    ui.separator();
    income_by_age(ui, dashboard, sex_colors);
    ui.separator();

    // Line left / donut right, then swapped, alternating down the page.
    for (i, panel) in dashboard.categories.iter().enumerate() {
        ui.columns(2, |cols| {
            let (line_col, pie_col) = if i % 2 == 0 { (0, 1) } else { (1, 0) };
            income_by_category(&mut cols[line_col], panel, sex_colors);
            pie::donut(
                &mut cols[pie_col],
                &format!("{} distribution", panel.column.label()),
                &panel.distribution,
            );
        });
        ui.separator();
    }

    ui.columns(2, |cols| {
        income_by_flag(
            &mut cols[0],
            "income_by_vehicle",
            "Vehicle ownership",
            &dashboard.by_vehicle,
            sex_colors,
        );
        income_by_flag(
            &mut cols[1],
            "income_by_property",
            "Property ownership",
            &dashboard.by_property,
            sex_colors,
        );
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::fixtures::{date, four_customers};
    use crate::data::query::mean_income_by_date_and_sex;

    #[test]
    fn one_series_per_sex_with_group_sizes() {
        let table = mean_income_by_date_and_sex(&four_customers(), date(2021, 1, 1), date(2021, 2, 1));
        let dates = axis_keys(&table);
        let colors = ColorMap::new(["F", "M"]);
        let series = series_by_sex(&table, &colors, |d| {
            dates.iter().position(|x| x == d).map(|i| i as f64)
        });

        let names: Vec<&str> = series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["F", "M"]);
        assert_eq!(series[0].points, vec![[0.0, 2000.0], [1.0, 4000.0]]);
        assert_eq!(series[1].points, vec![[0.0, 1000.0], [1.0, 3000.0]]);
        assert_eq!(series[1].customers, vec![1, 1]);
        assert_eq!(series[0].color, colors.color_for("F"));
    }
}
