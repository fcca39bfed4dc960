use eframe::egui::{self, Color32, RichText, Ui};
use egui_extras::DatePickerButton;

use crate::data::filter::FilterState;
use crate::data::query::UnlistedPolicy;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    if state.dataset.is_none() {
        ui.label("No dataset loaded.");
        return;
    }

    // Edit a copy; `update_filters` clamps and stores it.
    let mut filters = state.filters.clone();

    ui.strong("Reference date");
    egui::Grid::new("date_range").num_columns(2).show(ui, |ui: &mut Ui| {
        ui.label("Start");
        ui.add(DatePickerButton::new(&mut filters.start_date).id_salt("start_date"));
        ui.end_row();
        ui.label("End");
        ui.add(DatePickerButton::new(&mut filters.end_date).id_salt("end_date"));
        ui.end_row();
    });
    if filters.dates_inverted() {
        ui.label(RichText::new("Start is after end: nothing selected.").color(Color32::YELLOW));
    }
    ui.separator();

    ui.strong("Age range");
    if let Some((min, max)) = state.bounds.ages {
        ui.add(egui::Slider::new(&mut filters.min_age, min..=max).text("from"));
        ui.add(egui::Slider::new(&mut filters.max_age, min..=max).text("to"));
        if filters.ages_inverted() {
            ui.label(RichText::new("Minimum is above maximum: nothing selected.").color(Color32::YELLOW));
        }
    } else {
        ui.label("No ages with income data.");
    }
    ui.separator();

    ui.strong("Categories outside the chart order");
    let policy_text = |p: UnlistedPolicy| match p {
        UnlistedPolicy::Drop => "Hide",
        UnlistedPolicy::Reject => "Report as error",
    };
    egui::ComboBox::from_id_salt("unlisted_policy")
        .selected_text(policy_text(filters.unlisted_policy))
        .show_ui(ui, |ui: &mut Ui| {
            for policy in [UnlistedPolicy::Drop, UnlistedPolicy::Reject] {
                ui.selectable_value(&mut filters.unlisted_policy, policy, policy_text(policy));
            }
        });
    ui.separator();

    if ui.button("Reset filters").clicked() {
        if let Some(ds) = &state.dataset {
            filters = FilterState::for_table(ds);
        }
    }

    state.update_filters(filters);
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(ds) = &state.dataset {
            ui.label(format!("{} customers loaded", ds.len()));
            if let Some((first, last)) = state.bounds.dates {
                ui.label(format!("collected {first} to {last}"));
            }
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open customer data")
        .add_filter("Supported files", &["csv", "parquet", "pq", "json"])
        .add_filter("CSV", &["csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"])
        .pick_file();

    if let Some(path) = file {
        // Failures are already logged and shown in the status line.
        let _ = state.load_from(&path);
    }
}
