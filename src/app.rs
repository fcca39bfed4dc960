use eframe::egui::{self, ScrollArea, Ui};

use crate::dashboard::Dashboard;
use crate::state::AppState;
use crate::ui::{charts, panels, table};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct IncomeExplorerApp {
    pub state: AppState,
}

impl IncomeExplorerApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for IncomeExplorerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: charts + raw table ----
        egui::CentralPanel::default().show(ctx, |ui| {
            ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui: &mut Ui| central_panel(ui, &mut self.state));
        });
    }
}

fn central_panel(ui: &mut Ui, state: &mut AppState) {
    let Some(dataset) = &state.dataset else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a file to explore customers  (File → Open…)");
        });
        return;
    };

    ui.heading("Customer base of a bank");
    ui.label("Income broken down by the main customer attributes.");
    ui.separator();

    // Full recomputation every frame, from the raw table and current filters.
    let dashboard = Dashboard::compute(dataset, &state.filters);
    charts::dashboard(ui, &dashboard, &state.sex_colors);
    ui.separator();

    let mut expand = state.filters.expand_raw_table;
    egui::CollapsingHeader::new("Show dataset")
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            ui.checkbox(&mut expand, "Expand");
            table::raw_table(ui, dataset, expand);
        });

    if expand != state.filters.expand_raw_table {
        state.filters.expand_raw_table = expand;
    }
}
