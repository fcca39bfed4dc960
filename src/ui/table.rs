use eframe::egui::Ui;
use egui_extras::{Column, TableBuilder};

use crate::data::model::{CustomerTable, DISPLAY_COLUMNS};

/// Rows shown while the raw table is collapsed.
pub const PREVIEW_ROWS: usize = 5;

// ---------------------------------------------------------------------------
// Raw table view (internal id column hidden)
// ---------------------------------------------------------------------------

pub fn raw_table(ui: &mut Ui, table: &CustomerTable, expanded: bool) {
    let rows = if expanded {
        table.records()
    } else {
        table.head(PREVIEW_ROWS)
    };

    ui.push_id("raw_table", |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .max_scroll_height(400.0)
            .columns(Column::auto().at_least(60.0), DISPLAY_COLUMNS.len())
            .header(20.0, |mut header| {
                for name in DISPLAY_COLUMNS {
                    header.col(|ui: &mut Ui| {
                        ui.strong(name);
                    });
                }
            })
            .body(|body| {
                body.rows(18.0, rows.len(), |mut row| {
                    let record = &rows[row.index()];
                    for cell in record.display_cells() {
                        row.col(|ui: &mut Ui| {
                            ui.label(cell);
                        });
                    }
                });
            });
    });
}
