use std::f32::consts::{FRAC_PI_2, TAU};

use eframe::egui::{self, Color32, Pos2, Sense, Shape, Stroke, Ui, Vec2};

use crate::color::ColorMap;
use crate::data::query::{CategoryCount, SummaryTable};

// ---------------------------------------------------------------------------
// Donut chart (egui_plot has no pie, so paint it directly)
// ---------------------------------------------------------------------------

const OUTER_RADIUS: f32 = 90.0;
/// Inner radius as a fraction of the outer one.
const HOLE: f32 = 0.5;
/// Max angle covered by one painted segment.
const SEGMENT_ANGLE: f32 = 0.05;

/// One slice: `(start angle, end angle)` in radians, clockwise from 12 o'clock.
fn slice_angles(counts: &[usize]) -> Vec<(f32, f32)> {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return Vec::new();
    }
    let mut start = -FRAC_PI_2;
    counts
        .iter()
        .map(|&c| {
            let end = start + TAU * c as f32 / total as f32;
            let span = (start, end);
            start = end;
            span
        })
        .collect()
}

fn point_at(center: Pos2, radius: f32, angle: f32) -> Pos2 {
    center + Vec2::new(angle.cos(), angle.sin()) * radius
}

/// Annulus sector as convex quads.
fn sector_shapes(center: Pos2, (start, end): (f32, f32), color: Color32) -> Vec<Shape> {
    let inner = OUTER_RADIUS * HOLE;
    let steps = ((end - start) / SEGMENT_ANGLE).ceil().max(1.0) as usize;
    let step = (end - start) / steps as f32;
    (0..steps)
        .map(|i| {
            let a0 = start + step * i as f32;
            let a1 = a0 + step;
            Shape::convex_polygon(
                vec![
                    point_at(center, OUTER_RADIUS, a0),
                    point_at(center, OUTER_RADIUS, a1),
                    point_at(center, inner, a1),
                    point_at(center, inner, a0),
                ],
                color,
                Stroke::NONE,
            )
        })
        .collect()
}

/// Render a donut chart with a legend of counts and shares.
pub fn donut(ui: &mut Ui, title: &str, distribution: &SummaryTable<CategoryCount>) {
    ui.strong(title);
    if distribution.is_empty() {
        ui.label("No data.");
        return;
    }

    let labels: Vec<String> = distribution.iter().map(|c| c.value.to_string()).collect();
    let colors = ColorMap::new(labels.iter().cloned());
    let counts: Vec<usize> = distribution.iter().map(|c| c.count).collect();
    let total: usize = counts.iter().sum();

    ui.horizontal(|ui: &mut Ui| {
        let size = Vec2::splat(OUTER_RADIUS * 2.0 + 8.0);
        let (response, painter) = ui.allocate_painter(size, Sense::hover());
        let center = response.rect.center();

        for (label, span) in labels.iter().zip(slice_angles(&counts)) {
            painter.extend(sector_shapes(center, span, colors.color_for(label)));
        }

        ui.vertical(|ui: &mut Ui| {
            for (label, &count) in labels.iter().zip(&counts) {
                let share = 100.0 * count as f64 / total as f64;
                ui.horizontal(|ui: &mut Ui| {
                    let (swatch, _) = ui.allocate_exact_size(Vec2::splat(10.0), Sense::hover());
                    ui.painter().rect_filled(swatch, 2.0, colors.color_for(label));
                    ui.label(egui::RichText::new(format!("{label}  {count} ({share:.1}%)")).small());
                });
            }
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_cover_the_full_circle_in_order() {
        let spans = slice_angles(&[1, 1, 2]);
        assert_eq!(spans.len(), 3);
        assert!((spans[0].0 + FRAC_PI_2).abs() < 1e-6);
        assert!((spans[2].0 - spans[1].1).abs() < 1e-6);
        assert!((spans[2].1 - spans[0].0 - TAU).abs() < 1e-5);
        assert!((spans[2].1 - spans[2].0 - TAU / 2.0).abs() < 1e-5);
    }

    #[test]
    fn no_counts_no_slices() {
        assert!(slice_angles(&[]).is_empty());
        assert!(slice_angles(&[0, 0]).is_empty());
    }

    #[test]
    fn sectors_are_split_into_small_quads() {
        let shapes = sector_shapes(Pos2::ZERO, (0.0, 1.0), Color32::RED);
        assert_eq!(shapes.len(), (1.0 / SEGMENT_ANGLE).ceil() as usize);
    }
}
