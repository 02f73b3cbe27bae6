//! Drift trajectory chart
//!
//! Visual sanity check of the shift estimation: the trajectory starts at
//! the reference image in (0, 0) and walks through the estimated
//! translations in series order.

use plotters::prelude::*;
use std::path::Path;

use crate::shift::Shift;

pub fn plot_shifts<P: AsRef<Path>>(shifts: &[Shift], path: P) {
    if shifts.is_empty() {
        return;
    }
    let points: Vec<(f64, f64)> = std::iter::once((0f64, 0f64))
        .chain(shifts.iter().map(|shift| (shift.dx, shift.dy)))
        .collect();
    let max_value = |x: &[f64]| x.iter().cloned().fold(std::f64::NEG_INFINITY, f64::max);
    let min_value = |x: &[f64]| x.iter().cloned().fold(std::f64::INFINITY, f64::min);
    let xs: Vec<f64> = points.iter().map(|point| point.0).collect();
    let ys: Vec<f64> = points.iter().map(|point| point.1).collect();
    let span = (max_value(&xs) - min_value(&xs)).max(max_value(&ys) - min_value(&ys));
    let margin = 1f64.max(0.05 * span);

    let plot = SVGBackend::new(path.as_ref(), (768, 512)).into_drawing_area();
    plot.fill(&WHITE).unwrap();
    let mut chart = ChartBuilder::on(&plot)
        .set_label_area_size(LabelAreaPosition::Left, 40)
        .set_label_area_size(LabelAreaPosition::Bottom, 40)
        .margin(10)
        .build_cartesian_2d(
            min_value(&xs) - margin..max_value(&xs) + margin,
            min_value(&ys) - margin..max_value(&ys) + margin,
        )
        .unwrap();
    chart
        .configure_mesh()
        .x_desc("Shift x [px]")
        .y_desc("Shift y [px]")
        .draw()
        .unwrap();

    chart
        .draw_series(LineSeries::new(points.iter().cloned(), &BLACK))
        .unwrap();
    let mut colors = colorous::TABLEAU10.iter().cycle();
    chart
        .draw_series(points.iter().map(|&(x, y)| {
            let color = colors.next().unwrap();
            Circle::new((x, y), 4, RGBColor(color.r, color.g, color.b).filled())
        }))
        .unwrap();
}
