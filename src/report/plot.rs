//! Coefficient plot: point estimate and 95% interval per model.

use super::canvas::{Canvas, Color, LineStyle, TextAnchor, TextStyle};
use crate::analyser::logic::EffectEstimate;
use crate::utils::fmt_num;

const ROW_H: f64 = 34.0;
const FIG_W: f64 = 640.0;
const TOP: f64 = 40.0;
const BOTTOM: f64 = 50.0;

const POINT: Color = Color::rgb(31, 119, 180);
const GRID: Color = Color::rgb(200, 200, 200);
const ZERO: Color = Color::rgb(120, 120, 120);

/// Renders estimates with intervals as an SVG forest plot.
///
/// Models are drawn top to bottom in ascending order of point estimate.
/// Estimates without an interval are skipped.
pub fn render_coefficient_plot(estimates: &[&EffectEstimate], precision: usize) -> String {
    let mut rows: Vec<(&EffectEstimate, f64, f64)> = estimates
        .iter()
        .filter_map(|e| e.conf_int().map(|(lo, hi)| (*e, lo, hi)))
        .collect();
    rows.sort_by(|a, b| a.0.estimate.total_cmp(&b.0.estimate));

    let n = rows.len().max(1);
    let fig_h = TOP + ROW_H * n as f64 + BOTTOM;
    let mut canvas = Canvas::new(FIG_W, fig_h);
    canvas.rect(0.0, 0.0, FIG_W, fig_h, Color::WHITE);

    let title = TextStyle {
        size: 13.0,
        bold: true,
        ..Default::default()
    };
    canvas.text(FIG_W / 2.0, 22.0, "Estimated treatment effect (95% CI)", &TextStyle {
        anchor: TextAnchor::Middle,
        ..title
    });

    if rows.is_empty() {
        canvas.text(FIG_W / 2.0, TOP + ROW_H / 2.0, "No estimates to plot", &TextStyle {
            anchor: TextAnchor::Middle,
            ..Default::default()
        });
        return canvas.to_svg();
    }

    let label_style = TextStyle {
        anchor: TextAnchor::End,
        ..Default::default()
    };
    let label_w = rows
        .iter()
        .map(|(e, _, _)| canvas.measure_text(e.label(), &label_style))
        .fold(0.0_f64, f64::max);
    let left = label_w + 20.0;
    let right = FIG_W - 20.0;
    let bottom = TOP + ROW_H * rows.len() as f64;

    // Axis range always includes zero so the reference line is visible.
    let mut lo = rows.iter().map(|r| r.1).fold(0.0_f64, f64::min);
    let mut hi = rows.iter().map(|r| r.2).fold(0.0_f64, f64::max);
    if hi - lo <= f64::EPSILON {
        lo -= 1.0;
        hi += 1.0;
    }
    let pad = (hi - lo) * 0.05;
    let (lo, hi) = (lo - pad, hi + pad);
    let to_px = |v: f64| left + (v - lo) / (hi - lo) * (right - left);

    let axis = LineStyle::solid(Color::BLACK, 0.8);
    canvas.line(left, bottom, right, bottom, &axis);

    let tick_style = TextStyle {
        size: 9.0,
        anchor: TextAnchor::Middle,
        ..Default::default()
    };
    for k in 0..=4 {
        let v = lo + (hi - lo) * f64::from(k) / 4.0;
        let x = to_px(v);
        canvas.line(x, TOP, x, bottom, &LineStyle::solid(GRID, 0.4));
        canvas.line(x, bottom, x, bottom + 4.0, &axis);
        canvas.text(x, bottom + 16.0, &fmt_num(v, precision), &tick_style);
    }
    canvas.text(
        (left + right) / 2.0,
        bottom + 36.0,
        "Coefficient on treatment",
        &TextStyle {
            anchor: TextAnchor::Middle,
            ..Default::default()
        },
    );

    let zero_x = to_px(0.0);
    canvas.line(zero_x, TOP, zero_x, bottom, &LineStyle::dashed(ZERO, 0.8));

    let whisker = LineStyle::solid(POINT, 1.6);
    for (i, (est, ci_lo, ci_hi)) in rows.iter().enumerate() {
        let y = TOP + (i as f64 + 0.5) * ROW_H;
        canvas.text(left - 10.0, y + 4.0, est.label(), &label_style);
        canvas.line(to_px(*ci_lo), y, to_px(*ci_hi), y, &whisker);
        canvas.line(to_px(*ci_lo), y - 5.0, to_px(*ci_lo), y + 5.0, &whisker);
        canvas.line(to_px(*ci_hi), y - 5.0, to_px(*ci_hi), y + 5.0, &whisker);
        canvas.circle(to_px(est.estimate), y, 4.0, POINT);
    }

    canvas.to_svg()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyser::logic::EstimateKind;

    fn estimate(model: EstimateKind, estimate: f64, se: f64) -> EffectEstimate {
        EffectEstimate {
            model,
            estimate,
            std_error: Some(se),
            t_stat: Some(estimate / se),
            p_value: None,
            conf_low: Some(estimate - 1.96 * se),
            conf_high: Some(estimate + 1.96 * se),
            n_obs: 100,
            dof: Some(98),
        }
    }

    #[test]
    fn test_models_ordered_by_estimate() {
        let a = estimate(EstimateKind::OlsAdjustedRobust, 0.30, 0.05);
        let b = estimate(EstimateKind::OlsClassical, 0.10, 0.05);
        let svg = render_coefficient_plot(&[&a, &b], 3);

        let pos_low = svg.find(EstimateKind::OlsClassical.as_str()).expect("label drawn");
        let pos_high = svg
            .find(EstimateKind::OlsAdjustedRobust.as_str())
            .expect("label drawn");
        assert!(pos_low < pos_high, "lower estimate should be drawn first");
        assert_eq!(svg.matches("<circle").count(), 2);
    }

    #[test]
    fn test_skips_estimates_without_interval() {
        let dim = EffectEstimate::descriptive(EstimateKind::DifferenceInMeans, 0.2, 10);
        let svg = render_coefficient_plot(&[&dim], 3);
        assert!(svg.contains("No estimates to plot"));
        assert_eq!(svg.matches("<circle").count(), 0);
    }
}
