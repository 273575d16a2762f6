//! SVG figures for training and comparison runs
//!
//! Uses the SVG backend only, so no system fonts are needed.

use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::{Path, PathBuf};

use energy_rl_core::{RLError, Result};

use crate::compare::ComparisonReport;

const WIDTH: u32 = 1000;
const PANEL_HEIGHT: u32 = 260;

fn plot_err<E: std::fmt::Display>(e: E) -> RLError {
    RLError::Plot(e.to_string())
}

/// Axis range covering `values`, padded so flat lines stay visible
fn value_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo > hi {
        return (-1.0, 1.0);
    }
    let pad = if hi - lo > f64::EPSILON { (hi - lo) * 0.05 } else { 1.0 };
    (lo - pad, hi + pad)
}

fn panel_height(panels: usize) -> u32 {
    u32::try_from(panels.max(1)).unwrap_or(u32::MAX / PANEL_HEIGHT) * PANEL_HEIGHT
}

/// Draw labelled line series into one drawing area
fn draw_lines(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    title: &str,
    series: &[(&str, &[f64])],
) -> Result<()> {
    let len = series.iter().map(|(_, v)| v.len()).max().unwrap_or(0).max(2);
    let (lo, hi) = value_range(series.iter().flat_map(|(_, v)| v.iter().copied()));

    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 18))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(0..len - 1, lo..hi)
        .map_err(plot_err)?;

    chart.configure_mesh().x_desc("hour").draw().map_err(plot_err)?;

    for (i, (label, values)) in series.iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();
        chart
            .draw_series(LineSeries::new(
                values.iter().copied().enumerate(),
                color.stroke_width(2),
            ))
            .map_err(plot_err)?
            .label(*label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_err)?;
    Ok(())
}

/// One stacked panel per entry
fn render_panels(path: &Path, panels: &[(String, Vec<(&str, &[f64])>)]) -> Result<()> {
    let root = SVGBackend::new(path, (WIDTH, panel_height(panels.len()))).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let areas = root.split_evenly((panels.len().max(1), 1));
    for (area, (title, series)) in areas.iter().zip(panels) {
        draw_lines(area, title, series)?;
    }

    root.present().map_err(plot_err)?;
    Ok(())
}

/// Loss accumulated per training episode
pub fn render_loss_history(losses: &[f64], path: &Path) -> Result<()> {
    render_panels(path, &[("Training loss".to_string(), vec![("loss", losses)])])?;
    tracing::debug!(path = %path.display(), "wrote loss plot");
    Ok(())
}

/// Write every comparison figure into `dir`, returning the written paths
///
/// - `trajectories.svg`: trade and battery per strategy
/// - `actions.svg`: action index per strategy
/// - `exogenous.svg`: consumption, production and price
/// - `cumulative_cost.svg`: running cost of every strategy
/// - `q_values.svg`: Q-value of every action along the DQN run, if any
pub fn render_report(report: &ComparisonReport, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let battery: Vec<(String, Vec<f64>, Vec<f64>)> = report
        .runs
        .values()
        .map(|run| {
            let trade = run.steps.iter().map(|s| s.trade).collect();
            let level = run.steps.iter().map(|s| s.battery).collect();
            (run.strategy.to_string(), trade, level)
        })
        .collect();
    let panels: Vec<_> = battery
        .iter()
        .map(|(name, trade, level)| {
            (name.clone(), vec![("trade", trade.as_slice()), ("battery", level.as_slice())])
        })
        .collect();
    let path = dir.join("trajectories.svg");
    render_panels(&path, &panels)?;
    written.push(path);

    let actions: Vec<(String, Vec<f64>)> = report
        .runs
        .values()
        .map(|run| (run.strategy.to_string(), run.action_trace()))
        .collect();
    let panels: Vec<_> = actions
        .iter()
        .map(|(name, trace)| {
            (name.clone(), vec![("action (0 charge, 1 discharge, 2 trade)", trace.as_slice())])
        })
        .collect();
    let path = dir.join("actions.svg");
    render_panels(&path, &panels)?;
    written.push(path);

    let exo = &report.exogenous;
    let path = dir.join("exogenous.svg");
    render_panels(
        &path,
        &[
            (
                "Consumption and production".to_string(),
                vec![("consumption", exo.consumption.as_slice()), ("production", exo.production.as_slice())],
            ),
            ("Price".to_string(), vec![("price", exo.price.as_slice())]),
        ],
    )?;
    written.push(path);

    let cumulative: Vec<(String, Vec<f64>)> = report
        .runs
        .values()
        .map(|run| (run.strategy.to_string(), run.cumulative_cost()))
        .collect();
    let series: Vec<_> = cumulative.iter().map(|(name, c)| (name.as_str(), c.as_slice())).collect();
    let path = dir.join("cumulative_cost.svg");
    render_panels(&path, &[("Cost".to_string(), series)])?;
    written.push(path);

    if let Some(q_values) = &report.q_values {
        let names: Vec<String> = q_values.keys().map(ToString::to_string).collect();
        let series: Vec<_> = names
            .iter()
            .zip(q_values.values())
            .map(|(name, trace)| (name.as_str(), trace.as_slice()))
            .collect();
        let path = dir.join("q_values.svg");
        render_panels(&path, &[("Q-value".to_string(), series)])?;
        written.push(path);
    }

    tracing::info!(dir = %dir.display(), figures = written.len(), "wrote comparison plots");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::compare_strategies;
    use crate::strategy::HouseholdAgent;
    use energy_rl_agent::DqnConfig;
    use energy_rl_env::{HouseholdConfig, HouseholdEnv};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_value_range_pads_flat_series() {
        assert_eq!(value_range([2.0, 2.0].into_iter()), (1.0, 3.0));
        assert_eq!(value_range(std::iter::empty()), (-1.0, 1.0));
        let (lo, hi) = value_range([0.0, 10.0, f64::NAN].into_iter());
        assert!(lo < 0.0 && hi > 10.0 && hi.is_finite());
    }

    #[test]
    fn test_loss_plot_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("loss.svg");
        render_loss_history(&[5.0, 3.0, 2.5, 1.0], &path).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        assert!(svg.contains("<svg"));
    }

    #[test]
    fn test_report_figures_are_written() {
        let agent = HouseholdAgent::new(DqnConfig {
            seed: Some(2),
            ..DqnConfig::default()
        })
        .unwrap();
        let mut env = HouseholdEnv::new(HouseholdConfig {
            seed: Some(2),
            ..HouseholdConfig::default()
        })
        .unwrap();
        let report = compare_strategies(&mut env, 24, Some(&agent), &mut StdRng::seed_from_u64(2)).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let written = render_report(&report, dir.path()).unwrap();
        let names: Vec<_> = written
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_string))
            .collect();
        assert_eq!(
            names,
            vec!["trajectories.svg", "actions.svg", "exogenous.svg", "cumulative_cost.svg", "q_values.svg"]
        );
        assert!(written.iter().all(|p| p.exists()));
    }
}
