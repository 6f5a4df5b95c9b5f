use std::fmt::Write as _;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use plotters::prelude::*;
use thiserror::Error;

use crate::scenario::{ProfitCurve, ScenarioReport, StrategyRecord};

/// Stream one JSON row per strategy record. Returns the number of rows
/// written.
pub fn write_jsonl(path: &Path, records: &[StrategyRecord]) -> Result<usize, ReportError> {
    ensure_parent(path.parent())?;

    let file = File::create(path).map_err(|source| ReportError::Io {
        context: "creating strategies jsonl",
        source,
    })?;
    let mut writer = BufWriter::new(file);

    for record in records {
        let row = serde_json::to_string(record)?;
        writeln!(writer, "{row}").map_err(|source| ReportError::Io {
            context: "writing strategies jsonl",
            source,
        })?;
    }

    writer.flush().map_err(|source| ReportError::Io {
        context: "flushing strategies jsonl",
        source,
    })?;

    Ok(records.len())
}

/// Render the Markdown summary: one comparison table across all
/// strategies, then the confusion counts per feasible strategy.
pub fn write_summary(path: &Path, report: &ScenarioReport) -> Result<(), ReportError> {
    ensure_parent(path.parent())?;

    let [name0, name1] = &report.group_names;
    let mut md = String::new();
    let _ = writeln!(md, "# Threshold strategies: run '{}'\n", report.run_id);
    let _ = writeln!(
        md,
        "| Strategy | Feasible | {name0} threshold | {name1} threshold | {name0} TPR | {name1} TPR | {name0} pos. rate | {name1} pos. rate | Total profit |"
    );
    let _ = writeln!(md, "|---|---|---|---|---|---|---|---|---|");

    for record in &report.records {
        if let (Some(total), [g0, g1]) = (record.total_profit, record.groups.as_slice()) {
            let _ = writeln!(
                md,
                "| {} | yes | {:.1} | {:.1} | {:.2} | {:.2} | {:.2} | {:.2} | {:.0} |",
                record.strategy,
                g0.threshold,
                g1.threshold,
                g0.tpr,
                g1.tpr,
                g0.positive_rate,
                g1.positive_rate,
                total,
            );
        } else {
            let _ = writeln!(
                md,
                "| {} | no | n/a | n/a | n/a | n/a | n/a | n/a | n/a |",
                record.strategy
            );
        }
    }

    let _ = writeln!(md, "\n## Confusion counts\n");
    let _ = writeln!(md, "| Strategy | Group | TP | FP | FN | TN |");
    let _ = writeln!(md, "|---|---|---|---|---|---|");
    for record in &report.records {
        for group in &record.groups {
            let c = group.confusion;
            let _ = writeln!(
                md,
                "| {} | {} | {} | {} | {} | {} |",
                record.strategy,
                group.name,
                c.true_positives,
                c.false_positives,
                c.false_negatives,
                c.true_negatives,
            );
        }
    }

    fs::write(path, md).map_err(|source| ReportError::Io {
        context: "writing summary markdown",
        source,
    })
}

/// Render the per-group profit-vs-threshold curves to a PNG under the
/// plots directory. Rendering problems (e.g. missing fonts) surface as
/// a `Plot` error the caller can downgrade to a warning.
pub fn render_profit_curves(dir: &Path, curves: &[ProfitCurve]) -> Result<PathBuf, ReportError> {
    if !dir.as_os_str().is_empty() {
        fs::create_dir_all(dir).map_err(|source| ReportError::Io {
            context: "creating plots directory",
            source,
        })?;
    }

    let output_path = dir.join("profit_curves.png");
    let curves_snapshot = curves.to_vec();

    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(|_| {}));

    let rendered_path = output_path.clone();
    let plot_attempt = std::panic::catch_unwind(move || {
        let root = BitMapBackend::new(&rendered_path, (800, 480)).into_drawing_area();
        root.fill(&WHITE)
            .map_err(|e| ReportError::Plot(e.to_string()))?;

        let mut x_min = f64::INFINITY;
        let mut x_max = f64::NEG_INFINITY;
        let mut y_min = 0.0f64;
        let mut y_max = 0.0f64;
        for curve in &curves_snapshot {
            for (threshold, profit) in &curve.points {
                x_min = x_min.min(*threshold);
                x_max = x_max.max(*threshold);
                y_min = y_min.min(*profit);
                y_max = y_max.max(*profit);
            }
        }
        let margin = ((y_max - y_min).abs() * 0.1).max(1.0);

        let mut chart = ChartBuilder::on(&root)
            .margin(20)
            .caption("Profit by decision threshold", ("sans-serif", 22))
            .set_label_area_size(LabelAreaPosition::Left, 60)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d(x_min..x_max, (y_min - margin)..(y_max + margin))
            .map_err(|e| ReportError::Plot(e.to_string()))?;

        chart
            .configure_mesh()
            .disable_mesh()
            .y_desc("Profit")
            .x_desc("Threshold")
            .draw()
            .map_err(|e| ReportError::Plot(e.to_string()))?;

        let palette = [&BLUE, &RED];
        for (index, curve) in curves_snapshot.iter().enumerate() {
            let color = palette[index % palette.len()];
            chart
                .draw_series(LineSeries::new(curve.points.iter().copied(), color))
                .map_err(|e| ReportError::Plot(e.to_string()))?
                .label(curve.name.clone())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], color));
        }

        chart
            .configure_series_labels()
            .border_style(BLACK)
            .background_style(WHITE.mix(0.8))
            .draw()
            .map_err(|e| ReportError::Plot(e.to_string()))?;

        drop(chart);

        root.present()
            .map_err(|e| ReportError::Plot(e.to_string()))?;

        drop(root);

        Ok(rendered_path)
    });

    std::panic::set_hook(prev_hook);

    match plot_attempt {
        Ok(result) => result,
        Err(_) => Err(ReportError::Plot(
            "plotters panicked while rendering (missing font support?)".into(),
        )),
    }
}

fn ensure_parent(parent: Option<&Path>) -> Result<(), ReportError> {
    if let Some(parent) = parent {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| ReportError::Io {
                context: "creating output directory",
                source,
            })?;
        }
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        source: std::io::Error,
    },
    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to render plot: {0}")]
    Plot(String),
}
