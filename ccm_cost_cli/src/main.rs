use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use ccm_cost::{CostCategory, CostCurves, CostModel, CostParameters, CostReport, ProductionSweep};
use clap::{ArgAction, Parser, ValueHint};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod plot;

use plot::{render_chart_guard, Chart, ChartKind};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Catalyst-coated membrane production cost model",
    long_about = None
)]
struct Cli {
    /// Directory the charts are written to
    #[arg(short, long, default_value = ".", value_hint = ValueHint::DirPath)]
    out_dir: PathBuf,

    /// Also write SVG versions of the charts
    #[arg(long, action = ArgAction::SetTrue)]
    svg: bool,

    /// Write the cost curves as CSV (`-` for stdout)
    #[arg(long, value_hint = ValueHint::FilePath)]
    csv: Option<PathBuf>,

    /// Write a JSON summary of the run (`-` for stdout)
    #[arg(long, value_hint = ValueHint::FilePath)]
    json: Option<PathBuf>,

    /// Disable chart generation
    #[arg(long, action = ArgAction::SetTrue)]
    no_plot: bool,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    let csv_to_stdout = cli.csv.as_deref().is_some_and(is_stdout);
    let json_to_stdout = cli.json.as_deref().is_some_and(is_stdout);

    let t_compute = Instant::now();
    let model = CostModel::new(CostParameters::default()).context("invalid cost parameters")?;
    let sweep = ProductionSweep::default();
    let curves = model
        .evaluate(&sweep)
        .context("failed to evaluate cost curves")?;
    if cli.verbose {
        info!(
            "Compute stage: {:.1} ms ({} samples)",
            t_compute.elapsed().as_secs_f64() * 1000.0,
            curves.len()
        );
    }

    // Keep stdout clean for piped exports.
    if csv_to_stdout || json_to_stdout {
        eprint!("{}", model.cell().summary());
    } else {
        print!("{}", model.cell().summary());
    }
    log_cost_summary(&curves);

    if let Some(path) = cli.csv.as_ref() {
        if csv_to_stdout {
            write_curve_stdout(&curves)?;
        } else {
            write_curve_csv(&curves, path)?;
            info!("Wrote cost curve CSV: {}", path.display());
        }
    }

    if let Some(path) = cli.json.as_ref() {
        let report = CostReport::new(&model, &sweep, &curves);
        if json_to_stdout {
            write_report_to(&report, io::stdout().lock())?;
        } else {
            write_report(&report, path)?;
            info!("Wrote cost report: {}", path.display());
        }
    }

    if !cli.no_plot {
        fs::create_dir_all(&cli.out_dir)
            .with_context(|| format!("failed to create {}", cli.out_dir.display()))?;
        let t_plot = Instant::now();
        let mut kinds = vec![ChartKind::Png];
        if cli.svg {
            kinds.push(ChartKind::Svg);
        }
        for kind in kinds {
            for chart in Chart::ALL {
                let path = chart.path_in(&cli.out_dir, kind);
                match render_chart_guard(&curves, chart, &path, kind) {
                    Ok(()) => info!("Wrote plot: {}", path.display()),
                    Err(err) => warn!(
                        "Skipping {} render ({}): {}",
                        kind.extension(),
                        path.display(),
                        err
                    ),
                }
            }
        }
        if cli.verbose {
            info!(
                "Plot stage: {:.1} ms",
                t_plot.elapsed().as_secs_f64() * 1000.0
            );
        }
    }

    Ok(())
}

fn log_cost_summary(curves: &CostCurves) {
    let (Some(first), Some(last)) = (curves.row(0), curves.row(curves.len().saturating_sub(1)))
    else {
        return;
    };
    info!(
        "Total cost: {:.2} EUR/m2 at {:.0} units/year, {:.2} EUR/m2 at {:.0} units/year",
        first.total(),
        first.units_per_year,
        last.total(),
        last.units_per_year
    );
    info!(
        "Per kW: {:.2} EUR/kW down to {:.2} EUR/kW",
        first.total() * curves.stack_area_per_kw,
        last.total() * curves.stack_area_per_kw
    );
    for category in CostCategory::ALL {
        debug!(
            "{}: {:.2} -> {:.2} EUR/m2",
            category.label(),
            first.get(category),
            last.get(category)
        );
    }
    let max_lines = curves.lines.iter().copied().max().unwrap_or(0);
    if max_lines > 1 {
        info!("Coating lines needed at top volume: {}", max_lines);
    }
}

fn write_curve_stdout(curves: &CostCurves) -> Result<()> {
    let stdout = io::stdout();
    let handle = stdout.lock();
    let mut writer = csv::Writer::from_writer(handle);
    write_curve_rows(curves, &mut writer)
}

fn write_curve_csv(curves: &CostCurves, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);
    write_curve_rows(curves, &mut writer)
}

fn write_curve_rows<W: Write>(curves: &CostCurves, writer: &mut csv::Writer<W>) -> Result<()> {
    let mut header = vec!["units_per_year", "required_area_m2", "lines"];
    header.extend(CostCategory::ALL.iter().map(|c| c.key()));
    header.push("total");
    writer.write_record(&header)?;

    for row in curves.rows() {
        let mut record = vec![
            format!("{:.0}", row.units_per_year),
            format!("{:.3}", row.required_area_m2),
            row.lines.to_string(),
        ];
        record.extend(
            CostCategory::ALL
                .iter()
                .map(|c| format!("{:.4}", row.get(*c))),
        );
        record.push(format!("{:.4}", row.total()));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

fn is_stdout(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn write_report(report: &CostReport, path: &Path) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    write_report_to(report, file)
        .with_context(|| format!("failed to write {}", path.display()))
}

fn write_report_to<W: Write>(report: &CostReport, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, report)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
