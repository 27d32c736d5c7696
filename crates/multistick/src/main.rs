use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use comfy_table::Table;
use multistick_core::config::{MultistickConfig, CONFIG_ENV_VAR};
use multistick_core::dataset::{MultistickDataset, StickId, TEMPERATURE};
use multistick_core::frame::{attrs_json, to_dataframe};
use multistick_core::{multistick_calibration, read_multistick_data_with, DepthTolerance};
use polars::prelude::ParquetWriter;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Multistick temperature log reader", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read, assemble and calibrate multistick log files
    Read(ReadArgs),
    /// Print the deployed calibration table, or one offset
    Table(TableArgs),
}

#[derive(Args, Debug)]
struct ReadArgs {
    /// Glob pattern for log files, e.g. 'logs/multistick*.log'
    #[arg(short, long)]
    pattern: String,
    /// TOML configuration file (falls back to $MULTISTICK_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Skip calibration and keep raw temperatures
    #[arg(long)]
    raw: bool,
    /// Write the dataset as Parquet, with attributes in <OUTPUT>.attrs.json
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct TableArgs {
    /// Stick to look up; requires --depth
    #[arg(long, requires = "depth")]
    stick: Option<StickId>,
    /// Depth in metres, matched within the configured tolerance
    #[arg(long, requires = "stick")]
    depth: Option<f64>,
    /// TOML configuration file (falls back to $MULTISTICK_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Read(args) => run_read(args),
        Command::Table(args) => run_table(args),
    }
}

fn run_table(args: TableArgs) -> Result<()> {
    match (args.stick, args.depth) {
        (Some(stick), Some(depth)) => {
            let config = load_config(args.config.as_deref())?;
            let tolerance = config.calibration.options()?.depth_tolerance;
            println!("{:.8}", lookup_offset(stick, depth, &tolerance)?);
        }
        _ => println!("{}", calibration_table()),
    }
    Ok(())
}

fn lookup_offset(stick: StickId, depth: f64, tolerance: &DepthTolerance) -> Result<f64> {
    multistick_calibration()
        .offset_at(stick, depth, tolerance)
        .with_context(|| format!("no calibration offset for stick {stick} at {depth} m"))
}

fn load_config(path: Option<&Path>) -> Result<MultistickConfig> {
    let path = path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));
    match path {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration");
            MultistickConfig::load(&path)
                .with_context(|| format!("failed to load config {}", path.display()))
        }
        None => Ok(MultistickConfig::default()),
    }
}

fn run_read(args: ReadArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if args.raw {
        config.calibration.apply = false;
    }

    let ds = read_multistick_data_with(&args.pattern, &config, multistick_calibration())
        .with_context(|| format!("failed to read logs matching '{}'", args.pattern))?;

    let [sticks, depths, timestamps] = ds.shape();
    info!(sticks, depths, timestamps, "Dataset ready");
    println!("{}", summary_table(&ds));

    if let Some(output) = args.output {
        write_outputs(&ds, &output)?;
        info!(path = %output.display(), "Dataset written");
    }
    Ok(())
}

struct StickSummary {
    stick: StickId,
    readings: usize,
    missing: usize,
    mean: Option<f64>,
}

fn stick_summaries(ds: &MultistickDataset) -> Vec<StickSummary> {
    let coords = ds.coords();
    let temperatures = ds.get(TEMPERATURE).map(|variable| variable.values());

    coords
        .stick_num()
        .iter()
        .enumerate()
        .map(|(stick_idx, stick)| {
            let mut sum = 0.0;
            let mut readings = 0usize;
            let mut missing = 0usize;
            for z_idx in 0..coords.z().len() {
                for time_idx in 0..coords.datetime().len() {
                    let idx = coords.flat_index(stick_idx, z_idx, time_idx);
                    match temperatures.and_then(|values| values.get(idx)) {
                        Some(value) if !value.is_nan() => {
                            sum += value;
                            readings += 1;
                        }
                        _ => missing += 1,
                    }
                }
            }
            StickSummary {
                stick: *stick,
                readings,
                missing,
                mean: (readings > 0).then(|| sum / readings as f64),
            }
        })
        .collect()
}

fn summary_table(ds: &MultistickDataset) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["stick_num", "readings", "missing", "mean T_deg (degC)"]);
    for summary in stick_summaries(ds) {
        table.add_row(vec![
            summary.stick.to_string(),
            summary.readings.to_string(),
            summary.missing.to_string(),
            summary
                .mean
                .map_or_else(|| "-".to_string(), |mean| format!("{mean:.3}")),
        ]);
    }
    table
}

fn calibration_table() -> Table {
    let calibration = multistick_calibration();
    let mut header = vec!["stick_num".to_string()];
    header.extend(calibration.z().iter().map(|depth| format!("{depth:.2} m")));

    let mut table = Table::new();
    table.set_header(header);
    for (stick, offsets) in calibration.rows() {
        let mut row = vec![stick.to_string()];
        row.extend(offsets.iter().map(|offset| format!("{offset:.8}")));
        table.add_row(row);
    }
    table
}

fn write_outputs(ds: &MultistickDataset, output: &Path) -> Result<()> {
    let mut df = to_dataframe(ds).context("failed to build dataframe")?;
    let file = File::create(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    ParquetWriter::new(file)
        .finish(&mut df)
        .with_context(|| format!("failed to write {}", output.display()))?;

    let mut sidecar = output.as_os_str().to_owned();
    sidecar.push(".attrs.json");
    let sidecar = PathBuf::from(sidecar);
    let file = File::create(&sidecar)
        .with_context(|| format!("failed to create {}", sidecar.display()))?;
    serde_json::to_writer_pretty(file, &attrs_json(ds))?;
    Ok(())
}
