use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use odomcal_filters::FilterKind;
use odomcal_sim::{run_scenario, ScenarioConfig, ScenarioReport};

/// Runs a simulated differential-drive scenario through the odometry calibration
/// filters and prints a JSON report.
#[derive(Debug, Parser)]
#[command(author, version, about = "Differential-drive odometry calibration scenarios")]
struct Args {
    /// Optional path to a JSON ScenarioConfig. Defaults reproduce the demo run.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the simulated duration (s).
    #[arg(long)]
    duration: Option<f64>,

    /// Override the random seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Override the estimators to run, e.g. `ekf,iekf`.
    #[arg(long, value_delimiter = ',')]
    filters: Option<Vec<FilterKind>>,

    /// Write the report here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Include the per-step trace in the report.
    #[arg(long)]
    trace: bool,
}

fn load_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let data =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("failed to parse {}", path.display()))
}

fn scenario_from_args(args: &Args) -> Result<ScenarioConfig> {
    let mut config = match &args.config {
        Some(path) => load_json_file::<ScenarioConfig>(path)?,
        None => ScenarioConfig::default(),
    };
    if let Some(duration) = args.duration {
        config.duration = duration;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(filters) = &args.filters {
        config.filters = filters.clone();
    }
    config.trace |= args.trace;
    Ok(config)
}

fn write_report_json(report: &ScenarioReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

fn run_from_args(args: &Args) -> Result<String> {
    let config = scenario_from_args(args)?;
    let report = run_scenario(&config)?;
    write_report_json(&report)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = try_main() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let args = Args::parse();
    let json = run_from_args(&args)?;
    match &args.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
            info!("report written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn write_json<T: serde::Serialize>(value: &T, path: &Path) {
        serde_json::to_writer_pretty(fs::File::create(path).unwrap(), value).unwrap();
    }

    #[test]
    fn parses_filter_list() {
        let args =
            Args::try_parse_from(["odomcal", "--filters", "ekf,UKFM", "--seed", "4", "--trace"])
                .unwrap();
        assert_eq!(args.filters, Some(vec![FilterKind::Ekf, FilterKind::Ukfm]));
        let config = scenario_from_args(&args).unwrap();
        assert_eq!(config.seed, 4);
        assert!(config.trace);
        assert_eq!(config.filters.len(), 2);

        assert!(Args::try_parse_from(["odomcal", "--filters", "kf"]).is_err());
    }

    #[test]
    fn helper_smoke_test() {
        let config = ScenarioConfig {
            duration: 1.0,
            filters: vec![FilterKind::Ekf, FilterKind::Sekf],
            ..ScenarioConfig::default()
        };
        let config_file = NamedTempFile::new().unwrap();
        write_json(&config, config_file.path());

        let args = Args::try_parse_from([
            "odomcal",
            "--config",
            config_file.path().to_str().unwrap(),
            "--duration",
            "0.5",
        ])
        .unwrap();
        let json = run_from_args(&args).expect("cli helper should succeed");

        let report: ScenarioReport = serde_json::from_str(&json).unwrap();
        assert_eq!(report.steps, 50);
        assert_eq!(report.filters.len(), 2);
        assert!(report.trace.is_none());
        for f in &report.filters {
            assert!(
                f.track.position_rmse < 1.0,
                "{}: position RMSE {}",
                f.kind,
                f.track.position_rmse
            );
        }
    }

    #[test]
    fn reports_unreadable_config() {
        let args = Args::try_parse_from(["odomcal", "--config", "/nonexistent/odomcal.json"])
            .unwrap();
        let err = run_from_args(&args).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read"), "{err:#}");
    }
}
