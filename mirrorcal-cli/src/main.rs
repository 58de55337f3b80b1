use clap::{Parser, ValueEnum};
use mirrorcal::calibrate::DEFAULT_TRIAL_TOLERANCE;
use mirrorcal::io::save_histogram_png;
use mirrorcal::{
    calibrate_curve, run_surface_calibration, run_trials, BasinHoppingConfig, CalibrationConfig,
    CalibrationReport, GaussianSurface, ResponseCurve, ResponseSimulator, SearchConfig,
    SurfaceCalibrationConfig, SurfaceReport, TrialSummary,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

const PLOT_WIDTH: u32 = 800;
const PLOT_HEIGHT: u32 = 400;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// 1D histogram peak search.
    Scan,
    /// 2D basin-hopping over the Gaussian surface.
    Surface,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "MirrorCal CLI (mirror position calibration)")]
struct Cli {
    /// Calibration mode.
    #[arg(long, value_enum, default_value_t = Mode::Scan)]
    mode: Mode,
    /// Optional JSON configuration file overriding the defaults.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Seed for reproducible runs; overrides the config.
    #[arg(long)]
    seed: Option<u64>,
    /// Measured curve (JSON with `positions` and `responses`) to search
    /// instead of a simulated one.
    #[arg(long, value_name = "FILE", requires = "truth", conflicts_with = "trials")]
    curve: Option<PathBuf>,
    /// Reference peak position for a measured curve.
    #[arg(long, requires = "curve")]
    truth: Option<f64>,
    /// Run this many seeded trials and print their summary.
    #[arg(long)]
    trials: Option<usize>,
    /// Write the response histogram to this PNG file.
    #[arg(long, value_name = "FILE", conflicts_with = "trials")]
    plot: Option<PathBuf>,
    /// Print structured JSON instead of text.
    #[arg(long)]
    json: bool,
    /// Enable tracing output.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ScanConfigJson {
    mu: f64,
    sigma: f64,
    samples_per_bin: usize,
    num_bins: usize,
    iterations: usize,
    samples_per_iteration: usize,
    expand_min: f64,
    expand_max: f64,
    convergence_tol: Option<f64>,
}

impl Default for ScanConfigJson {
    fn default() -> Self {
        let cfg = CalibrationConfig::default();
        Self {
            mu: cfg.mu,
            sigma: cfg.sigma,
            samples_per_bin: cfg.samples_per_bin,
            num_bins: cfg.num_bins,
            iterations: cfg.search.iterations,
            samples_per_iteration: cfg.search.samples_per_iteration,
            expand_min: cfg.search.expand_min,
            expand_max: cfg.search.expand_max,
            convergence_tol: cfg.search.convergence_tol,
        }
    }
}

impl ScanConfigJson {
    fn search(&self) -> SearchConfig {
        SearchConfig {
            iterations: self.iterations,
            samples_per_iteration: self.samples_per_iteration,
            expand_min: self.expand_min,
            expand_max: self.expand_max,
            convergence_tol: self.convergence_tol,
        }
    }

    fn calibration(&self, seed: Option<u64>) -> CalibrationConfig {
        CalibrationConfig {
            mu: self.mu,
            sigma: self.sigma,
            samples_per_bin: self.samples_per_bin,
            num_bins: self.num_bins,
            search: self.search(),
            seed,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct SurfaceConfigJson {
    mu_x: f64,
    mu_y: f64,
    sigma_x: f64,
    sigma_y: f64,
    amplitude: f64,
    initial_guess: [f64; 2],
    iterations: usize,
    step_size: f64,
    temperature: f64,
    bounds: Option<[[f64; 2]; 2]>,
}

impl Default for SurfaceConfigJson {
    fn default() -> Self {
        let cfg = SurfaceCalibrationConfig::default();
        Self {
            mu_x: cfg.surface.mu_x,
            mu_y: cfg.surface.mu_y,
            sigma_x: cfg.surface.sigma_x,
            sigma_y: cfg.surface.sigma_y,
            amplitude: cfg.surface.amplitude,
            initial_guess: cfg.initial_guess,
            iterations: cfg.hopping.iterations,
            step_size: cfg.hopping.step_size,
            temperature: cfg.hopping.temperature,
            bounds: Some([[0.0, 1.0], [0.0, 1.0]]),
        }
    }
}

impl SurfaceConfigJson {
    fn calibration(&self, seed: Option<u64>) -> SurfaceCalibrationConfig {
        SurfaceCalibrationConfig {
            surface: GaussianSurface {
                mu_x: self.mu_x,
                mu_y: self.mu_y,
                sigma_x: self.sigma_x,
                sigma_y: self.sigma_y,
                amplitude: self.amplitude,
            },
            initial_guess: self.initial_guess,
            hopping: BasinHoppingConfig {
                iterations: self.iterations,
                step_size: self.step_size,
                temperature: self.temperature,
                bounds: self
                    .bounds
                    .map(|b| b.iter().map(|&[lo, hi]| (lo, hi)).collect()),
                seed,
                ..BasinHoppingConfig::default()
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Config {
    seed: Option<u64>,
    scan: ScanConfigJson,
    surface: SurfaceConfigJson,
}

#[derive(Debug, Deserialize)]
struct CurveFile {
    positions: Vec<f64>,
    responses: Vec<f64>,
}

#[derive(Debug, Serialize)]
struct ScanOutput {
    estimate: f64,
    truth: f64,
    relative_error_percent: f64,
    iterations: usize,
    termination: &'static str,
}

impl From<&CalibrationReport> for ScanOutput {
    fn from(report: &CalibrationReport) -> Self {
        Self {
            estimate: report.estimate,
            truth: report.truth,
            relative_error_percent: report.relative_error_percent,
            iterations: report.outcome.iterations,
            termination: report.outcome.termination.as_str(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SurfaceOutput {
    estimate: [f64; 2],
    truth: [f64; 2],
    abs_error: [f64; 2],
    value: f64,
    accepted: usize,
    local_failures: usize,
}

impl From<&SurfaceReport> for SurfaceOutput {
    fn from(report: &SurfaceReport) -> Self {
        Self {
            estimate: report.estimate,
            truth: report.truth,
            abs_error: report.abs_error,
            value: report.value,
            accepted: report.accepted,
            local_failures: report.local_failures,
        }
    }
}

#[derive(Debug, Serialize)]
struct TrialsOutput {
    trials: usize,
    mean_abs_error: f64,
    max_abs_error: f64,
    tolerance: f64,
    fraction_within: f64,
    runs: Vec<ScanOutput>,
}

impl From<&TrialSummary> for TrialsOutput {
    fn from(summary: &TrialSummary) -> Self {
        Self {
            trials: summary.len(),
            mean_abs_error: summary.mean_abs_error(),
            max_abs_error: summary.max_abs_error(),
            tolerance: DEFAULT_TRIAL_TOLERANCE,
            fraction_within: summary.fraction_within(DEFAULT_TRIAL_TOLERANCE),
            runs: summary.reports.iter().map(ScanOutput::from).collect(),
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<Config, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path)?;
            Ok(serde_json::from_str(&text)?)
        }
        None => Ok(Config::default()),
    }
}

fn load_curve(path: &PathBuf) -> Result<ResponseCurve, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    let file: CurveFile = serde_json::from_str(&text)?;
    Ok(ResponseCurve::new(file.positions, file.responses)?)
}

/// Rejects flags that only apply to the scan mode.
fn check_mode_flags(cli: &Cli) -> Result<(), &'static str> {
    if cli.mode == Mode::Surface
        && (cli.curve.is_some() || cli.plot.is_some() || cli.trials.is_some())
    {
        return Err("--curve, --plot and --trials require --mode scan");
    }
    Ok(())
}

fn trial_base_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(|| rand::rng().random())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_scan(cli: &Cli, config: &Config, seed: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    let scan = &config.scan;

    if let Some(trials) = cli.trials {
        let cfg = scan.calibration(seed);
        let summary = run_trials(&cfg, trials, trial_base_seed(seed))?;
        if cli.json {
            return print_json(&TrialsOutput::from(&summary));
        }
        println!("Trials: {}", summary.len());
        println!("Mean absolute error: {:.6}", summary.mean_abs_error());
        println!(
            "Within {DEFAULT_TRIAL_TOLERANCE}: {:.1}%",
            100.0 * summary.fraction_within(DEFAULT_TRIAL_TOLERANCE)
        );
        return Ok(());
    }

    let (curve, truth) = match (&cli.curve, cli.truth) {
        (Some(path), Some(truth)) => (load_curve(path)?, truth),
        (Some(_), None) => return Err("--curve requires --truth".into()),
        (None, _) => {
            let cfg = scan.calibration(seed);
            let simulator = ResponseSimulator::new(cfg.simulator())?;
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };
            (simulator.simulate(&mut rng)?, cfg.mu)
        }
    };
    tracing::info!(points = curve.len(), truth, "scan curve ready");

    if let Some(path) = &cli.plot {
        save_histogram_png(&curve, path, PLOT_WIDTH, PLOT_HEIGHT)?;
    }

    let report = calibrate_curve(&curve, truth, &scan.search())?;
    if cli.json {
        return print_json(&ScanOutput::from(&report));
    }
    println!("Estimated position: {:.6}", report.estimate);
    println!("True position: {:.6}", report.truth);
    println!("Error: {:.4}%", report.relative_error_percent);
    Ok(())
}

fn run_surface(cli: &Cli, config: &Config, seed: Option<u64>) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config.surface.calibration(seed);
    let report = run_surface_calibration(&cfg)?;
    if cli.json {
        return print_json(&SurfaceOutput::from(&report));
    }
    println!(
        "Estimated position: ({:.6}, {:.6})",
        report.estimate[0], report.estimate[1]
    );
    println!(
        "True position: ({:.6}, {:.6})",
        report.truth[0], report.truth[1]
    );
    println!(
        "Error: ({:.6}, {:.6})",
        report.abs_error[0], report.abs_error[1]
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("mirrorcal=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    check_mode_flags(&cli)?;
    let config = load_config(cli.config.as_ref())?;
    let seed = cli.seed.or(config.seed);

    match cli.mode {
        Mode::Scan => run_scan(&cli, &config, seed),
        Mode::Surface => run_surface(&cli, &config, seed),
    }
}

#[cfg(test)]
mod tests {
    use super::{check_mode_flags, trial_base_seed, Cli, Config, EXAMPLE_JSON};
    use clap::Parser;

    #[test]
    fn empty_config_keeps_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        let cfg = config.scan.calibration(None);
        assert_eq!(cfg, mirrorcal::CalibrationConfig::default());
        let surface = config.surface.calibration(None);
        assert_eq!(surface, mirrorcal::SurfaceCalibrationConfig::default());
    }

    #[test]
    fn partial_config_overrides_fields() {
        let config: Config =
            serde_json::from_str(r#"{"seed": 7, "scan": {"mu": 0.6, "iterations": 50}}"#).unwrap();
        assert_eq!(config.seed, Some(7));
        let cfg = config.scan.calibration(config.seed);
        assert_eq!(cfg.mu, 0.6);
        assert_eq!(cfg.search.iterations, 50);
        assert_eq!(cfg.sigma, 0.05);
        assert_eq!(cfg.seed, Some(7));
    }

    #[test]
    fn example_config_parses() {
        let config: Config = serde_json::from_str(EXAMPLE_JSON).unwrap();
        assert_eq!(config.surface.initial_guess, [0.2, 0.8]);
    }

    #[test]
    fn trials_conflict_with_curve_and_plot() {
        assert!(Cli::try_parse_from(["mirrorcal-cli", "--trials", "3", "--plot", "h.png"]).is_err());
        assert!(Cli::try_parse_from([
            "mirrorcal-cli",
            "--trials",
            "3",
            "--curve",
            "c.json",
            "--truth",
            "0.5"
        ])
        .is_err());
        assert!(Cli::try_parse_from(["mirrorcal-cli", "--trials", "3"]).is_ok());
    }

    #[test]
    fn surface_mode_rejects_scan_flags() {
        let cli = Cli::try_parse_from(["mirrorcal-cli", "--mode", "surface", "--plot", "h.png"]).unwrap();
        assert!(check_mode_flags(&cli).is_err());
        let cli = Cli::try_parse_from(["mirrorcal-cli", "--mode", "surface", "--trials", "2"]).unwrap();
        assert!(check_mode_flags(&cli).is_err());
        let cli = Cli::try_parse_from(["mirrorcal-cli", "--mode", "surface"]).unwrap();
        assert!(check_mode_flags(&cli).is_ok());
    }

    #[test]
    fn unseeded_trials_draw_fresh_base_seeds() {
        assert_eq!(trial_base_seed(Some(17)), 17);
        assert_ne!(trial_base_seed(None), trial_base_seed(None));
    }
}
