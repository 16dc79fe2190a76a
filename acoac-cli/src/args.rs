use std::path::PathBuf;
use std::time::Duration;

use acoac_core::driver::DriverConfig;
use clap::Parser;

/// Decide whether an attribute-based administrative access control
/// policy can reach a given query state.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// The `.aabac`/`.arbac`/`.mohawk` instance file to analyze, or (with
    /// `--compute-tightness`) a single instance file or a directory of them
    #[arg(short, long)]
    pub input_file: PathBuf,

    /// Path to the external bounded model checker binary; not required
    /// when `--compute-tightness` is given
    #[arg(short = 'm', long = "model-checker", default_value = "NuSMV")]
    pub model_checker: String,

    /// Directory for intermediate artifacts: `slicingResult.aabac`,
    /// `abstractionRefinementResult<round>.aabac`
    #[arg(short = 'l', long = "log-dir")]
    pub log_dir: Option<PathBuf>,

    /// Skip the pre-check stage
    #[arg(short = 'p', long = "no-precheck", default_value_t = false)]
    pub no_precheck: bool,

    /// Skip the attribute/value reachability slicing pass (user-cleaning
    /// still always runs)
    #[arg(short = 's', long = "no-slicing", default_value_t = false)]
    pub no_slicing: bool,

    /// Skip abstraction-refinement and check the sliced instance directly
    #[arg(short = 'a', long = "no-absref", default_value_t = false)]
    pub no_absref: bool,

    /// Disable bounded mode: always invoke the checker symbolically
    #[arg(short = 'n', long = "smc", default_value_t = false)]
    pub smc: bool,

    /// Bound tightness: 1 for the loose bound, 2 for the domain-aware
    /// tight bound
    #[arg(short = 'b', long = "tl", default_value_t = 2, value_parser = clap::value_parser!(u8).range(1..=2))]
    pub tight_level: u8,

    /// Omit rule indices from the printed result
    #[arg(short = 'r', long = "no-rules", default_value_t = false)]
    pub no_rules: bool,

    /// Per-candidate checker time budget, in seconds; must be greater than 0
    #[arg(short = 't', long = "timeout", default_value_t = 60)]
    pub timeout_secs: u64,

    /// Skip verification entirely; compute and print bound tightness for
    /// `--input-file` (a single `.aabac` file or a directory of them)
    #[arg(short = 'c', long = "compute-tightness", default_value_t = false)]
    pub compute_tightness: bool,

    /// CSV output path for `--compute-tightness` mode; stdout if omitted
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Maximum number of abstraction-refinement rounds before giving up
    #[arg(long = "max-rounds", default_value_t = 64)]
    pub max_rounds: u32,

    /// Print the administrative action trail on a reachable verdict
    #[arg(long = "show-actions", default_value_t = false)]
    pub show_actions: bool,

    /// Emit the verdict as JSON instead of the human-readable token
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

impl Args {
    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            checker_binary: self.model_checker.clone(),
            checker_timeout: Duration::from_secs(self.timeout_secs.max(1)),
            tight_level: self.tight_level,
            max_rounds: self.max_rounds,
            work_dir: self.log_dir.clone(),
            enable_precheck: !self.no_precheck,
            enable_slicing: !self.no_slicing,
            enable_absref: !self.no_absref,
            bounded: !self.smc,
        }
    }
}
