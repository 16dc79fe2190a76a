/*!
Invocation of, and result extraction from, the external bounded model
checker.

The checker itself (a NuSMV-family binary) is never bundled or
reimplemented here -- [`CheckerRunner`] only knows how to spawn it with
a bound and a translated model file, enforce a wall-clock timeout by
polling the child until it exits or the deadline passes, and hand the
captured stdout to [`parse_checker_output`].
*/

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use crate::error::CheckerError;
use crate::model::{AdministrativeAction, AnalysisResult};
use crate::symbols::{RuleId, Symbols};

/// Wraps the external model checker binary. `binary` is typically
/// `NuSMV` or a BMC-mode wrapper around it, located on `PATH` or given
/// as an absolute path via the CLI.
pub struct CheckerRunner {
    pub binary: String,
    pub timeout: Duration,
}

impl CheckerRunner {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        CheckerRunner { binary: binary.into(), timeout }
    }

    /// Run the checker against `model_path` with an optional BMC
    /// unrolling depth, returning its captured stdout, or
    /// [`CheckerError::Timeout`] if it does not finish within
    /// `self.timeout`. `bound = None` requests symbolic (unbounded)
    /// verification instead of bounded model checking. On timeout the
    /// child process is killed.
    pub fn run(&self, model_path: &Path, bound: Option<&str>) -> Result<String, CheckerError> {
        let mut command = Command::new(&self.binary);
        command.arg(model_path).stdout(Stdio::piped()).stderr(Stdio::null());
        if let Some(depth) = bound {
            command.arg("--bound").arg(depth);
        }
        let mut child = command.spawn().map_err(CheckerError::Spawn)?;

        match self.wait_with_timeout(&mut child) {
            Ok(true) => {}
            Ok(false) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(CheckerError::Timeout);
            }
            Err(e) => return Err(CheckerError::Spawn(e)),
        }

        let status = child.wait().map_err(CheckerError::Spawn)?;
        let mut stdout = String::new();
        if let Some(mut out) = child.stdout.take() {
            let _ = out.read_to_string(&mut stdout);
        }

        if !status.success() {
            #[cfg(unix)]
            {
                use std::os::unix::process::ExitStatusExt;
                if status.signal().is_some() {
                    return Err(CheckerError::KilledBySignal);
                }
            }
            return Err(CheckerError::NonZeroExit(status.code().unwrap_or(-1)));
        }

        Ok(stdout)
    }

    /// Poll the child at a short interval until it exits or the timeout
    /// elapses. `Command::wait` has no timeout of its own, so this is the
    /// only portable way to race a child process against a deadline
    /// without pulling in a signals crate.
    fn wait_with_timeout(&self, child: &mut Child) -> std::io::Result<bool> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if child.try_wait()?.is_some() {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            std::thread::sleep(Duration::from_millis(20));
        }
    }
}

/// Parse the checker's textual verdict into an [`AnalysisResult`].
///
/// The grammar recognized is intentionally small: a line starting with
/// `-- specification` followed by `is false`/`is true` signals a
/// reachable/unreachable verdict, and a reachable verdict is followed by
/// a counterexample trace of `admin=.. target=.. attr=.. value=..` lines
/// this function folds into [`AdministrativeAction`]s. Anything else is
/// [`CheckerError::UnparsableOutput`].
pub fn parse_checker_output(
    output: &str,
    symbols: &Symbols,
    rule_origin: &[RuleId],
) -> Result<AnalysisResult, CheckerError> {
    let mut reachable = None;
    for line in output.lines() {
        let line = line.trim();
        if line.starts_with("-- specification") {
            if line.ends_with("is false") {
                reachable = Some(true);
            } else if line.ends_with("is true") {
                reachable = Some(false);
            }
        }
    }

    match reachable {
        None => Err(CheckerError::UnparsableOutput(output.chars().take(200).collect())),
        Some(false) => Ok(AnalysisResult::Unreachable),
        Some(true) => {
            let (actions, rules) = parse_trace(output, symbols, rule_origin)?;
            Ok(AnalysisResult::Reachable { actions, rules })
        }
    }
}

fn parse_trace(
    output: &str,
    symbols: &Symbols,
    rule_origin: &[RuleId],
) -> Result<(Vec<AdministrativeAction>, Vec<RuleId>), CheckerError> {
    let mut actions = Vec::new();
    let mut rules = Vec::new();

    for line in output.lines() {
        let line = line.trim();
        let Some(rest) = line.strip_prefix("step:") else { continue };
        let mut admin = None;
        let mut target = None;
        let mut attr = None;
        let mut value = None;
        let mut rule_idx = None;

        for field in rest.split(',').map(str::trim) {
            let Some((key, val)) = field.split_once('=') else { continue };
            match key {
                "admin" => admin = val.parse::<usize>().ok(),
                "target" => target = val.parse::<usize>().ok(),
                "rule" => rule_idx = val.parse::<usize>().ok(),
                "attr" => attr = symbols.find_attr(val),
                "value" => {
                    if let Some(a) = attr {
                        value = symbols.find_value(a, val);
                    }
                }
                _ => {}
            }
        }

        match (admin, target, attr, value) {
            (Some(admin), Some(target), Some(attr), Some(value)) => {
                actions.push(AdministrativeAction { admin, target, attr, value });
            }
            _ => {
                return Err(CheckerError::UnparsableOutput(format!("malformed trace step: {line}")));
            }
        }
        if let Some(idx) = rule_idx {
            rules.push(rule_origin.get(idx).copied().unwrap_or(idx));
        }
    }

    Ok((actions, rules))
}
