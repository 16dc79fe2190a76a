/*!
The outer CEGAR loop: pre-check, slicing, then repeated abstraction and
model-checking until a final verdict is reached or the instance itself
(fully refined, no further abstraction possible) has been checked.
*/

use std::path::{Path, PathBuf};
use std::time::Duration;

use acoac_bigint::BigInt;
use log::{debug, info, warn};

use crate::abstraction::AbsRef;
use crate::bound::compute_bound;
use crate::checker::{parse_checker_output, CheckerRunner};
use crate::error::AcoacError;
use crate::format::{read_instance, write_aabac};
use crate::model::{AnalysisResult, Instance};
use crate::precheck::precheck;
use crate::slicer::{slice, user_clean};

#[derive(Clone, Debug)]
pub struct DriverConfig {
    pub checker_binary: String,
    pub checker_timeout: Duration,
    pub tight_level: u8,
    pub max_rounds: u32,
    /// Directory intermediate `.aabac` artifacts are written to, mirroring
    /// the slicing/abstraction-round files a verbose run leaves behind.
    /// `None` disables artifact output.
    pub work_dir: Option<PathBuf>,
    /// Run the pre-check stage before user-cleaning.
    pub enable_precheck: bool,
    /// Run the attribute/value reachability slicing pass. User-cleaning
    /// always runs regardless of this flag.
    pub enable_slicing: bool,
    /// Run CEGAR abstraction-refinement. When disabled the sliced instance
    /// is checked directly and its verdict is final.
    pub enable_absref: bool,
    /// Pass a computed depth to the checker as a BMC unrolling bound. When
    /// disabled the checker always runs in symbolic mode.
    pub bounded: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            checker_binary: "NuSMV".to_string(),
            checker_timeout: Duration::from_secs(600),
            tight_level: 2,
            max_rounds: 64,
            work_dir: None,
            enable_precheck: true,
            enable_slicing: true,
            enable_absref: true,
            bounded: true,
        }
    }
}

pub struct Driver {
    config: DriverConfig,
}

impl Driver {
    pub fn new(config: DriverConfig) -> Self {
        Driver { config }
    }

    /// Read, validate, and analyze a single input file, mirroring
    /// `verify()`: pre-check, user-cleaning, global slicing, then
    /// abstraction-refinement rounds each bounded and checked in turn.
    pub fn run_file(&self, path: &Path) -> Result<AnalysisResult, AcoacError> {
        let instance = read_instance(path)?;
        self.run(&instance)
    }

    pub fn run(&self, instance: &Instance) -> Result<AnalysisResult, AcoacError> {
        info!(
            "starting analysis: {} users, {} rules, {} query atoms",
            instance.user_count(),
            instance.rules.len(),
            instance.query.len()
        );

        if self.config.enable_precheck {
            let verdict = precheck(instance);
            if verdict.is_final() {
                info!("pre-check settled the query: {verdict:?}");
                return Ok(verdict);
            }
        }

        let cleaned = user_clean(instance);
        debug!("user-cleaning: {} -> {} users", instance.user_count(), cleaned.user_count());

        let sliced = if self.config.enable_slicing {
            let (sliced, slice_verdict) = slice(&cleaned);
            if let Some(verdict) = slice_verdict {
                info!("slicing settled the query: {verdict:?}");
                return Ok(verdict);
            }
            debug!("slicing: {} -> {} rules", cleaned.rules.len(), sliced.rules.len());
            self.write_artifact("slicingResult", &sliced);
            sliced
        } else {
            cleaned
        };

        if !self.config.enable_absref {
            return self.check_candidate_or_timeout(&sliced);
        }

        let mut absref = AbsRef::new(sliced.clone());
        let mut candidate = absref.abstract_instance();
        let mut round = 0u32;

        loop {
            round += 1;
            self.write_artifact(&format!("abstractionRefinementResult{round}"), &candidate);

            let local_unreachable = if self.config.enable_slicing {
                let (sliced_candidate, slice_verdict) = slice(&candidate);
                candidate = sliced_candidate;
                matches!(slice_verdict, Some(AnalysisResult::Unreachable))
            } else {
                false
            };

            let verdict = if local_unreachable {
                AnalysisResult::Unreachable
            } else {
                self.check_candidate_or_timeout(&candidate)?
            };

            match verdict {
                verdict @ AnalysisResult::Reachable { .. } => return Ok(verdict),
                AnalysisResult::Unreachable => {
                    if round >= self.config.max_rounds {
                        warn!("reached max_rounds ({}) without a definite verdict", self.config.max_rounds);
                        return Ok(AnalysisResult::Unknown);
                    }
                    match absref.refine() {
                        Some(next) => candidate = next,
                        None => return Ok(AnalysisResult::Unreachable),
                    }
                }
                other => return Ok(other),
            }
        }
    }

    /// Run [`Driver::check_candidate`], converting a checker timeout into
    /// an [`AnalysisResult::Timeout`] verdict instead of propagating it as
    /// an error -- a timeout is a reportable outcome (`TIMEOUT`, exit code
    /// 20), not a pipeline failure.
    fn check_candidate_or_timeout(&self, instance: &Instance) -> Result<AnalysisResult, AcoacError> {
        match self.check_candidate(instance) {
            Err(AcoacError::Checker(crate::error::CheckerError::Timeout)) => Ok(AnalysisResult::Timeout),
            other => other,
        }
    }

    /// Compute a bound, pass it to the checker as the BMC unrolling depth,
    /// and parse the verdict. If the bound exceeds what a BMC depth
    /// argument can represent, the checker is run at `i64::MAX` instead; an
    /// `Unreachable` verdict from that clamped run is unsound (the real
    /// bound was larger), so it is re-run once in symbolic mode before the
    /// verdict is trusted.
    fn check_candidate(&self, instance: &Instance) -> Result<AnalysisResult, AcoacError> {
        let model_path = self.materialize_model(instance)?;
        let runner = CheckerRunner::new(self.config.checker_binary.clone(), self.config.checker_timeout);

        if !self.config.bounded {
            debug!("checking candidate with {} rules, symbolic mode", instance.rules.len());
            let output = runner.run(&model_path, None)?;
            return parse_checker_output(&output, &instance.symbols, &instance.rule_origin).map_err(AcoacError::from);
        }

        let bound = compute_bound(instance, self.config.tight_level);
        debug!("checking candidate with {} rules, bound {bound}", instance.rules.len());

        let int_max = BigInt::from_i64(i64::MAX);
        let (depth_arg, clamped) = if bound > int_max {
            warn!("bound {bound} exceeds the representable BMC depth, clamping to i64::MAX");
            (i64::MAX.to_string(), true)
        } else {
            (bound.to_dec_string(), false)
        };

        let output = runner.run(&model_path, Some(&depth_arg))?;
        let verdict = parse_checker_output(&output, &instance.symbols, &instance.rule_origin)?;

        if clamped && matches!(verdict, AnalysisResult::Unreachable) {
            warn!("clamped-bound run reported unreachable; retrying in symbolic mode");
            let symbolic_output = runner.run(&model_path, None)?;
            return parse_checker_output(&symbolic_output, &instance.symbols, &instance.rule_origin)
                .map_err(AcoacError::from);
        }

        Ok(verdict)
    }

    fn materialize_model(&self, instance: &Instance) -> Result<PathBuf, AcoacError> {
        let dir = self.config.work_dir.clone().unwrap_or_else(std::env::temp_dir);
        std::fs::create_dir_all(&dir).map_err(crate::error::InputError::Io)?;
        let path = dir.join("candidate.aabac");
        std::fs::write(&path, write_aabac(instance)).map_err(crate::error::InputError::Io)?;
        Ok(path)
    }

    fn write_artifact(&self, name: &str, instance: &Instance) {
        let Some(dir) = &self.config.work_dir else { return };
        if std::fs::create_dir_all(dir).is_err() {
            return;
        }
        let path = dir.join(format!("{name}.aabac"));
        let _ = std::fs::write(path, write_aabac(instance));
    }
}

/// Average tightness (see [`crate::bound::tightness_for_dir`]) across
/// every `.aabac` file in `dir`, at both `tight_level`s.
pub fn compute_tightness_for_dir(dir: &Path, extra_precision: u32) -> Result<(String, u32), AcoacError> {
    let mut pairs = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(crate::error::InputError::Io)? {
        let entry = entry.map_err(crate::error::InputError::Io)?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("aabac") {
            continue;
        }
        let instance = read_instance(&path)?;
        let loose = compute_bound(&instance, 1);
        let tight = compute_bound(&instance, 2);
        pairs.push((loose, tight));
    }
    Ok(crate::bound::tightness_for_dir(pairs.into_iter(), extra_precision))
}
