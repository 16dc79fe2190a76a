mod args;

use std::io::Write;

use clap::Parser;

use acoac_core::bound::compute_bound;
use acoac_core::format::read_instance;
use acoac_core::model::AnalysisResult;
use acoac_core::{compute_tightness_for_dir, Driver};
use args::Args;

/// Decimal digits of extra precision carried through the tightness
/// average; matches the margin `coachecker`'s tightness script uses when
/// comparing bounds that can differ by many orders of magnitude.
const TIGHTNESS_EXTRA_PRECISION: u32 = 10;

fn main() {
    env_logger::init();

    let args = Args::parse();

    if args.compute_tightness {
        run_compute_tightness(&args);
        return;
    }

    let driver = Driver::new(args.driver_config());

    match driver.run_file(&args.input_file) {
        Ok(result) => report(&args, &result),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    }
}

fn run_compute_tightness(args: &Args) {
    let result = if args.input_file.is_dir() {
        compute_tightness_for_dir(&args.input_file, TIGHTNESS_EXTRA_PRECISION)
    } else {
        read_instance(&args.input_file).map(|instance| {
            let loose = compute_bound(&instance, 1);
            let tight = compute_bound(&instance, 2);
            acoac_core::bound::tightness_for_dir(std::iter::once((loose, tight)), TIGHTNESS_EXTRA_PRECISION)
        })
    };

    match result {
        Ok((quotient, k)) => {
            let csv = format!("tightness,k\n{quotient},{k}\n");
            match &args.output {
                Some(path) => {
                    if let Err(e) = std::fs::write(path, &csv) {
                        eprintln!("error: failed to write {}: {e}", path.display());
                        std::process::exit(2);
                    }
                }
                None => {
                    let _ = std::io::stdout().write_all(csv.as_bytes());
                }
            }
        }
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(2);
        }
    }
}

fn report(args: &Args, result: &AnalysisResult) {
    if args.json {
        print_json(args, result);
    } else {
        print_human(args, result);
    }

    std::process::exit(match result {
        AnalysisResult::Unreachable => 0,
        AnalysisResult::Reachable { .. } => 10,
        AnalysisResult::Unknown | AnalysisResult::Timeout => 20,
        AnalysisResult::Error(_) => 2,
    });
}

fn print_human(args: &Args, result: &AnalysisResult) {
    match result {
        AnalysisResult::Unreachable => println!("UNREACHABLE"),
        AnalysisResult::Reachable { actions, rules } => {
            println!("REACHABLE");
            if args.show_actions {
                for (i, action) in actions.iter().enumerate() {
                    let rule = rules.get(i);
                    match (args.no_rules, rule) {
                        (false, Some(rule)) => println!(
                            "  admin={} target={} attr={} value={} (rule {})",
                            action.admin, action.target, action.attr, action.value, rule
                        ),
                        _ => println!(
                            "  admin={} target={} attr={} value={}",
                            action.admin, action.target, action.attr, action.value
                        ),
                    }
                }
            }
        }
        AnalysisResult::Timeout => println!("TIMEOUT"),
        AnalysisResult::Unknown => println!("UNKNOWN"),
        AnalysisResult::Error(message) => println!("ERROR: {message}"),
    }
}

fn print_json(args: &Args, result: &AnalysisResult) {
    let mut value = match serde_json::to_value(result) {
        Ok(value) => value,
        Err(e) => {
            eprintln!("error: failed to serialize result: {e}");
            return;
        }
    };
    if args.no_rules {
        if let Some(variant) = value.as_object_mut().and_then(|o| o.get_mut("Reachable")) {
            if let Some(variant) = variant.as_object_mut() {
                variant.remove("rules");
            }
        }
    }
    println!("{value}");
}
