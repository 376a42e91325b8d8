//! `multi`: a shell-level parallel map dispatcher.
//!
//! Reads a delimited record stream on stdin, fans it out to N worker shell
//! commands, and merges their output back onto stdout. This binary owns
//! `argv` parsing and the process exit code; the actual dataflow engine
//! lives in `multi-core` and never touches `std::env::args`.

// dependencies
use std::env;
use std::process::ExitCode;

use multi_core::{EngineError, Options};

// constants
const TOOL_NAME: &str = "multi";

const USAGE: &str = "\
usage: multi -m <cmd> [-n <N>] [-s <splitter-cmd>] [-c <combiner-cmd>] [-S] [-h]

  -m <cmd>           mapper shell command template (required)
  -n <N>             number of mappers (positive integer; default 1)
  -s <cmd>           splitter shell command template; {} expands to the
                     space-joined list of mapper input FIFOs
  -c <cmd>           combiner shell command template; {} expands to the
                     space-joined list of mapper output FIFOs
  -S                 sequential (order-preserving) mode; disables -s/-c
  -h                 print this help and exit";

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();

    let parsed = match parse_args(&args) {
        Ok(ParsedArgs::Help) => {
            eprintln!("{USAGE}");
            return ExitCode::FAILURE;
        }
        Ok(ParsedArgs::Run(parsed)) => parsed,
        Err(msg) => {
            eprintln!("{TOOL_NAME}: {msg}");
            eprintln!("{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    let options = match Options::new(
        parsed.num_mapper,
        parsed.sequential,
        parsed.mapper_cmd,
        parsed.splitter_cmd,
        parsed.combiner_cmd,
    ) {
        Ok(options) => options,
        Err(EngineError::Configuration(msg)) => {
            eprintln!("{TOOL_NAME}: {msg}");
            eprintln!("{USAGE}");
            return ExitCode::FAILURE;
        }
        Err(e) => {
            eprintln!("{TOOL_NAME}: {e}");
            return ExitCode::FAILURE;
        }
    };

    match multi_core::run(options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{TOOL_NAME}: {e}");
            ExitCode::FAILURE
        }
    }
}

/// The result of a successful `argv` parse: either a request for help, or
/// the raw (not-yet-validated) pieces of an `Options` value.
enum ParsedArgs {
    Help,
    Run(RawOptions),
}

struct RawOptions {
    num_mapper: i64,
    sequential: bool,
    mapper_cmd: Option<String>,
    splitter_cmd: Option<String>,
    combiner_cmd: Option<String>,
}

/// Hand-rolled `argv` walk recognizing `-m`, `-n`, `-s`, `-c`, `-S`, `-h`.
/// No argument-parsing crate is introduced; the engine itself never sees
/// `argv`, matching the core's explicit exclusion of CLI parsing from its
/// scope.
fn parse_args(args: &[String]) -> Result<ParsedArgs, String> {
    let mut num_mapper: i64 = 1;
    let mut sequential = false;
    let mut mapper_cmd: Option<String> = None;
    let mut splitter_cmd: Option<String> = None;
    let mut combiner_cmd: Option<String> = None;

    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        match arg {
            "-h" => return Ok(ParsedArgs::Help),
            "-S" => sequential = true,
            "-m" | "-n" | "-s" | "-c" => {
                i += 1;
                let value = args
                    .get(i)
                    .ok_or_else(|| format!("{arg} requires an argument"))?;
                match arg {
                    "-m" => mapper_cmd = Some(value.clone()),
                    "-n" => {
                        num_mapper = value
                            .parse::<i64>()
                            .map_err(|_| format!("-n expects an integer, got {value:?}"))?;
                    }
                    "-s" => splitter_cmd = Some(value.clone()),
                    "-c" => combiner_cmd = Some(value.clone()),
                    _ => unreachable!(),
                }
            }
            other => return Err(format!("unrecognized argument: {other}")),
        }
        i += 1;
    }

    Ok(ParsedArgs::Run(RawOptions {
        num_mapper,
        sequential,
        mapper_cmd,
        splitter_cmd,
        combiner_cmd,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_or_panic(args: &[&str]) -> RawOptions {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        match parse_args(&args).expect("parse should succeed") {
            ParsedArgs::Run(raw) => raw,
            ParsedArgs::Help => panic!("expected Run, got Help"),
        }
    }

    #[test]
    fn minimal_mapper_only() {
        let raw = run_or_panic(&["-m", "cat"]);
        assert_eq!(raw.mapper_cmd.as_deref(), Some("cat"));
        assert_eq!(raw.num_mapper, 1);
        assert!(!raw.sequential);
        assert!(raw.splitter_cmd.is_none());
        assert!(raw.combiner_cmd.is_none());
    }

    #[test]
    fn full_option_set_parses() {
        let raw = run_or_panic(&[
            "-m", "tr a-z A-Z",
            "-n", "4",
            "-s", "cat {}",
            "-c", "cat {}",
        ]);
        assert_eq!(raw.mapper_cmd.as_deref(), Some("tr a-z A-Z"));
        assert_eq!(raw.num_mapper, 4);
        assert_eq!(raw.splitter_cmd.as_deref(), Some("cat {}"));
        assert_eq!(raw.combiner_cmd.as_deref(), Some("cat {}"));
    }

    #[test]
    fn sequential_flag_is_order_independent_of_mapper_flag() {
        let raw = run_or_panic(&["-S", "-m", "cat"]);
        assert!(raw.sequential);
        assert_eq!(raw.mapper_cmd.as_deref(), Some("cat"));
    }

    #[test]
    fn help_flag_short_circuits_regardless_of_position() {
        let args: Vec<String> = vec!["-m".into(), "cat".into(), "-h".into()];
        assert!(matches!(parse_args(&args), Ok(ParsedArgs::Help)));
    }

    #[test]
    fn missing_value_for_flag_is_an_error() {
        let args: Vec<String> = vec!["-m".into()];
        assert!(parse_args(&args).is_err());
    }

    #[test]
    fn non_integer_n_is_an_error() {
        let args: Vec<String> = vec!["-n".into(), "banana".into(), "-m".into(), "cat".into()];
        assert!(parse_args(&args).is_err());
    }

    #[test]
    fn unrecognized_flag_is_an_error() {
        let args: Vec<String> = vec!["-x".into()];
        assert!(parse_args(&args).is_err());
    }

    #[test]
    fn missing_mapper_is_not_a_parse_error_here_but_caught_by_options() {
        // parse_args itself doesn't require -m; Options::new is where the
        // "mapper command is required" configuration error surfaces.
        let raw = run_or_panic(&[]);
        assert!(raw.mapper_cmd.is_none());
    }
}
