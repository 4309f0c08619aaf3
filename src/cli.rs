use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

use crate::address::Geometry;
use crate::error::{Error, Result};

/// Replays a valgrind memory trace on a set-associative LRU cache.
#[derive(Parser, Debug)]
#[command(
    name = "csim",
    version,
    about,
    after_help = "Examples:\n    csim -s 4 -E 1 -b 4 -t traces/yi.trace\n    csim -v -s 8 -E 2 -b 4 -t traces/yi.trace"
)]
pub struct CsimArgs {
    #[arg(short, help = "Optional verbose flag, logs every event to stderr")]
    pub verbose: bool,
    #[arg(short = 's', value_name = "num", help = "Number of set index bits")]
    pub set_bits: Option<u32>,
    #[arg(short = 'E', value_name = "num", help = "Number of lines per set")]
    pub lines_per_set: Option<usize>,
    #[arg(short = 'b', value_name = "num", help = "Number of block offset bits")]
    pub block_bits: Option<u32>,
    #[arg(short = 't', value_name = "file", help = "Trace file")]
    pub trace_file: Option<PathBuf>,
}

impl CsimArgs {
    /// Validated cache geometry and trace path.
    pub fn config(&self) -> Result<(Geometry, PathBuf)> {
        let (Some(set_bits), Some(lines_per_set), Some(block_bits), Some(trace_file)) = (
            self.set_bits,
            self.lines_per_set,
            self.block_bits,
            self.trace_file.clone(),
        ) else {
            let missing = [
                (self.set_bits.is_none(), "-s"),
                (self.lines_per_set.is_none(), "-E"),
                (self.block_bits.is_none(), "-b"),
                (self.trace_file.is_none(), "-t"),
            ]
            .into_iter()
            .filter_map(|(missing, flag)| missing.then_some(flag))
            .collect::<Vec<_>>();

            return Err(Error::Configuration(format!(
                "missing required command line argument(s): {}",
                missing.join(", ")
            )));
        };

        Ok((
            Geometry::new(set_bits, lines_per_set, block_bits)?,
            trace_file,
        ))
    }
}

/// Evaluates the registered transpose kernels on the simulated cache.
#[derive(Parser, Debug)]
#[command(name = "test-trans", version, about)]
pub struct TestTransArgs {
    #[arg(short = 'M', value_name = "cols", help = "Number of columns of A")]
    pub cols: usize,
    #[arg(short = 'N', value_name = "rows", help = "Number of rows of A")]
    pub rows: usize,
    #[arg(long, default_value_t = 0, help = "Seed for the contents of A")]
    pub seed: u64,
    #[arg(long, value_name = "file", help = "Write the submission's accesses as a trace file")]
    pub dump_trace: Option<PathBuf>,
    #[arg(short, help = "Log every cache access to stderr")]
    pub verbose: bool,
}

/// Sets up `env_logger`, `RUST_LOG` still overrides the default filter.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::Trace
    } else {
        LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .init();
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_short_flags() {
        let args = CsimArgs::try_parse_from(["csim", "-v", "-s", "4", "-E", "2", "-b", "4", "-t", "yi.trace"])
            .unwrap();
        let (geometry, trace_file) = args.config().unwrap();

        assert!(args.verbose);
        assert_eq!(geometry, Geometry::new(4, 2, 4).unwrap());
        assert_eq!(trace_file, PathBuf::from("yi.trace"));
    }

    #[test]
    fn missing_flags_are_configuration_errors() {
        let args = CsimArgs::try_parse_from(["csim", "-s", "4", "-t", "yi.trace"]).unwrap();

        match args.config() {
            Err(Error::Configuration(message)) => {
                assert!(message.contains("-E"));
                assert!(message.contains("-b"));
                assert!(!message.contains("-s"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn invalid_geometry_is_configuration_error() {
        let args =
            CsimArgs::try_parse_from(["csim", "-s", "1", "-E", "0", "-b", "1", "-t", "yi.trace"])
                .unwrap();

        assert!(matches!(args.config(), Err(Error::Configuration(_))));
    }

    #[test]
    fn help_is_not_an_error_kind() {
        let error = CsimArgs::try_parse_from(["csim", "-h"]).unwrap_err();

        assert_eq!(error.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_trans_requires_dimensions() {
        assert!(TestTransArgs::try_parse_from(["test-trans", "-M", "32"]).is_err());

        let args = TestTransArgs::try_parse_from(["test-trans", "-M", "61", "-N", "67"]).unwrap();
        assert_eq!((args.rows, args.cols, args.seed), (67, 61, 0));
    }
}
