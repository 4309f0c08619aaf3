use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::{Context, bail};
use cachelab::cli::{TestTransArgs, init_logging};
use cachelab::transpose::{self, SUBMISSION_DESCRIPTION};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    let args = TestTransArgs::parse();
    init_logging(args.verbose);

    let geometry = transpose::evaluation_geometry();
    println!("Evaluating registered transpose funcs for correctness and performance");
    println!("Cache: {geometry}, M={} N={}", args.cols, args.rows);

    let mut incorrect = Vec::new();
    for (i, function) in transpose::registered_functions().iter().enumerate() {
        let is_submission = function.description == SUBMISSION_DESCRIPTION;
        let keep_events = is_submission && args.dump_trace.is_some();

        let report = transpose::evaluate(function, args.rows, args.cols, args.seed, keep_events)
            .with_context(|| format!("failed to evaluate '{}'", function.description))?;
        println!("func {i} ({report})");

        if !report.correct {
            incorrect.push(function.description);
        }

        if let (true, Some(path)) = (keep_events, &args.dump_trace) {
            let file = File::create(path)
                .with_context(|| format!("unable to create '{}'", path.display()))?;
            let mut writer = BufWriter::new(file);
            for event in &report.events {
                writeln!(writer, "{event}")?;
            }
            writer.flush()?;
            println!("wrote {} accesses to {}", report.events.len(), path.display());
        }
    }

    if !incorrect.is_empty() {
        bail!("incorrect transpose: {}", incorrect.join(", "));
    }

    Ok(())
}
