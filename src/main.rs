use anyhow::Context;
use cachelab::cli::{CsimArgs, init_logging};
use cachelab::simulation::Simulation;
use clap::Parser;

fn main() -> anyhow::Result<()> {
    let args = CsimArgs::parse();
    init_logging(args.verbose);

    let (geometry, trace_file) = args.config()?;
    let simulation_result = Simulation::run_file(geometry, &trace_file)
        .with_context(|| format!("failed to simulate '{}'", trace_file.display()))?;

    println!("{simulation_result}");
    Ok(())
}
