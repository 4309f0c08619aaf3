pub mod address;
pub mod cli;
pub mod error;
pub mod lru;
pub mod simulation;
pub mod simulation_result;
pub mod trace;
pub mod transpose;

pub use error::{Error, Result};

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
use wasm_bindgen::prelude::*;

#[cfg(all(target_arch = "wasm32", target_os = "unknown"))]
#[wasm_bindgen]
pub fn run_simulation(set_bits: u32, lines_per_set: usize, block_bits: u32, trace: &str) -> String {
    use address::Geometry;
    use simulation::Simulation;

    let mut simulation = match Geometry::new(set_bits, lines_per_set, block_bits)
        .and_then(Simulation::new)
    {
        Ok(simulation) => simulation,
        Err(e) => return e.to_string(),
    };

    let mut result = Vec::new();
    result.push(simulation.lru_cache().format_info());

    match simulation.replay(trace::events(trace)) {
        Ok(simulation_result) => result.push(simulation_result.to_string()),
        Err(e) => return e.to_string(),
    };

    result.join("\n")
}
