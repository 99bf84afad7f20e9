pub mod cycle;
pub mod runner;

pub use cycle::{run_cycle, CycleContext, CycleReport};
pub use runner::{run_cycle_loop, LatestReport};
