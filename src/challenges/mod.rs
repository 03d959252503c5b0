// Aggregates DataDome challenge detection, solving, and the shared transport layer.

pub mod core;
pub mod detectors;
pub mod solvers;
pub mod user_agents;
