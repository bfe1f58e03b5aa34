//! WebAssembly bindings for `spectral_core`.

mod model;
mod simulation;

pub use simulation::WasmSimulation;
