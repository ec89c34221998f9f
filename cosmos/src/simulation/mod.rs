pub mod states;
pub mod params;
pub mod settings;
pub mod barnes_hut;
pub mod forces;
pub mod integrator;
pub mod collision;
pub mod absorption;
pub mod scenario;
pub mod diagnostics;
pub mod engine;
