pub mod constants;
pub mod errors;
pub mod graph;
pub mod models;
pub mod reconciler;
pub mod scheduler;
pub mod services;
pub mod simplifier;
pub mod state;
