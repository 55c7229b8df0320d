pub mod audit;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod diagnosis;
pub mod gate;
pub mod intake;
pub mod logging;
pub mod orchestrator;
pub mod planner;
pub mod protocol;
pub mod reasoning;
pub mod server;
pub mod types;
