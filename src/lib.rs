//! Staking gateway controller library.

pub mod blockchain;
pub mod cli;
pub mod config;
pub mod controller;
pub mod lifecycle;
pub mod observability;
pub mod render;
pub mod supervisor;
pub mod topology;

pub use config::schema::ControllerConfig;
pub use controller::Controller;
pub use supervisor::ProcessSupervisor;
