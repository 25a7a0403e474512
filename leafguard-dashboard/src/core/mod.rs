/*!
Core modules for the dashboard session runner
*/

pub mod client;
pub mod config;
pub mod session;
pub mod telemetry;
