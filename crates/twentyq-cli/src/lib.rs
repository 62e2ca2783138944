pub mod config;
pub mod dataset;
pub mod logging;
pub mod play;
pub mod simulate;
