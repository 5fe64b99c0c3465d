pub mod activity_log;
pub mod app;
pub mod engine;
pub mod playlist;
pub mod prompt;
pub mod sampler;
pub mod time;
pub mod track;
pub mod transport;
pub mod ui;
pub mod visualizer;

use crate::config::Config;
use std::error::Error;

pub fn run(files: &[String], config: &Config) -> Result<(), Box<dyn Error>> {
    app::run(files, config)
}
