pub mod config;
pub mod constants;

#[cfg(feature = "player")]
pub mod player;
