//! tonedeck - terminal audio player with a live visualizer.
//!
//! Plays WAV and FLAC files from a playlist, draws the playing audio as a
//! smoothed waveform, a mirrored trace or frequency bars, and keeps a short
//! activity log of everything that happened. Files are given on the command
//! line or added while the player runs.
//!
//! The player itself is behind the `player` feature (on by default); the
//! configuration commands work without it.

use clap::{CommandFactory, Parser, Subcommand, builder::PossibleValuesParser};
use clap_complete::{Generator, Shell, generate};
use std::error::Error;
use std::io;
use tonedeck::config::CONFIG_KEYS;

mod cli;

use cli::play::PlayOptions;

#[derive(Parser)]
#[command(name = "tonedeck")]
#[command(about = "Terminal audio player with a real-time waveform and spectrum visualizer")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// Show or change the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Play audio files or folders
    Play {
        /// Files or directories to load into the playlist
        files: Vec<String>,
        /// Visualizer style for this session
        #[arg(short, long, value_parser = PossibleValuesParser::new(["linear", "mirrored", "bars"]))]
        style: Option<String>,
        /// Analysis window size (power of two, 32-32768)
        #[arg(long)]
        fft_size: Option<usize>,
        /// Starting volume between 0 and 1
        #[arg(long)]
        volume: Option<f32>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// View current configuration
    View,
    /// Set a configuration value
    Set {
        /// Configuration key
        #[arg(value_parser = PossibleValuesParser::new(CONFIG_KEYS))]
        key: String,
        /// Configuration value
        value: String,
    },
    /// Edit configuration file in your editor
    Edit,
}

fn print_completions<G: Generator>(generator: G, cmd: &mut clap::Command) {
    generate(
        generator,
        cmd,
        cmd.get_name().to_string(),
        &mut io::stdout(),
    );
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            cli::init::handle_init()?;
        }
        Commands::Config { action } => match action {
            ConfigAction::View => {
                cli::config::handle_config_view()?;
            }
            ConfigAction::Set { key, value } => {
                cli::config::handle_config_set(&key, &value)?;
            }
            ConfigAction::Edit => {
                cli::config::handle_config_edit()?;
            }
        },
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            print_completions(shell, &mut cmd);
        }
        Commands::Play {
            files,
            style,
            fft_size,
            volume,
        } => {
            let options = PlayOptions {
                style,
                fft_size,
                volume,
            };
            cli::play::handle_play(&files, &options)?;
        }
    }

    Ok(())
}
