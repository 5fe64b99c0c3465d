use std::error::Error;
use tonedeck::config::{Config, VisualStyle, validate_fft_size};

/// One-session overrides given on the command line
#[derive(Debug, Default)]
pub struct PlayOptions {
    pub style: Option<String>,
    pub fft_size: Option<usize>,
    pub volume: Option<f32>,
}

/// Layer command-line overrides over the stored configuration
pub fn apply_overrides(mut config: Config, options: &PlayOptions) -> Result<Config, Box<dyn Error>> {
    if let Some(style) = &options.style {
        config.visual_style = style.parse::<VisualStyle>()?;
    }
    if let Some(size) = options.fft_size {
        config.fft_size = validate_fft_size(size)?;
    }
    if let Some(volume) = options.volume {
        if volume.is_nan() {
            return Err("Volume must be a number between 0 and 1".into());
        }
        config.volume = volume.clamp(0.0, 1.0);
    }
    Ok(config)
}

pub fn handle_play(files: &[String], options: &PlayOptions) -> Result<(), Box<dyn Error>> {
    let config = apply_overrides(Config::load()?, options)?;

    #[cfg(feature = "player")]
    {
        tonedeck::player::run(files, &config)
    }

    #[cfg(not(feature = "player"))]
    {
        let _ = files;
        let _ = config;
        use owo_colors::OwoColorize;
        println!("{} {}", "♪".cyan(), "tonedeck".bold());
        println!();
        println!(
            "{} The audio player requires the 'player' feature to be enabled.",
            "Note:".yellow()
        );
        println!();
        println!("To enable it, install with:");
        println!("  {}", "cargo install tonedeck --features player".cyan());
        println!();
        println!("Or if building from source:");
        println!("  {}", "cargo build --release --features player".cyan());

        Ok(())
    }
}
