use std::error::Error;
use std::path::Path;
use std::process::Command;
use tonedeck::config::{CONFIG_KEYS, Config};

pub fn handle_config_view() -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;

    println!("tonedeck configuration ({})", Config::config_path()?.display());
    for key in CONFIG_KEYS {
        if let Some(value) = config.get_value(key) {
            println!("  {key} = {value}");
        }
    }

    Ok(())
}

pub fn handle_config_set(key: &str, value: &str) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load()?;
    config.set_value(key, value)?;
    config.save()?;

    // Show what was stored, e.g. the expanded log path
    let stored = config.get_value(key).unwrap_or_else(|| value.to_string());
    println!("Set {key} = {stored}");

    Ok(())
}

/// Open the config file in `$VISUAL` or `$EDITOR`, then reload it so a bad
/// edit is reported with the field that failed.
pub fn handle_config_edit() -> Result<(), Box<dyn Error>> {
    let config_path = Config::config_path()?;
    if !config_path.exists() {
        return Err("No configuration file yet. Run 'tonedeck init' first.".into());
    }

    let editor = editor_command();
    println!("Opening {} in {editor}", config_path.display());
    run_editor(&editor, &config_path)?;

    let config = Config::load()?;
    println!(
        "Configuration OK: {} style, fft_size {}",
        config.visual_style, config.fft_size
    );

    Ok(())
}

fn editor_command() -> String {
    ["VISUAL", "EDITOR"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "vi".to_string())
}

fn run_editor(editor: &str, path: &Path) -> Result<(), Box<dyn Error>> {
    let status = Command::new(editor).arg(path).status().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            format!("Editor '{editor}' not found. Set $EDITOR to a valid editor path.")
        } else {
            format!("Failed to launch editor '{editor}': {e}")
        }
    })?;

    if !status.success() {
        return Err(format!("Editor '{editor}' exited with {status}").into());
    }
    Ok(())
}
