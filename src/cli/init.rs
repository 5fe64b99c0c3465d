use std::error::Error;
use tonedeck::config::Config;

pub fn handle_init() -> Result<(), Box<dyn Error>> {
    // Check if already initialized
    if Config::exists()? {
        return Err(
            "tonedeck is already initialized. Use 'tonedeck config set <key> <value>' to change settings."
                .into(),
        );
    }

    let config = Config::new();
    config.save()?;

    println!("tonedeck initialized successfully!");
    println!(
        "Configuration saved to: {}",
        Config::config_path()?.display()
    );

    Ok(())
}
