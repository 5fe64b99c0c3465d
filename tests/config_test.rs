use tempfile::TempDir;
use tonedeck::config::{Config, VisualStyle};

#[test]
fn test_config_lifecycle() {
    // Create a temporary directory for test config
    let temp_dir = TempDir::new().unwrap();

    // Override the config path for testing
    unsafe {
        std::env::set_var("XDG_CONFIG_HOME", temp_dir.path());
    }

    // A missing file means defaults
    assert!(!Config::exists().unwrap());
    let defaults = Config::load().unwrap();
    assert_eq!(defaults.fft_size, 256);
    assert_eq!(defaults.visual_style, VisualStyle::Mirrored);

    // Create and save a config
    let config = Config::new();
    config.save().unwrap();
    assert!(Config::exists().unwrap());
    assert!(
        Config::config_path()
            .unwrap()
            .starts_with(temp_dir.path().join("tonedeck"))
    );

    // Test config mutation
    let mut config = Config::load().unwrap();
    config.set_value("visual_style", "linear").unwrap();
    config.set_value("fft_size", "2048").unwrap();
    config.set_value("volume", "0.3").unwrap();
    config.save().unwrap();

    // Verify mutations persisted
    let reloaded = Config::load().unwrap();
    assert_eq!(reloaded.visual_style, VisualStyle::Linear);
    assert_eq!(reloaded.fft_size, 2048);
    assert_eq!(reloaded.volume, 0.3);

    // Test invalid key and values
    let mut config = Config::load().unwrap();
    assert!(config.set_value("invalid_key", "value").is_err());
    assert!(config.set_value("fft_size", "3000").is_err());

    // A hand-edited file with a bad window size is refused
    std::fs::write(Config::config_path().unwrap(), "fft_size = 20\n").unwrap();
    assert!(Config::load().is_err());
}
