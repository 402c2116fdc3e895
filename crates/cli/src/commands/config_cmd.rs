//! `agentloop config`: print the effective configuration.

use agentloop_config::AppConfig;

pub fn show(default: bool) -> Result<(), Box<dyn std::error::Error>> {
    if default {
        print!("{}", AppConfig::default_toml());
        return Ok(());
    }

    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    if config.api_key.is_some() {
        config.api_key = Some("[REDACTED]".into());
    }

    println!(
        "# {}",
        AppConfig::config_dir().join("config.toml").display()
    );
    print!("{}", toml::to_string_pretty(&config)?);
    println!();
    println!(
        "# history file: {}",
        config
            .history
            .resolved_directory()
            .join(format!("{}.json", config.history.session))
            .display()
    );
    Ok(())
}
