use anyhow::{Context, Result};
use cinesift_etl::{config, Config};
use toml_edit::{value, DocumentMut};

/// Keys holding integers rather than strings in the config file.
const INTEGER_KEYS: &[&str] = &["workers", "tmdb_requests_per_second"];

/// Show the current effective configuration.
pub fn show_config(config: &Config) -> Result<()> {
    println!("Current Configuration");
    println!("=====================\n");

    let path = config::config_file_path();
    println!("Config file: {}", path.display());
    println!(
        "File exists: {}\n",
        if path.exists() { "yes" } else { "no (using defaults)" }
    );

    println!("Settings:");
    for key in config::KEYS {
        let shown = config.value_of(key).unwrap_or_else(|| String::from("<not set>"));
        println!("  {key}: {shown}");
    }
    println!(
        "  retry: {} retries, {}ms..{}ms",
        config.retry.max_retries, config.retry.min_delay_ms, config.retry.max_delay_ms
    );
    println!("  logging.level: {:?}", config.logging.level());
    println!("  logging.coloured: {}", config.logging.coloured());
    println!("  logging.output: {:?}", config.logging.output());

    println!("\nPriority: ENV vars (CINESIFT_*) > Config file > Defaults");

    Ok(())
}

/// Get a specific config value, or the whole file when no key is given.
pub fn get_config(config: &Config, key: Option<String>) -> Result<()> {
    if let Some(key) = key {
        ensure_known(&key)?;
        println!(
            "{}",
            config.value_of(&key).unwrap_or_else(|| String::from("<not set>"))
        );
        return Ok(());
    }

    let config_path = config::config_file_path();
    if config_path.exists() {
        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        print!("{contents}");
    } else {
        println!("Config file does not exist: {}", config_path.display());
        println!("\nRun 'cinesift config init' to create it.");
    }

    Ok(())
}

/// Set a config value, keeping the rest of the file and its comments intact.
pub fn set_config(key: &str, new_value: &str) -> Result<()> {
    ensure_known(key)?;

    let config_path = config::config_file_path();
    config::ensure_config_file()?;

    let contents = std::fs::read_to_string(&config_path).context("Failed to read config file")?;
    let updated = apply(&contents, key, new_value)?;

    std::fs::write(&config_path, updated).context("Failed to write config file")?;

    println!("✓ Updated {key}");
    println!("  in {}", config_path.display());

    Ok(())
}

/// Show the config file path.
pub fn show_path() -> Result<()> {
    println!("{}", config::config_file_path().display());
    Ok(())
}

/// Show example configuration.
pub fn show_example() -> Result<()> {
    print!("{}", config::example_config());
    Ok(())
}

/// Initialize config file with defaults.
pub fn init_config() -> Result<()> {
    let created = config::ensure_config_file()?;
    let config_path = config::config_file_path();

    if created {
        println!("✓ Created config file: {}", config_path.display());
        println!("\nEdit this file to add your vector index, TMDB and LLM credentials.");
    } else {
        println!("Config file already exists: {}", config_path.display());
    }

    Ok(())
}

fn ensure_known(key: &str) -> Result<()> {
    if config::KEYS.contains(&key) {
        Ok(())
    } else {
        anyhow::bail!(
            "Unknown config key: {key}\n\nValid keys: {}",
            config::KEYS.join(", ")
        )
    }
}

/// Write a top-level `key = new_value` into a config document.
fn apply(contents: &str, key: &str, new_value: &str) -> Result<String> {
    let mut doc: DocumentMut = contents.parse().context("Config file is not valid TOML")?;
    let table = doc.as_table_mut();

    if INTEGER_KEYS.contains(&key) {
        let number: i64 = new_value
            .parse()
            .with_context(|| format!("{key} must be a whole number, got {new_value:?}"))?;
        anyhow::ensure!(number > 0, "{key} must be at least 1");
        table[key] = value(number);
    } else {
        table[key] = value(new_value);
    }

    Ok(doc.to_string())
}
