use clap::Subcommand;
use sharedtimer_core::storage::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print a configuration value by dotted key, e.g. timer.tick_interval_ms
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// Print the whole configuration as TOML
    List,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load();
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown configuration key: {key}").into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load();
            config.set(&key, &value)?;
            config.save()?;
            println!("{key} = {value}");
        }
        ConfigAction::List => {
            let config = Config::load();
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }
    Ok(())
}
