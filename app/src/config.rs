use std::fs;

use anyhow::{Context, Result};

use netlab_api as api;
use api::config::Config;

use super::commands::CliArg;

/// Parse command line arguments and load the configuration file they name
pub fn parse_args(root_cmd: clap::App) -> Result<Config> {
    let matches = root_cmd.get_matches();

    let mut config = match matches.value_of(CliArg::Config.as_str()) {
        Some(config_file) => {
            let s = fs::read_to_string(config_file)
                .with_context(|| format!("Failed to read {}", config_file))?;
            let mut config = Config::from_yaml_str(&s)
                .with_context(|| format!("Failed to parse {}", config_file))?;
            config.fpath = config_file.to_string();
            config
        }
        None => Config::default(),
    };

    set_config_by_cli_args(&mut config, &matches);

    Ok(config)
}

/// Use command arguments overrides config file settings
fn set_config_by_cli_args(config: &mut Config, matches: &clap::ArgMatches) {
    config.quiet = matches.is_present(CliArg::Quiet.as_str());
    config.verbose_mode = matches.is_present(CliArg::Verbose.as_str());
}
