use crate::error::{CliError, CliResult};
use locality_index::GeneratorConfig;
use std::fs;
use std::path::Path;

/// Load the generator config from `path`, or the defaults when absent.
///
/// `threads` from the command line wins over the file.
pub fn load_generator_config(
    path: Option<&Path>,
    threads: Option<usize>,
) -> CliResult<GeneratorConfig> {
    let mut config = match path {
        Some(p) => {
            let text = fs::read_to_string(p)
                .map_err(|e| CliError::Config(format!("cannot read {}: {e}", p.display())))?;
            parse_generator_config(&text)
                .map_err(|e| CliError::Config(format!("{}: {e}", p.display())))?
        }
        None => GeneratorConfig::default(),
    };
    if let Some(threads) = threads {
        if threads == 0 {
            return Err(CliError::Usage("--threads must be at least 1".into()));
        }
        config.threads = threads;
    }
    Ok(config)
}

fn parse_generator_config(text: &str) -> Result<GeneratorConfig, toml::de::Error> {
    toml::from_str(text)
}
