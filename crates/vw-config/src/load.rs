use std::path::Path;

use vw_types::error::ConfigError;

use crate::model::Config;
use crate::validate::validate;

/// Reads, parses, defaults, and validates the config file at `path`.
/// Returns the non-fatal warnings alongside the config; fatal problems are
/// returned as `Err`.
pub fn load(path: &Path) -> Result<(Config, Vec<String>), ConfigError> {
    let body = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let mut config: Config = toml::from_str(&body)?;

    for (name, spec) in config.chains.iter_mut() {
        if spec.chain_id.is_empty() {
            spec.chain_id = name.clone();
        }
        spec.alerts.apply_defaults(&config.defaults);
    }

    let (fatal, problems) = validate(&config);
    if fatal {
        return Err(ConfigError::Invalid(problems.join("\n")));
    }
    Ok((config, problems))
}
