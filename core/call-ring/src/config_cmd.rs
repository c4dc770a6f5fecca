//! Provider configuration subcommands.

use call_core::{load_provider_config, save_provider_config, ProviderConfig, StorageConfig};

use crate::CliError;

pub fn show(storage: &StorageConfig) -> ProviderConfig {
    load_provider_config(storage)
}

pub fn set_log_enabled(storage: &StorageConfig, enabled: bool) -> Result<ProviderConfig, CliError> {
    let mut config = load_provider_config(storage);
    config.log_enabled = enabled;
    save_provider_config(storage, &config)?;
    Ok(config)
}
