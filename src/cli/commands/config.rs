//! Config file commands.

use tokio::runtime::Runtime;

use crate::config::{self, Config};

/// Write `config` (defaults plus any overrides) to the config file
pub fn cmd_config_init(rt: &Runtime, config: Config, force: bool) -> anyhow::Result<()> {
    match config::config_path() {
        Some(path) if path.exists() && !force => {
            anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
        }
        _ => {}
    }

    let path = rt.block_on(config::save_async(config))?;
    println!("Wrote {}", path.display());
    Ok(())
}

/// Print the effective configuration with secrets masked
pub fn cmd_config_show(config: &Config) -> anyhow::Result<()> {
    let mut shown = config.clone();
    for secret in [
        &mut shown.credentials.plex_token,
        &mut shown.credentials.slskd_api_key,
        &mut shown.credentials.spotify_access_token,
    ] {
        if secret.is_some() {
            *secret = Some("********".to_string());
        }
    }

    if let Some(path) = config::config_path() {
        println!("# {}", path.display());
    }
    print!("{}", toml::to_string_pretty(&shown)?);
    Ok(())
}
