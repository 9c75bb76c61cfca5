use super::Config;
use anyhow::{Context, Result};
use directories::UserDirs;
use std::fs;
use std::path::Path;

impl Config {
    pub fn load_or_init() -> Result<Self> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        Self::load_or_init_in(&home.join(".nexusops"))
    }

    /// Load `config.toml` under `nexusops_dir`, writing defaults on first run.
    /// Env overrides are applied before validation.
    pub fn load_or_init_in(nexusops_dir: &Path) -> Result<Self> {
        let config_path = nexusops_dir.join("config.toml");

        if !nexusops_dir.exists() {
            fs::create_dir_all(nexusops_dir).context("Failed to create .nexusops directory")?;
            fs::create_dir_all(nexusops_dir.join("workspace"))
                .context("Failed to create workspace directory")?;
        }

        let mut config = if config_path.exists() {
            let contents =
                fs::read_to_string(&config_path).context("Failed to read config file")?;
            let mut config: Config =
                toml::from_str(&contents).context("Failed to parse config file")?;
            config.config_path.clone_from(&config_path);
            config.workspace_dir = nexusops_dir.join("workspace");
            config
        } else {
            let config = Self {
                config_path: config_path.clone(),
                workspace_dir: nexusops_dir.join("workspace"),
                ..Self::default()
            };
            config.save()?;
            config
        };

        config.apply_env_overrides();
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let toml_str = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&self.config_path, toml_str).context("Failed to write config file")?;
        Ok(())
    }
}
