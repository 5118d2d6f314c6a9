use crate::credentials::CredentialEntry;
use crate::installation::{Installation, Registry};
use serde::Deserialize;
use std::collections::HashSet;

/// Tool configuration: registered Flyway installations and credentials.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RunnerConfig {
    #[serde(default)]
    pub installations: Vec<Installation>,
    #[serde(default)]
    pub credentials: Vec<CredentialEntry>,
}

impl RunnerConfig {
    pub fn from_yaml(content: &str) -> Result<Self, String> {
        let cfg: RunnerConfig =
            serde_yaml::from_str(content).map_err(|e| format!("parsing config YAML: {}", e))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json(content: &str) -> Result<Self, String> {
        let cfg: RunnerConfig =
            serde_json::from_str(content).map_err(|e| format!("parsing config JSON: {}", e))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &str) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("reading config '{}': {}", path, e))?;
        if path.ends_with(".json") {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        let mut names = HashSet::new();
        for inst in &self.installations {
            if inst.name.is_empty() {
                return Err("installation name must not be empty".into());
            }
            if inst.home.is_empty() {
                return Err(format!("installation '{}' must have a home", inst.name));
            }
            if !names.insert(inst.name.as_str()) {
                return Err(format!("duplicate installation name '{}'", inst.name));
            }
        }
        let mut ids = HashSet::new();
        for cred in &self.credentials {
            cred.validate()?;
            if !ids.insert(cred.id.as_str()) {
                return Err(format!("duplicate credential id '{}'", cred.id));
            }
        }
        Ok(())
    }

    pub fn registry(&self) -> Registry {
        Registry::new(self.installations.clone())
    }
}
