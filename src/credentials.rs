use crate::args::MASK;
use crate::env::Environment;
use serde::Deserialize;
use std::fmt;

#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &MASK)
            .finish()
    }
}

/// Resolves an opaque credential reference.
pub trait CredentialStore {
    /// `Ok(None)` when no credential has this id.
    fn resolve(&self, id: &str) -> Result<Option<Credential>, String>;
}

/// Credential declared in the runner configuration. The password comes
/// either inline or from an environment variable.
#[derive(Debug, Deserialize, Clone)]
pub struct CredentialEntry {
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub password_env: Option<String>,
}

impl CredentialEntry {
    pub fn validate(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("credential id must not be empty".into());
        }
        match (&self.password, &self.password_env) {
            (Some(_), Some(_)) => Err(format!(
                "credential '{}': password and password_env are mutually exclusive",
                self.id
            )),
            (None, Some(var)) if var.is_empty() => Err(format!(
                "credential '{}': password_env must not be empty",
                self.id
            )),
            (None, None) => Err(format!(
                "credential '{}' needs password or password_env",
                self.id
            )),
            _ => Ok(()),
        }
    }
}

/// Store backed by the configuration file entries.
pub struct ConfiguredStore {
    entries: Vec<CredentialEntry>,
    env: Environment,
}

impl ConfiguredStore {
    pub fn new(entries: Vec<CredentialEntry>, env: Environment) -> Self {
        Self { entries, env }
    }
}

impl CredentialStore for ConfiguredStore {
    fn resolve(&self, id: &str) -> Result<Option<Credential>, String> {
        let Some(entry) = self.entries.iter().find(|e| e.id == id) else {
            return Ok(None);
        };
        let password = match (&entry.password, &entry.password_env) {
            (Some(p), _) => p.clone(),
            (None, Some(var)) => self
                .env
                .get(var)
                .map(str::to_string)
                .ok_or_else(|| format!("environment variable '{}' not set", var))?,
            (None, None) => return Err(format!("credential '{}' has no password source", id)),
        };
        Ok(Some(Credential {
            username: entry.username.clone(),
            password,
        }))
    }
}
