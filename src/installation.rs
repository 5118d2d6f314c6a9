use crate::env::Environment;
use crate::workspace::lexical_clean;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[cfg(windows)]
const EXECUTABLE_NAME: &str = "flyway.cmd";
#[cfg(not(windows))]
const EXECUTABLE_NAME: &str = "flyway";

/// A named Flyway tool location. `home` is either the Flyway directory or
/// the executable itself.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Installation {
    pub name: String,
    pub home: String,
    /// Per worker node overrides of `home`.
    #[serde(default)]
    pub node_homes: HashMap<String, String>,
}

impl Installation {
    pub fn new(name: &str, home: &str) -> Self {
        Self {
            name: name.into(),
            home: launder_home(home).into(),
            node_homes: HashMap::new(),
        }
    }

    /// The installation as seen from `node`. Unknown or empty node names
    /// keep the default home.
    pub fn for_node(&self, node: &str) -> Installation {
        let home = self
            .node_homes
            .get(node)
            .filter(|_| !node.is_empty())
            .unwrap_or(&self.home);
        Installation::new(&self.name, home)
    }

    pub fn for_environment(&self, env: &Environment) -> Installation {
        Installation {
            name: self.name.clone(),
            home: launder_home(&env.expand(&self.home)).into(),
            node_homes: self.node_homes.clone(),
        }
    }

    /// Absolute path of the executable. Relative homes are taken from the
    /// runner's current directory, not the job workspace.
    pub fn executable_path(&self) -> PathBuf {
        let home = absolutize(Path::new(launder_home(&self.home)));
        if home.is_file() {
            home
        } else {
            home.join(EXECUTABLE_NAME)
        }
    }

    /// The executable path, if it exists on this machine.
    pub fn executable(&self) -> Option<PathBuf> {
        let exe = self.executable_path();
        exe.exists().then_some(exe)
    }
}

fn absolutize(path: &Path) -> PathBuf {
    match std::path::absolute(path) {
        Ok(abs) => lexical_clean(&abs),
        Err(_) => path.to_path_buf(),
    }
}

fn launder_home(home: &str) -> &str {
    home.strip_suffix('/')
        .or_else(|| home.strip_suffix('\\'))
        .unwrap_or(home)
}

/// Read-only lookup of the installations registered for this runner.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    installations: Vec<Installation>,
}

impl Registry {
    pub fn new(installations: Vec<Installation>) -> Self {
        Self { installations }
    }

    pub fn find(&self, name: &str) -> Option<&Installation> {
        self.installations.iter().find(|i| i.name == name)
    }

    pub fn all(&self) -> &[Installation] {
        &self.installations
    }
}
