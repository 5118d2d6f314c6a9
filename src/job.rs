use crate::compose::MigrationRequest;
use serde::Deserialize;

/// A job definition: Flyway steps run in declaration order.
///
/// ```yaml
/// steps:
///   - installation: flyway-9
///     command: migrate
///     url: jdbc:mysql://mysqlserver:3306/mydb
///     locations: filesystem:$WORKSPACE/dbscripts
///     credentials_id: mydb-creds
/// ```
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct JobSpec {
    #[serde(default)]
    pub name: String,
    pub steps: Vec<MigrationRequest>,
}

impl JobSpec {
    pub fn from_yaml(content: &str) -> Result<Self, String> {
        let spec: JobSpec =
            serde_yaml::from_str(content).map_err(|e| format!("parsing job YAML: {}", e))?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn from_json(content: &str) -> Result<Self, String> {
        let spec: JobSpec =
            serde_json::from_str(content).map_err(|e| format!("parsing job JSON: {}", e))?;
        spec.validate()?;
        Ok(spec)
    }

    pub fn load(path: &str) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("reading job file '{}': {}", path, e))?;
        if path.ends_with(".json") {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.steps.is_empty() {
            return Err("job must contain at least one step".into());
        }
        for (i, step) in self.steps.iter().enumerate() {
            if step.installation.is_empty() {
                return Err(format!("step {}: installation must not be empty", i + 1));
            }
            if step.command.trim().is_empty() {
                return Err(format!("step {}: command must not be empty", i + 1));
            }
        }
        Ok(())
    }
}
