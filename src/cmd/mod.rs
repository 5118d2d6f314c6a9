pub mod installations;
pub mod run;
pub mod run_job;

use crate::config::RunnerConfig;
use crate::credentials::ConfiguredStore;
use crate::env::Environment;
use crate::installation::Registry;
use crate::logging::Logger;
use crate::runner::SystemRunner;
use crate::step;
use crate::workspace;

/// Flags shared by the subcommands that launch Flyway.
#[derive(clap::Args, Debug, Clone)]
pub struct ExecArgs {
    #[arg(
        long,
        default_value = "",
        env = "NODE_NAME",
        help = "Worker node name used to pick node-specific installation homes"
    )]
    pub node: String,
    #[arg(long = "env", value_name = "KEY=VALUE", help = "Extra job environment variable (repeatable)")]
    pub env_overrides: Vec<String>,
    #[arg(
        long,
        default_value = ".",
        env = "FLYWAY_RUNNER_WORKDIR",
        help = "Job workspace; flyway runs here"
    )]
    pub workdir: String,
    #[arg(
        long,
        default_value = "",
        env = "FLYWAY_RUNNER_OUTPUT_LOG",
        help = "Copy flyway output to this file, relative to the workspace"
    )]
    pub output_log: String,
    #[arg(
        long,
        env = "FLYWAY_RUNNER_LEGACY_ERROR_SCAN",
        help = "Fail when flyway output contains \"Errors:\" (requires --output-log)"
    )]
    pub legacy_error_scan: bool,
    #[arg(long, env = "FLYWAY_RUNNER_DRY_RUN", help = "Log the composed command without running it")]
    pub dry_run: bool,
}

/// Loaded configuration and collaborators for a run.
pub struct Setup {
    pub registry: Registry,
    pub store: ConfiguredStore,
    pub env: Environment,
}

impl Setup {
    pub fn load(log: &Logger, config_path: &str, env_overrides: &[String]) -> Result<Self, String> {
        let cfg = RunnerConfig::load(config_path)?;
        log.debug(
            "configuration loaded",
            &[
                ("config", config_path),
                ("installations", &cfg.installations.len().to_string()),
                ("credentials", &cfg.credentials.len().to_string()),
            ],
        );
        let env = Environment::from_process().with_overrides(env_overrides)?;
        let registry = cfg.registry();
        Ok(Self {
            registry,
            store: ConfiguredStore::new(cfg.credentials, env.clone()),
            env,
        })
    }
}

impl ExecArgs {
    pub fn step_options(&self) -> Result<step::Options, String> {
        let output_log = if self.output_log.is_empty() {
            None
        } else {
            Some(workspace::resolve_in_workspace(&self.workdir, &self.output_log)?)
        };
        let options = step::Options {
            dry_run: self.dry_run,
            legacy_error_scan: self.legacy_error_scan,
            output_log,
        };
        options.validate()?;
        Ok(options)
    }

    /// Expose the workspace as `$WORKSPACE` unless the caller set it.
    pub fn bind_workspace(&self, env: &mut Environment) -> Result<(), String> {
        if env.get("WORKSPACE").is_none() {
            let cwd = std::env::current_dir().map_err(|e| format!("getting cwd: {}", e))?;
            let root = workspace::lexical_clean(&cwd.join(&self.workdir));
            env.set("WORKSPACE", &root.display().to_string());
        }
        Ok(())
    }

    pub fn runner(&self, options: &step::Options) -> Result<SystemRunner, String> {
        if let Some(parent) = options.output_log.as_ref().and_then(|p| p.parent()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("creating output log directory: {}", e))?;
        }
        Ok(SystemRunner {
            workdir: Some(self.workdir.clone().into()),
            output_log: options.output_log.clone(),
        })
    }
}
