use crate::compose::{compose, MigrationRequest};
use crate::credentials::CredentialStore;
use crate::env::Environment;
use crate::error::StepError;
use crate::installation::Registry;
use crate::logging::Logger;
use crate::runner::{find_error_marker, ProcessRunner};
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Compose and log the command without running it.
    pub dry_run: bool,
    /// Fail when the captured output contains `Errors:`, even on exit 0.
    pub legacy_error_scan: bool,
    /// File the subprocess output is copied to.
    pub output_log: Option<PathBuf>,
}

impl Options {
    pub fn validate(&self) -> Result<(), String> {
        if self.legacy_error_scan && self.output_log.is_none() {
            return Err("--legacy-error-scan requires --output-log".into());
        }
        Ok(())
    }
}

/// Collaborators shared by every step of a run.
pub struct Context<'a> {
    pub registry: &'a Registry,
    pub store: &'a dyn CredentialStore,
    pub env: &'a Environment,
    pub node: &'a str,
    pub runner: &'a dyn ProcessRunner,
    pub log: &'a Logger,
    pub options: &'a Options,
}

/// Run one Flyway build step: compose, launch, and judge the result.
pub fn perform(req: &MigrationRequest, ctx: &Context<'_>) -> Result<(), StepError> {
    let log = ctx.log;
    log.info(
        "invoking flyway",
        &[("installation", &req.installation), ("command", &req.command)],
    );
    let args = compose(req, ctx.registry, ctx.store, ctx.env, ctx.node).inspect_err(|e| {
        if e.is_fatal_setup() {
            log.error("flyway not started", &[("reason", &e.to_string())]);
        }
    })?;
    for i in args.masked_indices() {
        let arg = &args.as_slice()[i];
        if !log.add_secret(arg.split_once('=').map_or(arg.as_str(), |(_, v)| v)) {
            log.warn("password too short to mask in flyway output", &[]);
        }
    }
    log.info("composed command", &[("command-line", &args.to_string())]);

    if ctx.options.dry_run {
        log.info("dry run, flyway not started", &[]);
        return Ok(());
    }

    let exit_code = ctx.runner.run(&args, log).map_err(StepError::Launch)?;
    log.debug("flyway finished", &[("exit-code", &exit_code.to_string())]);
    if exit_code != 0 {
        return Err(StepError::NonZeroExit(exit_code));
    }

    if ctx.options.legacy_error_scan {
        if let Some(path) = &ctx.options.output_log {
            let found = find_error_marker(path).map_err(|source| StepError::OutputLog {
                path: path.display().to_string(),
                source,
            })?;
            if let Some(line) = found {
                return Err(StepError::LogErrorMarker { line });
            }
        }
    }
    log.info("flyway completed successfully", &[]);
    Ok(())
}
