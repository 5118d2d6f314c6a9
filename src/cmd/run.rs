use super::{ExecArgs, Setup};
use crate::compose::MigrationRequest;
use crate::logging::Logger;
use crate::step;

pub fn run(log: &Logger, config: &str, req: &MigrationRequest, exec: &ExecArgs) -> Result<(), String> {
    if req.command.trim().is_empty() {
        return Err("--command is required".into());
    }
    let mut setup = Setup::load(log, config, &exec.env_overrides)?;
    exec.bind_workspace(&mut setup.env)?;
    let options = exec.step_options()?;
    let runner = exec.runner(&options)?;
    let ctx = step::Context {
        registry: &setup.registry,
        store: &setup.store,
        env: &setup.env,
        node: &exec.node,
        runner: &runner,
        log,
        options: &options,
    };
    step::perform(req, &ctx).map_err(|e| format!("Build step 'Invoke Flyway' failed: {}", e))
}
