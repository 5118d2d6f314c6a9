use super::{ExecArgs, Setup};
use crate::job::JobSpec;
use crate::logging::Logger;
use crate::step;

/// Run every step of a job file in order, stopping at the first failure.
pub fn run(log: &Logger, config: &str, job_file: &str, exec: &ExecArgs) -> Result<(), String> {
    let job = JobSpec::load(job_file)?;
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
    let total = job.steps.len().to_string();
    log.info("starting job", &[("job", &job.name), ("steps", &total)]);
    for (i, req) in job.steps.iter().enumerate() {
        let n = (i + 1).to_string();
        log.info("running step", &[("step", &n), ("of", &total)]);
        if let Err(e) = step::perform(req, &ctx) {
            log.error("step failed", &[("step", &n), ("error", &e.to_string())]);
            return Err(format!("job failed at step {} of {}: {}", n, total, e));
        }
    }
    log.info("job completed successfully", &[("job", &job.name)]);
    Ok(())
}
