use super::Setup;
use crate::logging::Logger;

/// Log every configured installation as resolved for `node`.
pub fn run(log: &Logger, config: &str, node: &str, env_overrides: &[String]) -> Result<(), String> {
    let setup = Setup::load(log, config, env_overrides)?;
    let all = setup.registry.all();
    if all.is_empty() {
        log.warn("no flyway installations configured", &[("config", config)]);
        return Ok(());
    }
    for inst in all {
        let resolved = inst.for_node(node).for_environment(&setup.env);
        let exe = resolved.executable_path();
        let found = if resolved.executable().is_some() { "true" } else { "false" };
        log.info(
            "installation",
            &[
                ("name", &inst.name),
                ("home", &resolved.home),
                ("executable", &exe.display().to_string()),
                ("found", found),
            ],
        );
    }
    Ok(())
}
