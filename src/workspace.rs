use std::path::{Component, Path, PathBuf};

/// Resolve `target` inside the job workspace. Absolute targets and paths
/// that climb out of the workspace are rejected.
pub fn resolve_in_workspace(workspace: &str, target: &str) -> Result<PathBuf, String> {
    if workspace.is_empty() {
        return Err("workspace must not be empty".into());
    }
    if target.is_empty() {
        return Err("target path must not be empty".into());
    }
    let target_path = Path::new(target);
    if target_path.is_absolute() || target_path.has_root() {
        return Err(format!("absolute path not allowed: {:?}", target));
    }
    let cwd = std::env::current_dir().map_err(|e| format!("getting cwd: {}", e))?;
    let root = lexical_clean(&cwd.join(workspace));
    let resolved = lexical_clean(&root.join(target_path));
    if !resolved.starts_with(&root) {
        return Err(format!(
            "path {:?} escapes workspace {:?}",
            target,
            root.display().to_string()
        ));
    }
    Ok(resolved)
}

pub fn lexical_clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            c => out.push(c.as_os_str()),
        }
    }
    out
}
