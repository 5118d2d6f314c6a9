use crate::args::ArgumentList;
use crate::credentials::{Credential, CredentialStore};
use crate::env::Environment;
use crate::error::StepError;
use crate::installation::Registry;
use serde::Deserialize;
use std::path::Path;

/// Everything needed to build one Flyway invocation.
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MigrationRequest {
    pub installation: String,
    pub command: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub locations: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub command_line_args: String,
    #[serde(default)]
    pub credentials_id: Option<String>,
}

impl MigrationRequest {
    fn credentials_ref(&self) -> Option<&str> {
        self.credentials_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Build the Flyway command line for `req`.
///
/// Options come first in a fixed order (user, password, url, locations),
/// followed by the extra argument tokens and finally the command tokens.
/// Options whose value is empty after expansion are left out.
pub fn compose(
    req: &MigrationRequest,
    registry: &Registry,
    store: &dyn CredentialStore,
    env: &Environment,
    node: &str,
) -> Result<ArgumentList, StepError> {
    let installation = registry
        .find(&req.installation)
        .ok_or_else(|| StepError::InstallationNotFound {
            name: req.installation.clone(),
        })?
        .for_node(node)
        .for_environment(env);
    let exe = installation
        .executable()
        .ok_or_else(|| StepError::ExecutableNotFound {
            name: installation.name.clone(),
            path: installation.executable_path().display().to_string(),
        })?;

    let credential = match req.credentials_ref() {
        Some(id) => Some(resolve_credential(store, id)?),
        None => None,
    };
    let (username, password) = match credential {
        Some(c) => (c.username, c.password),
        None => (env.expand(&req.username), env.expand(&req.password)),
    };

    let exe = executable_arg(&installation.name, &exe)?;

    let mut args = ArgumentList::new();
    args.add(exe)
        .add_option("user", &username)
        .add_masked_option("password", &password)
        .add_option("url", &env.expand(&req.url))
        .add_option("locations", &env.expand(&req.locations));
    let extra = env.expand(&req.command_line_args);
    if !extra.is_empty() {
        args.add_tokenized(&extra);
    }
    args.add_tokenized(&env.expand(&req.command));
    Ok(args)
}

fn executable_arg(name: &str, exe: &Path) -> Result<String, StepError> {
    exe.to_str()
        .map(str::to_string)
        .ok_or_else(|| StepError::ExecutableNotFound {
            name: name.into(),
            path: format!("{} (path is not valid UTF-8)", exe.display()),
        })
}

fn resolve_credential(store: &dyn CredentialStore, id: &str) -> Result<Credential, StepError> {
    match store.resolve(id) {
        Ok(Some(c)) => Ok(c),
        Ok(None) => Err(StepError::CredentialNotFound { id: id.into() }),
        Err(reason) => Err(StepError::CredentialLookup {
            id: id.into(),
            reason,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::installation::Installation;
    use std::collections::HashMap;
    use tempfile::TempDir;

    struct MapStore(HashMap<String, Credential>);

    impl CredentialStore for MapStore {
        fn resolve(&self, id: &str) -> Result<Option<Credential>, String> {
            if id == "broken" {
                return Err("store unavailable".into());
            }
            Ok(self.0.get(id).cloned())
        }
    }

    fn store() -> MapStore {
        let mut m = HashMap::new();
        m.insert(
            "db".to_string(),
            Credential {
                username: "cred-user".into(),
                password: "cred-pass".into(),
            },
        );
        MapStore(m)
    }

    struct Fixture {
        _dir: TempDir,
        exe: String,
        registry: Registry,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let exe_path = dir.path().join(if cfg!(windows) { "flyway.cmd" } else { "flyway" });
        std::fs::write(&exe_path, "").unwrap();
        let registry = Registry::new(vec![Installation::new(
            "flyway",
            dir.path().to_str().unwrap(),
        )]);
        Fixture {
            exe: exe_path.to_string_lossy().into_owned(),
            _dir: dir,
            registry,
        }
    }

    fn request() -> MigrationRequest {
        MigrationRequest {
            installation: "flyway".into(),
            command: "migrate".into(),
            ..Default::default()
        }
    }

    fn compose_with(fx: &Fixture, req: &MigrationRequest, env: &Environment) -> Result<ArgumentList, StepError> {
        compose(req, &fx.registry, &store(), env, "")
    }

    #[test]
    fn test_basic_example() {
        let fx = fixture();
        let req = MigrationRequest {
            url: "jdbc:h2:mem:test".into(),
            locations: "filesystem:/tmp/m".into(),
            username: "sa".into(),
            ..request()
        };
        let args = compose_with(&fx, &req, &Environment::default()).unwrap();
        assert_eq!(
            args.as_slice(),
            &[
                fx.exe.clone(),
                "-user=sa".into(),
                "-url=jdbc:h2:mem:test".into(),
                "-locations=filesystem:/tmp/m".into(),
                "migrate".into(),
            ]
        );
        assert!(args.masked_indices().is_empty());
    }

    #[test]
    fn test_empty_fields_omitted() {
        let fx = fixture();
        let args = compose_with(&fx, &request(), &Environment::default()).unwrap();
        assert_eq!(args.as_slice(), &[fx.exe.clone(), "migrate".to_string()]);
    }

    #[test]
    fn test_expands_to_empty_omitted() {
        let fx = fixture();
        let mut env = Environment::default();
        env.set("DB_URL", "");
        let req = MigrationRequest {
            url: "${DB_URL}".into(),
            ..request()
        };
        let args = compose_with(&fx, &req, &env).unwrap();
        assert_eq!(args.as_slice().len(), 2);
    }

    #[test]
    fn test_full_order_and_masking() {
        let fx = fixture();
        let mut env = Environment::default();
        env.set("WORKSPACE", "/ws");
        let req = MigrationRequest {
            command: "info  validate".into(),
            url: "jdbc:postgresql://db/app".into(),
            locations: "filesystem:$WORKSPACE/sql".into(),
            username: "app".into(),
            password: "s3cr3t".into(),
            command_line_args: "-X -placeholders.owner=\"Data Team\"".into(),
            ..request()
        };
        let args = compose_with(&fx, &req, &env).unwrap();
        assert_eq!(
            args.as_slice(),
            &[
                fx.exe.clone(),
                "-user=app".into(),
                "-password=s3cr3t".into(),
                "-url=jdbc:postgresql://db/app".into(),
                "-locations=filesystem:/ws/sql".into(),
                "-X".into(),
                "-placeholders.owner=Data Team".into(),
                "info".into(),
                "validate".into(),
            ]
        );
        assert_eq!(args.masked_indices(), vec![2]);
        let shown = args.to_string();
        assert!(!shown.contains("s3cr3t"));
        assert!(shown.contains(" ******** "));
    }

    #[test]
    fn test_credentials_take_precedence() {
        let fx = fixture();
        let req = MigrationRequest {
            username: "literal-user".into(),
            password: "literal-pass".into(),
            credentials_id: Some("db".into()),
            ..request()
        };
        let args = compose_with(&fx, &req, &Environment::default()).unwrap();
        assert_eq!(args.as_slice()[1], "-user=cred-user");
        assert_eq!(args.as_slice()[2], "-password=cred-pass");
        assert!(!args.as_slice().iter().any(|a| a.contains("literal")));
    }

    #[test]
    fn test_empty_credentials_id_uses_literals() {
        let fx = fixture();
        let req = MigrationRequest {
            username: "sa".into(),
            credentials_id: Some(String::new()),
            ..request()
        };
        let args = compose_with(&fx, &req, &Environment::default()).unwrap();
        assert_eq!(args.as_slice()[1], "-user=sa");
    }

    #[test]
    fn test_unknown_credentials() {
        let fx = fixture();
        let req = MigrationRequest {
            credentials_id: Some("missing".into()),
            ..request()
        };
        let err = compose_with(&fx, &req, &Environment::default()).unwrap_err();
        assert!(matches!(err, StepError::CredentialNotFound { ref id } if id == "missing"));
    }

    #[test]
    fn test_credential_lookup_failure() {
        let fx = fixture();
        let req = MigrationRequest {
            credentials_id: Some("broken".into()),
            ..request()
        };
        let err = compose_with(&fx, &req, &Environment::default()).unwrap_err();
        assert!(matches!(err, StepError::CredentialLookup { .. }));
        assert!(err.to_string().contains("store unavailable"));
    }

    #[test]
    fn test_installation_not_found() {
        let fx = fixture();
        let req = MigrationRequest {
            installation: "nope".into(),
            ..request()
        };
        let err = compose_with(&fx, &req, &Environment::default()).unwrap_err();
        assert!(matches!(err, StepError::InstallationNotFound { ref name } if name == "nope"));
    }

    #[test]
    fn test_executable_missing() {
        let dir = TempDir::new().unwrap();
        let registry = Registry::new(vec![Installation::new("flyway", dir.path().to_str().unwrap())]);
        let err = compose(&request(), &registry, &store(), &Environment::default(), "").unwrap_err();
        assert!(matches!(err, StepError::ExecutableNotFound { .. }));
    }

    #[test]
    fn test_relative_home_emits_absolute_executable() {
        let dir = TempDir::new_in(".").unwrap();
        let rel = format!("./{}", dir.path().file_name().unwrap().to_str().unwrap());
        let exe_name = if cfg!(windows) { "flyway.cmd" } else { "flyway" };
        std::fs::write(dir.path().join(exe_name), "").unwrap();
        let registry = Registry::new(vec![Installation::new("flyway", &rel)]);
        let args = compose(&request(), &registry, &store(), &Environment::default(), "").unwrap();
        let exe = Path::new(&args.as_slice()[0]);
        assert!(exe.is_absolute(), "{:?}", exe);
        assert!(exe.exists());
        assert!(exe.ends_with(Path::new(dir.path().file_name().unwrap()).join(exe_name)));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_executable_rejected() {
        use std::os::unix::ffi::OsStrExt;
        let exe = Path::new(std::ffi::OsStr::from_bytes(b"/opt/fw\xff/flyway"));
        let err = executable_arg("fw", exe).unwrap_err();
        assert!(matches!(err, StepError::ExecutableNotFound { .. }));
        assert!(err.to_string().contains("not valid UTF-8"));
        assert_eq!(executable_arg("fw", Path::new("/opt/fw/flyway")).unwrap(), "/opt/fw/flyway");
    }

    #[test]
    fn test_node_specific_home() {
        let fx = fixture();
        let mut inst = Installation::new("flyway", "/does/not/exist");
        inst.node_homes.insert(
            "agent-1".into(),
            fx.registry.all()[0].home.clone(),
        );
        let registry = Registry::new(vec![inst]);
        let args = compose(&request(), &registry, &store(), &Environment::default(), "agent-1").unwrap();
        assert_eq!(args.as_slice()[0], fx.exe);
        assert!(compose(&request(), &registry, &store(), &Environment::default(), "agent-2").is_err());
    }

    #[test]
    fn test_deserialize_request() {
        let req: MigrationRequest = serde_yaml::from_str(
            "installation: flyway\ncommand: migrate\nurl: jdbc:h2:mem:x\ncredentials_id: db\n",
        )
        .unwrap();
        assert_eq!(req.url, "jdbc:h2:mem:x");
        assert_eq!(req.credentials_id.as_deref(), Some("db"));
        assert!(serde_yaml::from_str::<MigrationRequest>("installation: f\ncommand: c\nbogus: 1\n").is_err());
    }
}
