use crate::args::MASK;
use chrono::Utc;
use std::io::Write;
use std::sync::Mutex;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Level::Debug => write!(f, "DEBUG"),
            Level::Info => write!(f, "INFO"),
            Level::Warn => write!(f, "WARN"),
            Level::Error => write!(f, "ERROR"),
        }
    }
}

impl std::str::FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            _ => Err(format!("unknown log level {:?} (expected debug, info, warn or error)", s)),
        }
    }
}

/// Shortest value [`Logger::add_secret`] will mask inside free text.
pub const MIN_SECRET_LEN: usize = 4;

/// Build log sink. Every line passes through secret masking before it is
/// written, so values registered with [`Logger::add_secret`] never reach
/// the output, even when the subprocess echoes them.
pub struct Logger {
    out: Mutex<Box<dyn Write + Send>>,
    json_mode: Mutex<bool>,
    secrets: Mutex<Vec<String>>,
    level: Level,
}

impl Logger {
    pub fn new(out: Box<dyn Write + Send>, json_mode: bool, level: Level) -> Self {
        Self {
            out: Mutex::new(out),
            json_mode: Mutex::new(json_mode),
            secrets: Mutex::new(Vec::new()),
            level,
        }
    }

    pub fn default_logger() -> Self {
        Self::new(Box::new(std::io::stderr()), false, Level::Info)
    }

    pub fn with_level(level: Level) -> Self {
        Self::new(Box::new(std::io::stderr()), false, level)
    }

    pub fn set_json(&self, enabled: bool) {
        if let Ok(mut j) = self.json_mode.lock() {
            *j = enabled;
        }
    }

    /// Register a value to be masked in every later line. Values shorter
    /// than [`MIN_SECRET_LEN`] characters are refused and `false` is
    /// returned: masking them would mangle ordinary output such as exit codes.
    pub fn add_secret(&self, secret: &str) -> bool {
        if secret.chars().count() < MIN_SECRET_LEN {
            return false;
        }
        if let Ok(mut s) = self.secrets.lock() {
            if !s.iter().any(|x| x == secret) {
                s.push(secret.to_string());
                // longest first so a secret containing another is masked whole
                s.sort_by_key(|x| std::cmp::Reverse(x.len()));
            }
        }
        true
    }

    /// `text` with every registered secret replaced by the mask.
    pub fn mask(&self, text: &str) -> String {
        let Ok(secrets) = self.secrets.lock() else {
            return text.to_string();
        };
        secrets
            .iter()
            .fold(text.to_string(), |acc, s| acc.replace(s.as_str(), MASK))
    }

    fn log(&self, level: Level, msg: &str, kvs: &[(&str, &str)]) {
        if level < self.level {
            return;
        }
        let now = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let json_mode = self.json_mode.lock().map(|j| *j).unwrap_or(false);
        let msg = self.mask(msg);
        let Ok(mut out) = self.out.lock() else {
            return;
        };

        if json_mode {
            let mut map = serde_json::Map::new();
            map.insert("time".into(), serde_json::Value::String(now));
            map.insert("level".into(), serde_json::Value::String(level.to_string()));
            map.insert("msg".into(), serde_json::Value::String(msg));
            for (k, v) in kvs {
                let v = self.mask(&redact_value(k, v));
                map.insert((*k).into(), serde_json::Value::String(v));
            }
            let _ = writeln!(out, "{}", serde_json::Value::Object(map));
        } else {
            let mut line = format!("{} [{}] {}", now, level, msg);
            for (k, v) in kvs {
                line.push_str(&format!(" {}={}", k, self.mask(&redact_value(k, v))));
            }
            let _ = writeln!(out, "{}", line);
        }
    }

    pub fn debug(&self, msg: &str, kvs: &[(&str, &str)]) { self.log(Level::Debug, msg, kvs); }
    pub fn info(&self, msg: &str, kvs: &[(&str, &str)]) { self.log(Level::Info, msg, kvs); }
    pub fn warn(&self, msg: &str, kvs: &[(&str, &str)]) { self.log(Level::Warn, msg, kvs); }
    pub fn error(&self, msg: &str, kvs: &[(&str, &str)]) { self.log(Level::Error, msg, kvs); }
}

const SENSITIVE_KEYS: &[&str] = &[
    "password", "secret", "token", "authorization", "auth", "api_key", "apikey", "credential",
];

pub fn redact_value(key: &str, value: &str) -> String {
    if SENSITIVE_KEYS.contains(&key.to_lowercase().as_str()) {
        if value.is_empty() {
            return String::new();
        }
        return MASK.into();
    }
    value.into()
}
