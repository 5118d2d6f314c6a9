use std::collections::HashMap;

/// Variables visible to a build step. Expansion understands `$NAME` and
/// `${NAME}`; references to unknown variables are left untouched.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    pub fn new(vars: HashMap<String, String>) -> Self {
        Self { vars }
    }

    pub fn from_process() -> Self {
        Self::new(std::env::vars().collect())
    }

    /// Apply `KEY=VALUE` overrides on top of the current bindings.
    pub fn with_overrides(mut self, pairs: &[String]) -> Result<Self, String> {
        for pair in pairs {
            let (k, v) = pair
                .split_once('=')
                .ok_or_else(|| format!("invalid --env {:?}: expected KEY=VALUE", pair))?;
            if k.is_empty() {
                return Err(format!("invalid --env {:?}: empty variable name", pair));
            }
            self.vars.insert(k.to_string(), v.to_string());
        }
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.vars.insert(name.to_string(), value.to_string());
    }

    pub fn expand(&self, input: &str) -> String {
        let mut result = String::with_capacity(input.len());
        let bytes = input.as_bytes();
        let len = bytes.len();
        let mut i = 0;
        let mut copied = 0;
        while i < len {
            if bytes[i] == b'$' && i + 1 < len {
                let reference = if bytes[i + 1] == b'{' {
                    parse_braced_var(input, i + 2)
                } else if is_var_start(bytes[i + 1]) {
                    let start = i + 1;
                    let mut end = start + 1;
                    while end < len && is_var_char(bytes[end]) {
                        end += 1;
                    }
                    Some((&input[start..end], end))
                } else {
                    None
                };
                if let Some((name, end)) = reference {
                    result.push_str(&input[copied..i]);
                    match self.vars.get(name) {
                        Some(val) => result.push_str(val),
                        None => result.push_str(&input[i..end]),
                    }
                    i = end;
                    copied = end;
                    continue;
                }
            }
            i += 1;
        }
        result.push_str(&input[copied..]);
        result
    }
}

fn is_var_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_var_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn parse_braced_var(input: &str, start: usize) -> Option<(&str, usize)> {
    let bytes = input.as_bytes();
    if start >= bytes.len() || !is_var_start(bytes[start]) {
        return None;
    }
    let mut end = start + 1;
    while end < bytes.len() && is_var_char(bytes[end]) {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'}' {
        Some((&input[start..end], end + 1))
    } else {
        None
    }
}
