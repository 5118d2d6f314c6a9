use std::fmt;

/// Placeholder shown wherever a masked argument would be rendered.
pub const MASK: &str = "********";

/// An ordered command line where individual arguments can be flagged as
/// secret. Secret arguments are passed to the process as-is but never
/// rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentList {
    args: Vec<String>,
    masked: Vec<bool>,
}

impl ArgumentList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self.masked.push(false);
        self
    }

    pub fn add_masked(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self.masked.push(true);
        self
    }

    /// Append `-<key>=<value>` unless the value is empty.
    pub fn add_option(&mut self, key: &str, value: &str) -> &mut Self {
        if !value.is_empty() {
            self.add(format!("-{}={}", key, value));
        }
        self
    }

    /// Masked variant of [`ArgumentList::add_option`].
    pub fn add_masked_option(&mut self, key: &str, value: &str) -> &mut Self {
        if !value.is_empty() {
            self.add_masked(format!("-{}={}", key, value));
        }
        self
    }

    pub fn add_tokenized(&mut self, input: &str) -> &mut Self {
        for token in tokenize(input) {
            self.add(token);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.args
    }

    pub fn masked_indices(&self) -> Vec<usize> {
        self.masked
            .iter()
            .enumerate()
            .filter_map(|(i, m)| m.then_some(i))
            .collect()
    }

    pub fn is_masked(&self, index: usize) -> bool {
        self.masked.get(index).copied().unwrap_or(false)
    }

    /// Arguments as they may appear in logs.
    pub fn to_masked_vec(&self) -> Vec<String> {
        self.args
            .iter()
            .enumerate()
            .map(|(i, a)| {
                if self.is_masked(i) {
                    MASK.to_string()
                } else {
                    quote_for_display(a)
                }
            })
            .collect()
    }
}

impl fmt::Display for ArgumentList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_masked_vec().join(" "))
    }
}

fn quote_for_display(arg: &str) -> String {
    if arg.is_empty() {
        return "\"\"".into();
    }
    if arg.chars().any(|c| c.is_whitespace() || c == '"' || c == '\'') {
        format!("\"{}\"", arg.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        arg.to_string()
    }
}

/// Split on whitespace, keeping quoted substrings together. Quotes are
/// removed; inside double quotes a backslash escapes the next character.
/// An unterminated quote runs to the end of the input.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut has_token = false;
    let mut quote: Option<char> = None;
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        match quote {
            Some('"') if c == '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                has_token = true;
            }
            None if c.is_whitespace() => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            None => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        tokens.push(current);
    }
    tokens
}
