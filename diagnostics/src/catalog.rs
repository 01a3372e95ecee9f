//! Message templates keyed by diagnostic key
//!
//! Templates use positional placeholders (`{0}`, `{1}`, ...). The catalog is
//! only consulted when a report is rendered, never while rules run.

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct MessageCatalog {
    templates: HashMap<String, String>,
}

impl MessageCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `key = template` lines. Blank lines and lines starting with
    /// `#` or `!` are ignored; later entries replace earlier ones.
    pub fn from_properties(text: &str) -> Self {
        let mut catalog = Self::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            if let Some((key, template)) = line.split_once('=') {
                catalog.insert(key.trim(), template.trim());
            }
        }
        catalog
    }

    pub fn insert(&mut self, key: impl Into<String>, template: impl Into<String>) {
        self.templates.insert(key.into(), template.into());
    }

    /// Add every entry of `other`, replacing existing keys
    pub fn extend(&mut self, other: MessageCatalog) {
        self.templates.extend(other.templates);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.templates.contains_key(key)
    }

    pub fn template(&self, key: &str) -> Option<&str> {
        self.templates.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Render `key` with `params`.
    ///
    /// Unknown keys render as `key: p0, p1`. Placeholders without a
    /// matching parameter are kept verbatim.
    pub fn render(&self, key: &str, params: &[String]) -> String {
        match self.templates.get(key) {
            Some(template) => substitute(template, params),
            None if params.is_empty() => key.to_string(),
            None => format!("{}: {}", key, params.join(", ")),
        }
    }
}

fn substitute(template: &str, params: &[String]) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        output.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let replaced = after.find('}').and_then(|close| {
            let index: usize = after[..close].parse().ok()?;
            let value = params.get(index)?;
            Some((value, close))
        });

        match replaced {
            Some((value, close)) => {
                output.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                output.push('{');
                rest = after;
            }
        }
    }

    output.push_str(rest);
    output
}
