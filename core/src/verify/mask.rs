use regex::Regex;

use crate::verify::error::{ListError, invalid_mask};

/// File-name mask where `*` and `?` are wildcards and everything else matches literally.
#[derive(Debug, Clone)]
pub struct FileMask {
    raw: String,
    pattern: Regex,
}

impl FileMask {
    pub fn new(mask: &str) -> Result<Self, ListError> {
        if mask.is_empty() {
            return Err(invalid_mask("file mask cannot be empty"));
        }

        let mut expression = String::with_capacity(mask.len() + 2);
        expression.push('^');
        for ch in mask.chars() {
            match ch {
                '*' => expression.push_str(".*"),
                '?' => expression.push('.'),
                other => expression.push_str(&regex::escape(&other.to_string())),
            }
        }
        expression.push('$');

        let pattern = Regex::new(&expression)
            .map_err(|err| invalid_mask(format!("invalid file mask '{mask}': {err}")))?;
        Ok(Self {
            raw: mask.to_string(),
            pattern,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_literal(&self) -> bool {
        !self.raw.contains(['*', '?'])
    }

    pub fn matches(&self, name: &str) -> bool {
        self.pattern.is_match(name)
    }
}
