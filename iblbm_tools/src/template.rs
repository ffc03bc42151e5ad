//! `$`-placeholder substitution.
//!
//! Recognized forms:
//! - `${name}` and `$name`, where `name` is `[_A-Za-z][_A-Za-z0-9]*`
//! - `$$`, which renders a literal `$`
//!
//! In [`Mode::Lenient`] a placeholder without a value, or a `$` that starts no
//! placeholder, is copied through unchanged. [`Mode::Strict`] rejects both.

use std::collections::BTreeMap;

use crate::error::{TemplateError, TemplateResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Lenient,
    Strict,
}

/// Placeholder values keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitutions {
    values: BTreeMap<String, String>,
}

impl Substitutions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

enum Placeholder<'a> {
    Escaped,
    Named { name: &'a str, end: usize },
    Invalid,
}

pub fn substitute(source: &str, values: &Substitutions, mode: Mode) -> TemplateResult<String> {
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;

    while let Some(rel) = source[cursor..].find('$') {
        let dollar = cursor + rel;
        out.push_str(&source[cursor..dollar]);

        match parse_placeholder(source, dollar + 1) {
            Placeholder::Escaped => {
                out.push('$');
                cursor = dollar + 2;
            }
            Placeholder::Named { name, end } => {
                match values.get(name) {
                    Some(value) => out.push_str(value),
                    None if mode == Mode::Strict => {
                        return Err(TemplateError::UnknownPlaceholder {
                            name: name.to_string(),
                            offset: dollar,
                        });
                    }
                    None => out.push_str(&source[dollar..end]),
                }
                cursor = end;
            }
            Placeholder::Invalid => {
                if mode == Mode::Strict {
                    return Err(TemplateError::InvalidPlaceholder { offset: dollar });
                }
                out.push('$');
                cursor = dollar + 1;
            }
        }
    }

    out.push_str(&source[cursor..]);
    Ok(out)
}

fn parse_placeholder(source: &str, start: usize) -> Placeholder<'_> {
    let bytes = source.as_bytes();
    match bytes.get(start) {
        Some(b'$') => Placeholder::Escaped,
        Some(b'{') => {
            let name_start = start + 1;
            let len = identifier_len(&bytes[name_start..]);
            let close = name_start + len;
            if len > 0 && bytes.get(close) == Some(&b'}') {
                Placeholder::Named {
                    name: &source[name_start..close],
                    end: close + 1,
                }
            } else {
                Placeholder::Invalid
            }
        }
        Some(_) => {
            let len = identifier_len(&bytes[start..]);
            if len > 0 {
                Placeholder::Named {
                    name: &source[start..start + len],
                    end: start + len,
                }
            } else {
                Placeholder::Invalid
            }
        }
        None => Placeholder::Invalid,
    }
}

fn identifier_len(bytes: &[u8]) -> usize {
    match bytes.first() {
        Some(b) if b.is_ascii_alphabetic() || *b == b'_' => {}
        _ => return 0,
    }
    bytes
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
        .count()
}
