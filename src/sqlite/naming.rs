//! Translation between declared names and database identifiers.

use std::fmt;

/// Bidirectional naming strategy.
pub trait NameTranslator: Send + Sync + fmt::Debug {
    /// Declared type/field name to table/column name.
    fn to_database(&self, declared: &str) -> String;

    /// Reverse lookup: table/column name to the declared spelling.
    fn to_declared(&self, database: &str) -> String;
}

/// Names are used exactly as declared.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTranslator;

impl NameTranslator for IdentityTranslator {
    fn to_database(&self, declared: &str) -> String {
        declared.to_string()
    }

    fn to_declared(&self, database: &str) -> String {
        database.to_string()
    }
}

/// `FirstName` <-> `first_name`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnakeCaseTranslator;

impl NameTranslator for SnakeCaseTranslator {
    fn to_database(&self, declared: &str) -> String {
        to_snake_case(declared)
    }

    fn to_declared(&self, database: &str) -> String {
        database
            .split('_')
            .filter(|s| !s.is_empty())
            .map(|segment| {
                let mut chars = segment.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect()
    }
}

pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                None | Some('_') => false,
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                // Acronym followed by a word: "HTTPServer" -> "http_server".
                Some(p) if p.is_uppercase() => next.is_some_and(char::is_lowercase),
                Some(_) => false,
            };
            if boundary {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
