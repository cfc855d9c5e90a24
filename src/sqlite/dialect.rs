//! Identifier quoting and parameter placeholders.

use std::fmt;

/// SQL surface conventions of the target engine.
pub trait Dialect: Send + Sync + fmt::Debug {
    fn quote_identifier(&self, name: &str) -> String;

    /// Placeholder text for the named parameter `name` (without prefix).
    fn parameter(&self, name: &str) -> String;

    /// Statement returning the key generated by the last insert on this connection.
    fn last_insert_id_sql(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn parameter(&self, name: &str) -> String {
        format!(":{name}")
    }

    fn last_insert_id_sql(&self) -> &'static str {
        "SELECT last_insert_rowid();"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_and_escapes() {
        let d = SqliteDialect;
        assert_eq!(d.quote_identifier("order"), "\"order\"");
        assert_eq!(d.quote_identifier("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(d.parameter("p0"), ":p0");
    }
}
