//! Helpers shared by the dialect modules

use super::{DefaultValue, DialectRules};
use sha2::{Digest, Sha256};

const DIGEST_HEX_LEN: usize = 8;

impl DialectRules {
    /// Quote an identifier, doubling any embedded closing quote
    #[must_use]
    pub fn quote_ident(&self, name: &str) -> String {
        let (open, close) = self.quote;
        let escaped = name.replace(close, &format!("{close}{close}"));
        format!("{open}{escaped}{close}")
    }

    /// Fit a generated name within the identifier limit
    ///
    /// Over-long names keep their leading bytes and gain `_` plus the first
    /// eight hex digits of the full name's SHA-256, so distinct inputs stay
    /// distinct and the output is stable across runs.
    #[must_use]
    pub fn fit_identifier(&self, name: &str) -> String {
        let Some(max) = self.max_identifier_len else {
            return name.to_string();
        };
        if name.len() <= max {
            return name.to_string();
        }
        let digest = Sha256::digest(name.as_bytes());
        let hex: String = digest
            .iter()
            .take(DIGEST_HEX_LEN / 2)
            .map(|b| format!("{b:02x}"))
            .collect();
        let mut cut = max.saturating_sub(DIGEST_HEX_LEN + 1);
        while !name.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}_{hex}", &name[..cut])
    }

    /// `idx_<table>_<col1>_<col2>`, fitted and quoted
    #[must_use]
    pub fn index_name(&self, table: &str, columns: &[String]) -> String {
        self.quote_ident(&self.fit_identifier(&format!("idx_{table}_{}", columns.join("_"))))
    }

    /// `fk_<table>_<column>`, fitted and quoted
    #[must_use]
    pub fn foreign_key_name(&self, table: &str, column: &str) -> String {
        self.quote_ident(&self.fit_identifier(&format!("fk_{table}_{column}")))
    }

    /// Quoted, comma separated column list
    #[must_use]
    pub fn column_list(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// SQL literal for a column default
    #[must_use]
    pub fn literal(&self, value: &DefaultValue) -> String {
        match value {
            DefaultValue::Text(text) => format!("'{}'", text.replace('\'', "''")),
            DefaultValue::Number(number) => number.clone(),
            DefaultValue::Bool(true) => self.true_literal.to_string(),
            DefaultValue::Bool(false) => self.false_literal.to_string(),
            DefaultValue::CurrentTimestamp => "CURRENT_TIMESTAMP".to_string(),
        }
    }
}

/// Shared shape of a non-key column definition: `name TYPE [DEFAULT x] [NOT NULL] [UNIQUE]`
pub(super) fn column_definition(
    rules: &DialectRules,
    name: &str,
    type_sql: &str,
    nullable: bool,
    unique: bool,
    default: Option<&DefaultValue>,
) -> String {
    let mut def = format!("{} {type_sql}", rules.quote_ident(name));
    if let Some(value) = default {
        def.push_str(" DEFAULT ");
        def.push_str(&rules.literal(value));
    }
    if !nullable {
        def.push_str(" NOT NULL");
    }
    if unique {
        def.push_str(" UNIQUE");
    }
    def
}
