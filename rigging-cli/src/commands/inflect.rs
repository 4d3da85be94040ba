//! `rig inflect`: show how a name is inflected

use anyhow::Result;
use console::style;
use rigging::inflector::{is_irregular, pluralize, singularize, ResourceName};

/// Print every naming variant of a word
#[derive(Debug, Clone)]
pub struct InflectCommand {
    /// Word or resource name
    pub word: String,
}

impl InflectCommand {
    /// Execute the inflect command
    ///
    /// # Errors
    ///
    /// Returns an error if the word is not a valid resource name.
    pub fn execute(&self) -> Result<()> {
        let name = ResourceName::parse(&self.word)?;
        let v = name.variants();

        println!("\n{} {}", style("Inflections of").cyan().bold(), style(&self.word).green().bold());
        let rows = [
            ("singular_lower", &v.singular_lower),
            ("singular_capitalized", &v.singular_capitalized),
            ("plural_lower", &v.plural_lower),
            ("plural_capitalized", &v.plural_capitalized),
            ("storage_identifier", &v.storage_identifier),
            ("singular_snake", &v.singular_snake),
            ("plural_snake", &v.plural_snake),
            ("plural_kebab", &v.plural_kebab),
            ("title", &v.title),
            ("plural_title", &v.plural_title),
        ];
        for (label, value) in rows {
            println!("  {:<22} {}", style(label).dim(), value);
        }

        let last = name.tokens().last().map_or("", String::as_str);
        println!();
        println!("  {:<22} {}", style("pluralize").dim(), pluralize(last));
        println!("  {:<22} {}", style("singularize").dim(), singularize(last));
        if is_irregular(last) {
            println!("  {}", style("(irregular or uncountable)").yellow());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_word() {
        let cmd = InflectCommand {
            word: "InvoiceItem".into(),
        };
        assert!(cmd.execute().is_ok());
    }

    #[test]
    fn test_invalid_word_is_validation_error() {
        let cmd = InflectCommand {
            word: "1post".into(),
        };
        let err = cmd.execute().unwrap_err();
        assert_eq!(crate::exit::code(&err), 2);
    }
}
