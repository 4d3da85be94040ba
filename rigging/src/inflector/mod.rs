//! Naming variants for resource names
//!
//! A single logical name such as `invoice_item` or `InvoiceItem` fans out into
//! every form the generated code needs: struct names, table names, route
//! segments and display titles.
//!
//! Inflection is total. The irregular table is consulted first, then ordered
//! suffix rules, then identity. Multi-token names only inflect their last
//! token.
//!
//! # Examples
//!
//! ```
//! use rigging::inflector::{pluralize, singularize, ResourceName};
//!
//! assert_eq!(pluralize("category"), "categories");
//! assert_eq!(singularize("people"), "person");
//!
//! let name = ResourceName::parse("InvoiceItem").unwrap();
//! let variants = name.variants();
//! assert_eq!(variants.singular_capitalized, "InvoiceItem");
//! assert_eq!(variants.storage_identifier, "invoice_items");
//! ```

mod rules;

use crate::error::{Error, Result};
use convert_case::{Case, Casing};
use once_cell::sync::OnceCell;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

pub use rules::{IRREGULAR, UNCOUNTABLE};

/// Validated resource identifier, normalized to lower-case tokens
#[derive(Debug, Clone)]
pub struct ResourceName {
    raw: String,
    tokens: Vec<String>,
    cached: OnceCell<NamingVariantSet>,
}

/// Every naming form derived from one [`ResourceName`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingVariantSet {
    /// `invoiceitem`
    pub singular_lower: String,
    /// `InvoiceItem`
    pub singular_capitalized: String,
    /// `invoiceitems`
    pub plural_lower: String,
    /// `InvoiceItems`
    pub plural_capitalized: String,
    /// `invoice_items`, the table name
    pub storage_identifier: String,
    /// `invoice_item`, module and file stem
    pub singular_snake: String,
    /// `invoice_items`
    pub plural_snake: String,
    /// `invoice-items`, route path segment
    pub plural_kebab: String,
    /// `Invoice Item`
    pub title: String,
    /// `Invoice Items`
    pub plural_title: String,
}

impl ResourceName {
    /// Validate and tokenize a user-supplied name
    ///
    /// Accepts snake case, camel case and Pascal case input. Digits stay
    /// attached to the token they follow.
    ///
    /// ```
    /// use rigging::inflector::ResourceName;
    ///
    /// let name = ResourceName::parse("invoice_item").unwrap();
    /// assert_eq!(name.tokens(), &["invoice", "item"]);
    /// assert!(ResourceName::parse("9lives").is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason| Error::InvalidResourceName {
            name: input.to_string(),
            reason,
        };

        let Some(first) = input.chars().next() else {
            return Err(invalid("name cannot be empty"));
        };
        if !first.is_ascii_alphabetic() {
            return Err(invalid("must start with a letter"));
        }
        if !input.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(invalid("only ASCII letters, digits and underscores are allowed"));
        }

        let mut tokens: Vec<String> = Vec::new();
        for token in input.to_case(Case::Snake).split('_') {
            if token.is_empty() {
                continue;
            }
            let token = token.to_ascii_lowercase();
            match tokens.last_mut() {
                Some(previous) if token.chars().all(|c| c.is_ascii_digit()) => {
                    previous.push_str(&token);
                }
                _ => tokens.push(token),
            }
        }

        if tokens.is_empty() {
            return Err(invalid("name cannot be empty"));
        }

        Ok(Self {
            raw: input.to_string(),
            tokens,
            cached: OnceCell::new(),
        })
    }

    /// Name as the user typed it
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Normalized lower-case tokens
    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Naming variants, computed on first use
    pub fn variants(&self) -> &NamingVariantSet {
        self.cached.get_or_init(|| NamingVariantSet::derive(&self.tokens))
    }
}

impl PartialEq for ResourceName {
    fn eq(&self, other: &Self) -> bool {
        self.tokens == other.tokens
    }
}

impl Eq for ResourceName {}

impl Hash for ResourceName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tokens.hash(state);
    }
}

impl FromStr for ResourceName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl NamingVariantSet {
    fn derive(tokens: &[String]) -> Self {
        let (last, head) = tokens
            .split_last()
            .map_or(("", &[][..]), |(last, head)| (last.as_str(), head));

        let singular_last = singularize(last);
        let plural_last = pluralize(&singular_last);

        let singular: Vec<&str> = head
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(singular_last.as_str()))
            .collect();
        let plural: Vec<&str> = head
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(plural_last.as_str()))
            .collect();

        let capitalized = |parts: &[&str]| parts.iter().map(|p| capitalize(p)).collect::<String>();
        let titled = |parts: &[&str]| {
            parts
                .iter()
                .map(|p| capitalize(p))
                .collect::<Vec<_>>()
                .join(" ")
        };

        Self {
            singular_lower: singular.concat(),
            singular_capitalized: capitalized(&singular),
            plural_lower: plural.concat(),
            plural_capitalized: capitalized(&plural),
            storage_identifier: plural.join("_"),
            singular_snake: singular.join("_"),
            plural_snake: plural.join("_"),
            plural_kebab: plural.join("-"),
            title: titled(&singular),
            plural_title: titled(&plural),
        }
    }

    /// Column name of a foreign key pointing at this resource (`invoice_item_id`)
    #[must_use]
    pub fn foreign_key(&self) -> String {
        format!("{}_id", self.singular_snake)
    }

    /// Template variables keyed by field name
    #[must_use]
    pub fn to_variables(&self) -> BTreeMap<String, String> {
        [
            ("singular_lower", &self.singular_lower),
            ("singular_capitalized", &self.singular_capitalized),
            ("plural_lower", &self.plural_lower),
            ("plural_capitalized", &self.plural_capitalized),
            ("storage_identifier", &self.storage_identifier),
            ("singular_snake", &self.singular_snake),
            ("plural_snake", &self.plural_snake),
            ("plural_kebab", &self.plural_kebab),
            ("title", &self.title),
            ("plural_title", &self.plural_title),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .chain(std::iter::once((
            "foreign_key".to_string(),
            self.foreign_key(),
        )))
        .collect()
    }
}

/// Derive all naming variants for a resource
#[must_use]
pub fn variants(name: &ResourceName) -> NamingVariantSet {
    name.variants().clone()
}

/// Plural form of a single word
///
/// ```
/// use rigging::inflector::pluralize;
///
/// assert_eq!(pluralize("box"), "boxes");
/// assert_eq!(pluralize("Person"), "People");
/// assert_eq!(pluralize("sheep"), "sheep");
/// ```
#[must_use]
pub fn pluralize(word: &str) -> String {
    inflect(word, |lower| {
        if let Some((_, plural)) = IRREGULAR
            .iter()
            .find(|(singular, plural)| *singular == lower || *plural == lower)
        {
            return (*plural).to_string();
        }
        rules::PLURAL_RULES
            .iter()
            .find_map(|rule| rule.apply(lower))
            .unwrap_or_else(|| lower.to_string())
    })
}

/// Singular form of a single word
///
/// A rule's result is kept only if it pluralizes back to the input. Words
/// that are already singular come back unchanged.
///
/// ```
/// use rigging::inflector::singularize;
///
/// assert_eq!(singularize("categories"), "category");
/// assert_eq!(singularize("statuses"), "status");
/// assert_eq!(singularize("cookies"), "cookie");
/// assert_eq!(singularize("post"), "post");
/// assert_eq!(singularize("canvas"), "canvas");
/// ```
#[must_use]
pub fn singularize(word: &str) -> String {
    inflect(word, |lower| {
        if let Some((singular, _)) = IRREGULAR
            .iter()
            .find(|(singular, plural)| *singular == lower || *plural == lower)
        {
            return (*singular).to_string();
        }
        rules::SINGULAR_EXCEPTIONS
            .iter()
            .chain(rules::SINGULAR_RULES.iter())
            .filter_map(|rule| rule.apply(lower))
            .find(|candidate| candidate == lower || pluralize(candidate) == lower)
            .unwrap_or_else(|| lower.to_string())
    })
}

/// Whether a word is handled by the irregular or uncountable tables
#[must_use]
pub fn is_irregular(word: &str) -> bool {
    let lower = word.to_ascii_lowercase();
    UNCOUNTABLE.contains(&lower.as_str())
        || IRREGULAR
            .iter()
            .any(|(singular, plural)| *singular == lower || *plural == lower)
}

fn inflect(word: &str, transform: impl FnOnce(&str) -> String) -> String {
    if word.is_empty() {
        return String::new();
    }
    let lower = word.to_ascii_lowercase();
    if UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }
    restore_case(word, &transform(&lower))
}

fn restore_case(original: &str, inflected: &str) -> String {
    let letters: Vec<char> = original.chars().filter(char::is_ascii_alphabetic).collect();
    if letters.len() > 1 && letters.iter().all(char::is_ascii_uppercase) {
        return inflected.to_ascii_uppercase();
    }
    if original.starts_with(|c: char| c.is_ascii_uppercase()) {
        return capitalize(inflected);
    }
    inflected.to_string()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_ascii_uppercase().to_string() + chars.as_str()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_snake_case() {
        let name = ResourceName::parse("invoice_item").unwrap();
        assert_eq!(name.tokens(), &["invoice", "item"]);
    }

    #[test]
    fn test_parse_pascal_case() {
        let name = ResourceName::parse("InvoiceItem").unwrap();
        assert_eq!(name.tokens(), &["invoice", "item"]);
        assert_eq!(name, ResourceName::parse("invoice_item").unwrap());
    }

    #[test]
    fn test_parse_keeps_digits_on_token() {
        let name = ResourceName::parse("address2").unwrap();
        assert_eq!(name.tokens(), &["address2"]);
    }

    #[test]
    fn test_parse_rejects_invalid() {
        assert!(ResourceName::parse("").is_err());
        assert!(ResourceName::parse("_post").is_err());
        assert!(ResourceName::parse("blog-post").is_err());
        assert!(ResourceName::parse("café").is_err());
        assert!(matches!(
            ResourceName::parse("1st"),
            Err(Error::InvalidResourceName { .. })
        ));
    }

    #[test]
    fn test_variants_category() {
        let name = ResourceName::parse("category").unwrap();
        let v = name.variants();
        assert_eq!(v.singular_lower, "category");
        assert_eq!(v.singular_capitalized, "Category");
        assert_eq!(v.plural_lower, "categories");
        assert_eq!(v.plural_capitalized, "Categories");
        assert_eq!(v.storage_identifier, "categories");
    }

    #[test]
    fn test_variants_multi_token() {
        let name = ResourceName::parse("invoice_item").unwrap();
        let v = name.variants();
        assert_eq!(v.singular_lower, "invoiceitem");
        assert_eq!(v.singular_capitalized, "InvoiceItem");
        assert_eq!(v.plural_lower, "invoiceitems");
        assert_eq!(v.plural_capitalized, "InvoiceItems");
        assert_eq!(v.storage_identifier, "invoice_items");
        assert_eq!(v.plural_kebab, "invoice-items");
        assert_eq!(v.title, "Invoice Item");
        assert_eq!(v.plural_title, "Invoice Items");
        assert_eq!(v.foreign_key(), "invoice_item_id");
    }

    #[test]
    fn test_variants_from_plural_input() {
        let name = ResourceName::parse("sales_people").unwrap();
        let v = name.variants();
        assert_eq!(v.singular_capitalized, "SalesPerson");
        assert_eq!(v.storage_identifier, "sales_people");
    }

    #[test]
    fn test_variants_are_cached() {
        let name = ResourceName::parse("post").unwrap();
        assert!(std::ptr::eq(name.variants(), name.variants()));
        assert_eq!(variants(&name), *name.variants());
    }

    #[test]
    fn test_to_variables_contains_all_forms() {
        let vars = ResourceName::parse("post").unwrap().variants().to_variables();
        assert_eq!(vars.get("singular_capitalized").unwrap(), "Post");
        assert_eq!(vars.get("storage_identifier").unwrap(), "posts");
        assert_eq!(vars.get("foreign_key").unwrap(), "post_id");
        assert_eq!(vars.len(), 11);
    }

    #[test]
    fn test_pluralize_rules() {
        let cases = [
            ("post", "posts"),
            ("category", "categories"),
            ("day", "days"),
            ("box", "boxes"),
            ("church", "churches"),
            ("wish", "wishes"),
            ("class", "classes"),
            ("bus", "buses"),
            ("status", "statuses"),
            ("quiz", "quizzes"),
            ("hero", "heroes"),
            ("photo", "photos"),
            ("knife", "knives"),
            ("wolf", "wolves"),
            ("analysis", "analyses"),
            ("matrix", "matrices"),
            ("index", "indices"),
            ("query", "queries"),
        ];
        for (singular, plural) in cases {
            assert_eq!(pluralize(singular), plural, "pluralize({singular})");
            assert_eq!(singularize(plural), singular, "singularize({plural})");
        }
    }

    #[test]
    fn test_irregulars_both_directions() {
        assert_eq!(pluralize("person"), "people");
        assert_eq!(pluralize("people"), "people");
        assert_eq!(singularize("people"), "person");
        assert_eq!(singularize("children"), "child");
        assert_eq!(pluralize("datum"), "data");
    }

    #[test]
    fn test_uncountable() {
        for word in ["sheep", "series", "species", "metadata"] {
            assert_eq!(pluralize(word), word);
            assert_eq!(singularize(word), word);
        }
    }

    #[test]
    fn test_case_is_preserved() {
        assert_eq!(pluralize("Category"), "Categories");
        assert_eq!(pluralize("Child"), "Children");
        assert_eq!(pluralize("BOX"), "BOXES");
        assert_eq!(singularize("Posts"), "Post");
    }

    #[test]
    fn test_empty_word() {
        assert_eq!(pluralize(""), "");
        assert_eq!(singularize(""), "");
    }

    #[test]
    fn test_database_singular() {
        assert_eq!(singularize("databases"), "database");
        assert_eq!(pluralize("database"), "databases");
    }

    #[test]
    fn test_round_trip_common_endings() {
        let cases = [
            ("focus", "focuses"),
            ("circus", "circuses"),
            ("virus", "viruses"),
            ("cookie", "cookies"),
            ("movie", "movies"),
            ("pie", "pies"),
            ("tie", "ties"),
            ("fly", "flies"),
            ("house", "houses"),
            ("cause", "causes"),
            ("excuse", "excuses"),
            ("canvas", "canvases"),
            ("gas", "gases"),
            ("lens", "lenses"),
            ("alias", "aliases"),
            ("atlas", "atlases"),
            ("buzz", "buzzes"),
            ("cache", "caches"),
            ("archive", "archives"),
            ("video", "videos"),
        ];
        for (singular, plural) in cases {
            assert_eq!(pluralize(singular), plural, "pluralize({singular})");
            assert_eq!(singularize(plural), singular, "singularize({plural})");
            assert_eq!(singularize(singular), singular, "singularize({singular})");
        }
    }

    #[test]
    fn test_variants_keep_trailing_s() {
        for (name, capitalized, table) in [
            ("canvas", "Canvas", "canvases"),
            ("gas", "Gas", "gases"),
            ("lens", "Lens", "lenses"),
            ("alias", "Alias", "aliases"),
            ("status", "Status", "statuses"),
            ("fortune_cookie", "FortuneCookie", "fortune_cookies"),
        ] {
            let resource = ResourceName::parse(name).unwrap();
            let v = resource.variants();
            assert_eq!(v.singular_capitalized, capitalized, "{name}");
            assert_eq!(v.storage_identifier, table, "{name}");
        }
    }

    /// Stems end in a consonant that no suffix rule reacts to on its own
    fn regular_noun() -> impl Strategy<Value = String> {
        let ending = prop_oneof![
            Just(""),
            Just("y"),
            Just("ch"),
            Just("sh"),
            Just("x"),
            Just("ss"),
            Just("us"),
            Just("z"),
        ];
        ("[a-z]{1,6}[bcdfgklmnprtv]", ending).prop_map(|(stem, ending)| format!("{stem}{ending}"))
    }

    proptest! {
        #[test]
        fn prop_regular_nouns_round_trip(word in regular_noun()) {
            prop_assume!(!is_irregular(&word));
            let plural = pluralize(&word);
            prop_assume!(!rules::SINGULAR_EXCEPTIONS.iter().any(|r| r.matches(&plural)));

            prop_assert_eq!(singularize(&plural), word.clone());
            prop_assert_eq!(singularize(&word), word.clone());
            prop_assert_eq!(pluralize(&singularize(&plural)), plural);
        }

        #[test]
        fn prop_inflection_is_total(word in "[A-Za-z]{0,12}") {
            let _ = pluralize(&word);
            let _ = singularize(&word);
        }
    }
}
