//! Irregular nouns and ordered suffix rules
//!
//! Rules are tried top to bottom and the first match wins. Every word falls
//! through to the identity rule, so inflection never fails.

use once_cell::sync::Lazy;
use regex::Regex;

/// Nouns whose plural does not follow any suffix rule (singular, plural)
pub const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("man", "men"),
    ("woman", "women"),
    ("child", "children"),
    ("tooth", "teeth"),
    ("foot", "feet"),
    ("mouse", "mice"),
    ("goose", "geese"),
    ("ox", "oxen"),
    ("leaf", "leaves"),
    ("thief", "thieves"),
    ("loaf", "loaves"),
    ("datum", "data"),
    ("medium", "media"),
    ("criterion", "criteria"),
    ("cactus", "cacti"),
    ("die", "dice"),
];

/// Nouns with identical singular and plural forms
pub const UNCOUNTABLE: &[&str] = &[
    "sheep",
    "fish",
    "deer",
    "series",
    "species",
    "news",
    "equipment",
    "information",
    "rice",
    "money",
    "moose",
    "bison",
    "metadata",
];

/// Compiled suffix rule: pattern plus replacement in `regex` syntax
pub struct Rule {
    pattern: Regex,
    replacement: &'static str,
}

impl Rule {
    fn new(pattern: &str, replacement: &'static str) -> Option<Self> {
        // Patterns are static; a bad one is dropped instead of poisoning the table
        Regex::new(pattern).ok().map(|pattern| Self {
            pattern,
            replacement,
        })
    }

    /// Whether the rule matches `word`
    pub fn matches(&self, word: &str) -> bool {
        self.pattern.is_match(word)
    }

    /// Apply the rule if it matches
    pub fn apply(&self, word: &str) -> Option<String> {
        self.pattern
            .is_match(word)
            .then(|| self.pattern.replace(word, self.replacement).into_owned())
    }
}

fn compile(table: &[(&str, &'static str)]) -> Vec<Rule> {
    table
        .iter()
        .filter_map(|(pattern, replacement)| Rule::new(pattern, replacement))
        .collect()
}

/// Singular to plural, most specific first
pub static PLURAL_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    compile(&[
        (r"(matr|vert|ind)(?:ix|ex)$", "${1}ices"),
        (r"(qui)z$", "${1}zzes"),
        (r"(tomat|potat|her|ech)o$", "${1}oes"),
        (r"(sel|el|shel|hal|wol|cal|scar|dwar)f$", "${1}ves"),
        (r"(kni|wi|\bli)fe$", "${1}ves"),
        (
            r"(analy|ba|diagno|parenthe|progno|synop|the|cri|hypothe|empha|oa)sis$",
            "${1}ses",
        ),
        (r"([^aeiouy]|qu)y$", "${1}ies"),
        (r"(x|ch|ss|sh|s|z)$", "${1}es"),
        (r"$", "s"),
    ])
});

/// Plural to singular for listed nouns that the general rules would get wrong
///
/// Tried before [`SINGULAR_RULES`]. Each entry is anchored on the whole word
/// or on a distinctive stem.
pub static SINGULAR_EXCEPTIONS: Lazy<Vec<Rule>> = Lazy::new(|| {
    compile(&[
        (
            r"^(use|fuse|muse|ruse|excuse|abuse|accuse|refuse|misuse|reuse|recluse)s$",
            "${1}",
        ),
        (
            r"^(alias|atlas|bias|canvas|gas|lens|iris|pancreas|christmas)(?:es)?$",
            "${1}",
        ),
        (r"^(p|t|l|v)ies$", "${1}ie"),
        (
            r"(cook|mov|zomb|rook|hipp|calor|prair|brown|self|smooth|hood|boog|aunt|bird|vegg|newb|goal|sort)ies$",
            "${1}ie",
        ),
        (r"(ou|au)ses$", "${1}se"),
    ])
});

/// Plural to singular, most specific first
///
/// A candidate is only accepted when pluralizing it gives back the input, so
/// a later rule gets a chance when an earlier one overshoots.
pub static SINGULAR_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    compile(&[
        (r"(matr)ices$", "${1}ix"),
        (r"(vert|ind)ices$", "${1}ex"),
        (r"(tomat|potat|her|ech)oes$", "${1}o"),
        (r"(cac|nic|mustac|avalanc|psyc)hes$", "${1}he"),
        (r"(database)s$", "${1}"),
        (
            r"(analy|ba|diagno|parenthe|progno|synop|the|cri|hypothe|empha|oa)ses$",
            "${1}sis",
        ),
        (r"(kni|wi|\bli)ves$", "${1}fe"),
        (r"(sel|el|shel|hal|wol|cal|scar|dwar)ves$", "${1}f"),
        (r"(qui)zzes$", "${1}z"),
        (r"([^aeiouy]|qu)ies$", "${1}y"),
        (r"(x|ch|ss|sh|z)es$", "${1}"),
        (r"(u)ses$", "${1}s"),
        (r"(ss|us|is)$", "${1}"),
        (r"s$", ""),
    ])
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_tables_compile() {
        assert_eq!(PLURAL_RULES.len(), 9);
        assert_eq!(SINGULAR_RULES.len(), 14);
        assert_eq!(SINGULAR_EXCEPTIONS.len(), 5);
    }

    #[test]
    fn test_default_rule_appends_s() {
        let rule = PLURAL_RULES.last().map(|r| r.apply("post"));
        assert_eq!(rule, Some(Some("posts".to_string())));
    }

    #[test]
    fn test_exceptions_are_anchored() {
        assert!(SINGULAR_EXCEPTIONS.iter().any(|r| r.matches("cookies")));
        assert!(!SINGULAR_EXCEPTIONS.iter().any(|r| r.matches("flies")));
        assert!(!SINGULAR_EXCEPTIONS.iter().any(|r| r.matches("glens")));
        assert!(!SINGULAR_EXCEPTIONS.iter().any(|r| r.matches("focuses")));
    }

    #[test]
    fn test_irregular_table_has_no_duplicates() {
        let mut singulars: Vec<_> = IRREGULAR.iter().map(|(s, _)| *s).collect();
        singulars.sort_unstable();
        singulars.dedup();
        assert_eq!(singulars.len(), IRREGULAR.len());
    }
}
