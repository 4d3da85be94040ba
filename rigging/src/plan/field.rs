//! Field declarations
//!
//! Fields are written on the command line as `name:type[:modifier]*`.
//!
//! # Types
//!
//! | token                     | column                | Rust type               |
//! |---------------------------|-----------------------|-------------------------|
//! | `string`                  | `VARCHAR(limit)`      | `String`                |
//! | `text`                    | `TEXT`                | `String`                |
//! | `integer`                 | `INTEGER`             | `i32`                   |
//! | `bigint`                  | `BIGINT`              | `i64`                   |
//! | `decimal`                 | `DECIMAL(p,s)`        | `rust_decimal::Decimal` |
//! | `boolean`                 | `BOOLEAN`             | `bool`                  |
//! | `date`                    | `DATE`                | `chrono::NaiveDate`     |
//! | `datetime`                | `TIMESTAMP`           | `chrono::NaiveDateTime` |
//! | `uuid`                    | `UUID`                | `uuid::Uuid`            |
//! | `references:<Resource>`   | `BIGINT` + foreign key | `i64`                  |
//!
//! `belongs_to:<Resource>` is accepted as an alias of `references`.
//!
//! # Modifiers
//!
//! - `required` / `optional`: `NOT NULL` or nullable (`Option<T>`); nullable by default
//! - `unique`, `indexed`
//! - `limit=N`: string length, default 255
//! - `precision=P,S`: decimal precision and scale, default 19,4
//! - `default=V`: column default
//! - `on_delete=cascade|restrict|set_null|no_action`: for references only
//!
//! ```text
//! title:string:required:limit=120
//! price:decimal:precision=10,2:default=0
//! author:references:user:on_delete=set_null
//! ```

use crate::dialect::{CascadePolicy, ColumnSpec, ColumnType, DefaultValue};
use crate::error::{Error, Result};
use convert_case::{Case, Casing};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

/// Column names every generated table defines itself
pub const RESERVED_NAMES: &[&str] = &["id", "created_at", "updated_at"];

const DEFAULT_STRING_LIMIT: u32 = 255;
const DEFAULT_PRECISION: (u8, u8) = (19, 4);
const MAX_PRECISION: u8 = 38;

/// Plain decimal literal: digits with an optional sign and fraction
static DECIMAL_LITERAL: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[+-]?\d+(\.\d+)?$").ok());

/// Semantic type of a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticType {
    /// Bounded string
    String,
    /// Unbounded text
    Text,
    /// 32-bit integer
    Integer,
    /// 64-bit integer
    BigInt,
    /// Fixed-point number
    Decimal,
    /// Boolean
    Boolean,
    /// Calendar date
    Date,
    /// Date and time without zone
    DateTime,
    /// UUID
    Uuid,
    /// Foreign key to another resource
    Reference {
        /// Referenced resource as written (`user`, `InvoiceItem`)
        resource: String,
    },
}

/// Column constraints attached to a field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldConstraints {
    /// `NOT NULL`
    pub required: bool,
    /// Unique index
    pub unique: bool,
    /// Plain index
    pub indexed: bool,
    /// String length limit
    pub limit: Option<u32>,
    /// Decimal precision and scale
    pub precision: Option<(u8, u8)>,
    /// Column default, as written
    pub default_value: Option<String>,
    /// Delete policy for references
    pub on_delete: Option<CascadePolicy>,
}

/// A parsed `name:type[:modifier]*` token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDeclaration {
    /// Field name as written (`title`, `authorId`)
    pub name: String,
    /// Semantic type
    pub semantic_type: SemanticType,
    /// Constraints
    pub constraints: FieldConstraints,
}

impl FieldDeclaration {
    /// Parse a field token
    ///
    /// ```
    /// use rigging::plan::{FieldDeclaration, SemanticType};
    ///
    /// let field = FieldDeclaration::parse("title:string:required").unwrap();
    /// assert_eq!(field.semantic_type, SemanticType::String);
    /// assert!(field.constraints.required);
    /// assert_eq!(field.rust_type(), "String");
    ///
    /// let field = FieldDeclaration::parse("author:references:user").unwrap();
    /// assert_eq!(field.column_name(), "author_id");
    /// ```
    ///
    /// # Errors
    ///
    /// [`Error::InvalidFieldDeclaration`] for a malformed token, a bad name or
    /// modifier, and [`Error::UnknownFieldType`] for an unrecognised type.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidFieldDeclaration {
            input: input.to_string(),
            reason,
        };

        let parts: Vec<&str> = input.split(':').map(str::trim).collect();
        if parts.len() < 2 || parts[1].is_empty() {
            return Err(invalid("expected name:type[:modifier]*".into()));
        }

        let name = parts[0];
        if !name.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
            || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(invalid(format!(
                "field name '{name}' must start with a letter and contain only letters, digits and underscores"
            )));
        }
        let snake = name.to_case(Case::Snake);
        if RESERVED_NAMES.contains(&snake.as_str()) {
            return Err(invalid(format!("'{snake}' is generated for every table")));
        }

        let type_name = parts[1].to_ascii_lowercase();
        let mut rest = parts[2..].iter();
        let semantic_type = match type_name.as_str() {
            "string" | "str" => SemanticType::String,
            "text" => SemanticType::Text,
            "integer" | "int" | "i32" => SemanticType::Integer,
            "bigint" | "i64" => SemanticType::BigInt,
            "decimal" | "numeric" => SemanticType::Decimal,
            "boolean" | "bool" => SemanticType::Boolean,
            "date" => SemanticType::Date,
            "datetime" | "timestamp" => SemanticType::DateTime,
            "uuid" => SemanticType::Uuid,
            "references" | "reference" | "belongs_to" => {
                let resource = rest
                    .next()
                    .filter(|r| !r.is_empty())
                    .ok_or_else(|| invalid(format!("'{type_name}' needs a resource: name:{type_name}:Resource")))?;
                SemanticType::Reference {
                    resource: (*resource).to_string(),
                }
            }
            _ => {
                return Err(Error::UnknownFieldType {
                    field: name.to_string(),
                    type_name: parts[1].to_string(),
                })
            }
        };

        let mut constraints = FieldConstraints::default();
        for modifier in rest {
            let (key, value) = match modifier.split_once('=') {
                Some((key, value)) => (key.trim().to_ascii_lowercase(), Some(value.trim())),
                None => (modifier.to_ascii_lowercase(), None),
            };
            match (key.as_str(), value) {
                ("required", None) => constraints.required = true,
                ("optional", None) => constraints.required = false,
                ("unique", None) => constraints.unique = true,
                ("indexed" | "index", None) => constraints.indexed = true,
                ("limit", Some(value)) => {
                    if semantic_type != SemanticType::String {
                        return Err(invalid("limit applies to string fields only".into()));
                    }
                    let limit = value
                        .parse::<u32>()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or_else(|| invalid(format!("limit '{value}' is not a positive integer")))?;
                    constraints.limit = Some(limit);
                }
                ("precision", Some(value)) => {
                    if semantic_type != SemanticType::Decimal {
                        return Err(invalid("precision applies to decimal fields only".into()));
                    }
                    constraints.precision = Some(parse_precision(value).map_err(invalid)?);
                }
                ("default", Some(value)) => {
                    check_default(&semantic_type, value).map_err(invalid)?;
                    constraints.default_value = Some(value.to_string());
                }
                ("on_delete", Some(value)) => {
                    if !matches!(semantic_type, SemanticType::Reference { .. }) {
                        return Err(invalid("on_delete applies to references only".into()));
                    }
                    constraints.on_delete = Some(CascadePolicy::from_str(value).map_err(invalid)?);
                }
                _ => {
                    return Err(invalid(format!(
                        "unknown modifier '{modifier}'. Valid modifiers: required, optional, unique, indexed, limit=N, precision=P,S, default=V, on_delete=POLICY"
                    )))
                }
            }
        }

        Ok(Self {
            name: name.to_string(),
            semantic_type,
            constraints,
        })
    }

    /// Snake case column and Rust field name
    ///
    /// References get an `_id` suffix unless the name already has one.
    #[must_use]
    pub fn column_name(&self) -> String {
        let snake = self.name.to_case(Case::Snake);
        match self.semantic_type {
            SemanticType::Reference { .. } if !snake.ends_with("_id") => format!("{snake}_id"),
            _ => snake,
        }
    }

    /// Human-readable label (`Published At`)
    #[must_use]
    pub fn label(&self) -> String {
        self.column_name().to_case(Case::Title)
    }

    /// Whether the column may be null
    #[must_use]
    pub const fn is_optional(&self) -> bool {
        !self.constraints.required
    }

    /// Rust type of the generated struct field
    #[must_use]
    pub fn rust_type(&self) -> String {
        let base = match self.semantic_type {
            SemanticType::String | SemanticType::Text => "String",
            SemanticType::Integer => "i32",
            SemanticType::BigInt | SemanticType::Reference { .. } => "i64",
            SemanticType::Decimal => "rust_decimal::Decimal",
            SemanticType::Boolean => "bool",
            SemanticType::Date => "chrono::NaiveDate",
            SemanticType::DateTime => "chrono::NaiveDateTime",
            SemanticType::Uuid => "uuid::Uuid",
        };
        if self.is_optional() {
            format!("Option<{base}>")
        } else {
            base.to_string()
        }
    }

    /// Abstract column type
    #[must_use]
    pub fn column_type(&self) -> ColumnType {
        match self.semantic_type {
            SemanticType::String => ColumnType::String {
                limit: self.constraints.limit.unwrap_or(DEFAULT_STRING_LIMIT),
            },
            SemanticType::Text => ColumnType::Text,
            SemanticType::Integer => ColumnType::Integer,
            SemanticType::BigInt | SemanticType::Reference { .. } => ColumnType::BigInt,
            SemanticType::Decimal => {
                let (precision, scale) = self.constraints.precision.unwrap_or(DEFAULT_PRECISION);
                ColumnType::Decimal { precision, scale }
            }
            SemanticType::Boolean => ColumnType::Boolean,
            SemanticType::Date => ColumnType::Date,
            SemanticType::DateTime => ColumnType::DateTime,
            SemanticType::Uuid => ColumnType::Uuid,
        }
    }

    /// Column definition for `CreateTable`
    ///
    /// Uniqueness is expressed as a separate unique index, not on the column.
    #[must_use]
    pub fn column_spec(&self) -> ColumnSpec {
        let mut column = ColumnSpec::new(self.column_name(), self.column_type());
        if self.constraints.required {
            column = column.not_null();
        }
        if let Some(default) = self.default() {
            column = column.with_default(default);
        }
        column
    }

    /// Typed column default
    #[must_use]
    pub fn default(&self) -> Option<DefaultValue> {
        let value = self.constraints.default_value.as_deref()?;
        Some(match self.semantic_type {
            SemanticType::Boolean => DefaultValue::Bool(value.eq_ignore_ascii_case("true")),
            SemanticType::Integer
            | SemanticType::BigInt
            | SemanticType::Decimal
            | SemanticType::Reference { .. } => DefaultValue::Number(value.to_string()),
            SemanticType::Date | SemanticType::DateTime if is_now(value) => {
                DefaultValue::CurrentTimestamp
            }
            _ => DefaultValue::Text(value.to_string()),
        })
    }

    /// Rust expression of the struct field type, used in generated tests
    #[must_use]
    pub fn sample_value(&self) -> String {
        let value = match self.semantic_type {
            SemanticType::String | SemanticType::Text => {
                format!("\"Sample {}\".to_string()", self.label().to_lowercase())
            }
            SemanticType::Integer | SemanticType::BigInt => "42".to_string(),
            SemanticType::Reference { .. } => "1".to_string(),
            SemanticType::Decimal => "rust_decimal::Decimal::new(1999, 2)".to_string(),
            SemanticType::Boolean => "true".to_string(),
            SemanticType::Date => "chrono::NaiveDate::default()".to_string(),
            SemanticType::DateTime => "chrono::NaiveDateTime::default()".to_string(),
            SemanticType::Uuid => "uuid::Uuid::nil()".to_string(),
        };
        if self.is_optional() {
            format!("Some({value})")
        } else {
            value
        }
    }

    /// HTML input type for the generated form
    #[must_use]
    pub const fn input_type(&self) -> &'static str {
        match self.semantic_type {
            SemanticType::String | SemanticType::Uuid => "text",
            SemanticType::Text => "textarea",
            SemanticType::Integer
            | SemanticType::BigInt
            | SemanticType::Decimal
            | SemanticType::Reference { .. } => "number",
            SemanticType::Boolean => "checkbox",
            SemanticType::Date => "date",
            SemanticType::DateTime => "datetime-local",
        }
    }
}

fn parse_precision(value: &str) -> std::result::Result<(u8, u8), String> {
    let bad = || format!("precision '{value}' must be P,S with 1 <= P <= {MAX_PRECISION} and S <= P");
    let (precision, scale) = value.split_once(',').ok_or_else(bad)?;
    let precision: u8 = precision.trim().parse().map_err(|_| bad())?;
    let scale: u8 = scale.trim().parse().map_err(|_| bad())?;
    if precision == 0 || precision > MAX_PRECISION || scale > precision {
        return Err(bad());
    }
    Ok((precision, scale))
}

fn check_default(semantic_type: &SemanticType, value: &str) -> std::result::Result<(), String> {
    let ok = match semantic_type {
        SemanticType::Boolean => {
            value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false")
        }
        SemanticType::Integer | SemanticType::BigInt | SemanticType::Reference { .. } => {
            value.parse::<i64>().is_ok()
        }
        SemanticType::Decimal => DECIMAL_LITERAL
            .as_ref()
            .is_some_and(|literal| literal.is_match(value)),
        _ => true,
    };
    if ok {
        Ok(())
    } else {
        Err(format!("default '{value}' does not fit the field type"))
    }
}

fn is_now(value: &str) -> bool {
    value.eq_ignore_ascii_case("now") || value.eq_ignore_ascii_case("current_timestamp")
}

impl FromStr for FieldDeclaration {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Text => f.write_str("text"),
            Self::Integer => f.write_str("integer"),
            Self::BigInt => f.write_str("bigint"),
            Self::Decimal => f.write_str("decimal"),
            Self::Boolean => f.write_str("boolean"),
            Self::Date => f.write_str("date"),
            Self::DateTime => f.write_str("datetime"),
            Self::Uuid => f.write_str("uuid"),
            Self::Reference { resource } => write!(f, "references:{resource}"),
        }
    }
}

impl fmt::Display for FieldDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.semantic_type)?;
        let c = &self.constraints;
        if c.required {
            f.write_str(":required")?;
        }
        if c.unique {
            f.write_str(":unique")?;
        }
        if c.indexed {
            f.write_str(":indexed")?;
        }
        if let Some(limit) = c.limit {
            write!(f, ":limit={limit}")?;
        }
        if let Some((precision, scale)) = c.precision {
            write!(f, ":precision={precision},{scale}")?;
        }
        if let Some(default) = &c.default_value {
            write!(f, ":default={default}")?;
        }
        if let Some(policy) = c.on_delete {
            write!(f, ":on_delete={}", policy.as_str())?;
        }
        Ok(())
    }
}
