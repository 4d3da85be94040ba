//! Field-derived template variables

use super::field::{FieldDeclaration, SemanticType};
use super::relationship::Relationship;
use crate::template::Variables;
use std::fmt::Write as _;

/// Variables describing the field list, merged into every artifact
///
/// Line-oriented values (`struct_fields`, `form_inputs`, ...) end each line
/// with a newline so templates can place them at the start of a line.
#[must_use]
pub fn field_variables(fields: &[FieldDeclaration], relationships: &[Relationship]) -> Variables {
    let mut vars = Variables::new();
    let columns: Vec<String> = fields.iter().map(FieldDeclaration::column_name).collect();

    vars.insert("field_list".into(), columns.join(", "));
    vars.insert("column_list".into(), columns.join(", "));
    vars.insert(
        "placeholder_list".into(),
        (1..=fields.len())
            .map(|i| format!("${i}"))
            .collect::<Vec<_>>()
            .join(", "),
    );
    vars.insert(
        "argument_list".into(),
        fields
            .iter()
            .map(|f| format!("{}: {}", f.column_name(), f.rust_type()))
            .collect::<Vec<_>>()
            .join(", "),
    );

    let mut struct_fields = String::new();
    let mut form_fields = String::new();
    let mut bind_list = String::new();
    let mut test_values = String::new();
    let mut form_inputs = String::new();
    let mut table_headers = String::new();
    let mut table_cells = String::new();
    let mut detail_rows = String::new();

    for field in fields {
        let name = field.column_name();
        let label = field.label();
        let rust_type = field.rust_type();

        let _ = writeln!(struct_fields, "    pub {name}: {rust_type},");
        if field.semantic_type == SemanticType::Boolean {
            let _ = writeln!(form_fields, "    #[serde(default)]");
        }
        let _ = writeln!(form_fields, "    pub {name}: {rust_type},");
        let _ = writeln!(bind_list, "        .bind(form.{name})");
        let _ = writeln!(test_values, "        {name}: {},", field.sample_value());
        form_inputs.push_str(&form_input(field, &name, &label));
        let _ = write!(table_headers, "<th>{label}</th>");
        let _ = write!(table_cells, "<td>{}</td>", display_expr(field, &name));
        let _ = writeln!(
            detail_rows,
            "  <dt>{label}</dt><dd>{}</dd>",
            display_expr(field, &name)
        );
    }

    vars.insert("struct_fields".into(), struct_fields);
    vars.insert("form_fields".into(), form_fields);
    vars.insert("bind_list".into(), bind_list);
    vars.insert("test_values".into(), test_values);
    vars.insert("form_inputs".into(), form_inputs);
    vars.insert("table_headers".into(), table_headers);
    vars.insert("table_cells".into(), table_cells);
    vars.insert("detail_rows".into(), detail_rows);
    vars.insert(
        "relationship_list".into(),
        relationships
            .iter()
            .map(|r| format!("(\"{}\", \"{}\")", r.column, r.references_table))
            .collect::<Vec<_>>()
            .join(", "),
    );

    vars
}

fn display_expr(field: &FieldDeclaration, name: &str) -> String {
    if field.is_optional() {
        format!("{{{{ item.{name}|fmt(\"{{:?}}\") }}}}")
    } else {
        format!("{{{{ item.{name} }}}}")
    }
}

fn form_input(field: &FieldDeclaration, name: &str, label: &str) -> String {
    let required = if field.constraints.required && field.semantic_type != SemanticType::Boolean {
        " required"
    } else {
        ""
    };
    let control = match field.input_type() {
        "textarea" => format!("<textarea id=\"{name}\" name=\"{name}\"{required}></textarea>"),
        "checkbox" => format!("<input type=\"checkbox\" id=\"{name}\" name=\"{name}\" value=\"true\">"),
        "number" if field.semantic_type == SemanticType::Decimal => {
            format!("<input type=\"number\" step=\"any\" id=\"{name}\" name=\"{name}\"{required}>")
        }
        input_type => {
            format!("<input type=\"{input_type}\" id=\"{name}\" name=\"{name}\"{required}>")
        }
    };
    format!("  <label for=\"{name}\">{label}</label>\n  {control}\n")
}
