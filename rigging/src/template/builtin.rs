//! Built-in template catalogue
//!
//! Generated code targets an axum + askama + sqlx application. Askama
//! expressions inside view templates are escaped (`\{{ ... }}`) so they pass
//! through placeholder rendering untouched.

/// Data model struct and form input
pub const MODEL: &str = r#"//! {{title}} model
//!
//! @generated by rigging

use serde::{Deserialize, Serialize};

/// A row of the `{{storage_identifier}}` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct {{singular_capitalized}} {
    pub id: i64,
{{struct_fields}}    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

/// Submitted {{title}} form
#[derive(Debug, Clone, Deserialize)]
pub struct {{singular_capitalized}}Form {
{{form_fields}}}

impl {{singular_capitalized}} {
    /// Table backing this model
    pub const TABLE: &'static str = "{{storage_identifier}}";

    /// Foreign keys as (column, referenced table)
    pub const RELATIONSHIPS: &'static [(&'static str, &'static str)] = &[{{relationship_list}}];
}
"#;

/// CRUD request handlers
pub const HANDLER: &str = r#"//! {{title}} handlers
//!
//! @generated by rigging

use askama::Template;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use sqlx::AnyPool;

use crate::models::{{singular_snake}}::{{singular_capitalized}};
use crate::models::{{singular_snake}}::{{singular_capitalized}}Form;

#[derive(Template)]
#[template(path = "{{plural_snake}}/index.html")]
struct IndexView {
    items: Vec<{{singular_capitalized}}>,
}

#[derive(Template)]
#[template(path = "{{plural_snake}}/show.html")]
struct ShowView {
    item: {{singular_capitalized}},
}

#[derive(Template)]
#[template(path = "{{plural_snake}}/form.html")]
struct FormView;

fn render(view: impl Template) -> Response {
    match view.render() {
        Ok(html) => Html(html).into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

/// `GET /{{plural_kebab}}`
pub async fn index(State(pool): State<AnyPool>) -> Response {
    match sqlx::query_as::<_, {{singular_capitalized}}>("SELECT * FROM {{storage_identifier}} ORDER BY id")
        .fetch_all(&pool)
        .await
    {
        Ok(items) => render(IndexView { items }),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

/// `GET /{{plural_kebab}}/{id}`
pub async fn show(State(pool): State<AnyPool>, Path(id): Path<i64>) -> Response {
    match sqlx::query_as::<_, {{singular_capitalized}}>("SELECT * FROM {{storage_identifier}} WHERE id = $1")
        .bind(id)
        .fetch_optional(&pool)
        .await
    {
        Ok(Some(item)) => render(ShowView { item }),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

/// `GET /{{plural_kebab}}/new`
pub async fn new() -> Response {
    render(FormView)
}

/// `POST /{{plural_kebab}}`
pub async fn create(State(pool): State<AnyPool>, Form(form): Form<{{singular_capitalized}}Form>) -> Response {
    let result = sqlx::query("INSERT INTO {{storage_identifier}} ({{column_list}}) VALUES ({{placeholder_list}})")
{{bind_list}}        .execute(&pool)
        .await;
    match result {
        Ok(_) => Redirect::to("/{{plural_kebab}}").into_response(),
        Err(_) => StatusCode::UNPROCESSABLE_ENTITY.into_response(),
    }
}

/// `POST /{{plural_kebab}}/{id}/delete`
pub async fn delete(State(pool): State<AnyPool>, Path(id): Path<i64>) -> Response {
    match sqlx::query("DELETE FROM {{storage_identifier}} WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
    {
        Ok(_) => Redirect::to("/{{plural_kebab}}").into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}
"#;

/// Listing page
pub const VIEW_LIST: &str = r#"{# @generated by rigging #}
{% extends "layout.html" %}

{% block content %}
<h1>{{plural_title}}</h1>
<a href="/{{plural_kebab}}/new">New {{title}}</a>
<table>
  <thead>
    <tr>{{table_headers}}<th></th></tr>
  </thead>
  <tbody>
  {% for item in items %}
    <tr>{{table_cells}}<td><a href="/{{plural_kebab}}/\{{ item.id }}">Show</a></td></tr>
  {% endfor %}
  </tbody>
</table>
{% endblock %}
"#;

/// Detail page
pub const VIEW_SHOW: &str = r#"{# @generated by rigging #}
{% extends "layout.html" %}

{% block content %}
<h1>{{title}} #\{{ item.id }}</h1>
<dl>
{{detail_rows}}</dl>
<form method="post" action="/{{plural_kebab}}/\{{ item.id }}/delete">
  <button type="submit">Delete</button>
</form>
<a href="/{{plural_kebab}}">Back to {{plural_title}}</a>
{% endblock %}
"#;

/// Create form
pub const VIEW_FORM: &str = r#"{# @generated by rigging #}
{% extends "layout.html" %}

{% block content %}
<h1>New {{title}}</h1>
<form method="post" action="/{{plural_kebab}}">
{{form_inputs}}  <button type="submit">Save</button>
</form>
{% endblock %}
"#;

/// Model smoke tests
pub const TEST: &str = r#"//! {{title}} tests
//!
//! @generated by rigging

use {{crate_name}}::models::{{singular_snake}}::{{singular_capitalized}};
use {{crate_name}}::models::{{singular_snake}}::{{singular_capitalized}}Form;

#[test]
fn {{singular_snake}}_table_name() {
    assert_eq!({{singular_capitalized}}::TABLE, "{{storage_identifier}}");
}

#[test]
fn {{singular_snake}}_form_accepts_sample_values() {
    let form = {{singular_capitalized}}Form {
{{test_values}}    };
    let _ = format!("{form:?}");
}
"#;

/// Migration script file; `script` is the serialized operation list
pub const MIGRATION: &str = r"# @generated by rigging
# {{migration_name}}

{{script}}";

/// Seed for `src/models/mod.rs`
pub const MODELS_REGISTRY: &str = r"//! Data models
//!
//! @generated by rigging

// rigging:marker models
";

/// Fragment registering one model module
pub const MODELS_REGISTRY_ENTRY: &str = "pub mod {{singular_snake}};\n";

/// Seed for `src/handlers/mod.rs`
pub const HANDLERS_REGISTRY: &str = r"//! Request handlers
//!
//! @generated by rigging

// rigging:marker handlers
";

/// Fragment registering one handler module
pub const HANDLERS_REGISTRY_ENTRY: &str = "pub mod {{plural_snake}};\n";

/// Seed for `src/routes.rs`
pub const ROUTES: &str = r"//! Route table
//!
//! @generated by rigging

use axum::routing::{get, post};
use axum::Router;
use sqlx::AnyPool;

/// Application routes
pub fn routes() -> Router<AnyPool> {
    Router::new()
        // rigging:marker routes
}
";

/// Fragment adding one resource's routes
pub const ROUTES_ENTRY: &str = r#"        .route("/{{plural_kebab}}", get(crate::handlers::{{plural_snake}}::index).post(crate::handlers::{{plural_snake}}::create))
        .route("/{{plural_kebab}}/new", get(crate::handlers::{{plural_snake}}::new))
        .route("/{{plural_kebab}}/{id}", get(crate::handlers::{{plural_snake}}::show))
        .route("/{{plural_kebab}}/{id}/delete", post(crate::handlers::{{plural_snake}}::delete))
"#;

/// Every built-in template as (id, body)
pub const CATALOGUE: &[(&str, &str)] = &[
    ("model", MODEL),
    ("handler", HANDLER),
    ("view_list", VIEW_LIST),
    ("view_show", VIEW_SHOW),
    ("view_form", VIEW_FORM),
    ("test", TEST),
    ("migration", MIGRATION),
    ("models_registry", MODELS_REGISTRY),
    ("models_registry_entry", MODELS_REGISTRY_ENTRY),
    ("handlers_registry", HANDLERS_REGISTRY),
    ("handlers_registry_entry", HANDLERS_REGISTRY_ENTRY),
    ("routes", ROUTES),
    ("routes_entry", ROUTES_ENTRY),
];

/// Built-in body for a template id
#[must_use]
pub fn lookup(id: &str) -> Option<&'static str> {
    CATALOGUE
        .iter()
        .find(|(candidate, _)| *candidate == id)
        .map(|(_, body)| *body)
}
