//! rigging: resource scaffolding and schema migration engine
//!
//! The engine behind the `rig` command. Given a resource name and a list of
//! typed field declarations it produces a coordinated set of artifacts (a
//! migration, a model, handlers, views and tests), writes them as one
//! all-or-nothing unit, and later applies the resulting schema changes to a
//! database through a lock-protected version ledger.
//!
//! # Components
//!
//! - [`inflector`]: naming variants (singular/plural, case forms, table names)
//! - [`template`]: placeholder rendering and idempotent marker merges
//! - [`plan`]: field parsing and the ordered generation plan
//! - [`generate`]: plan execution over a file system with rollback
//! - [`dialect`]: abstract schema operations to dialect-specific SQL
//! - [`migrate`]: migration scripts, the version ledger and the engine
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use rigging::generate::{LocalFileSystem, Orchestrator};
//! use rigging::inflector::ResourceName;
//! use rigging::plan::{ArtifactKind, ArtifactPlanner, FieldDeclaration, PlanContext};
//! use rigging::template::EmbeddedTemplates;
//!
//! # fn main() -> rigging::Result<()> {
//! let resource = ResourceName::parse("category")?;
//! let fields = vec![FieldDeclaration::parse("title:string:required")?];
//!
//! let planner = ArtifactPlanner::new(PlanContext::new("20250101120000"));
//! let plan = planner.plan(&resource, &fields, &ArtifactKind::all())?;
//!
//! let mut orchestrator = Orchestrator::new(
//!     LocalFileSystem::new("."),
//!     Box::new(EmbeddedTemplates),
//! );
//! let files = orchestrator.execute(&plan)?;
//! println!("generated {} files", files.len());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![allow(clippy::missing_errors_doc)]

pub mod dialect;
pub mod error;
pub mod generate;
pub mod inflector;
pub mod migrate;
pub mod plan;
pub mod template;

pub use error::{Error, ErrorClass, Result};

pub mod prelude {
    //! Convenience re-exports for common types and traits
    //!
    //! ```rust
    //! use rigging::prelude::*;
    //! ```

    pub use crate::dialect::{emit, DialectId, SchemaOperation};
    pub use crate::error::{Error, ErrorClass, Result};
    pub use crate::generate::{FileSystem, GeneratedFile, LocalFileSystem, Orchestrator};
    pub use crate::inflector::{NamingVariantSet, ResourceName};
    pub use crate::migrate::{
        FileLedger, MigrationEngine, MigrationScript, SchemaExecutor, VersionLedger,
    };
    pub use crate::plan::{
        ArtifactKind, ArtifactPlanner, FieldDeclaration, GenerationPlan, PlanContext,
    };
    pub use crate::template::{EmbeddedTemplates, Renderer, TemplateSource};
}
