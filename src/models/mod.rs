pub mod entities;
pub mod entity_store;
pub mod loaders;
pub mod pending;

pub use entities::{
    Case, CaseRef, CaseResult, CreatedRef, EntityKind, ProjectRef, RunRef, Section, SectionRef,
    Suite, SuiteMode, SuiteRef,
};
pub use entity_store::EntityStore;
pub use loaders::{load_toml_to_suite, ResultParser, TomlResultParser};
pub use pending::{CaseKey, ChunkKey, Completed, PendingBody, SectionKey};
