pub use crate::errors::{ErrorCategory, HookError, RunbookError};
pub use crate::hooks::{standard_registry, ArgMap, HookRegistry};
pub use crate::run::{Run, Status};
pub use crate::spec::{AssertSpec, Format, StepSpec, TestSpec};
pub use crate::step::Step;
pub use crate::store::{FileStore, MemoryStore, Store};
pub use crate::suite::{Suite, Summary};
pub use crate::test::Test;

pub mod assertion;
pub mod cli;
pub mod errors;
pub mod expand;
pub mod hooks;
pub mod logging;
pub mod run;
pub mod spec;
pub mod step;
pub mod store;
pub mod suite;
pub mod value;
