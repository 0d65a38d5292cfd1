//! # Skill Kernel
//!
//! Binds named, templated functions to pluggable text generators. A caller
//! hands the kernel a [`Content`] node and one or more functions; each
//! function fills in its defaults, checks its required inputs, renders its
//! prompt and asks its generator for a response that is linked back to the
//! input.
//!
//! ## Core Components
//!
//! - **generator**: The backend capability, factories and typed configuration
//! - **template**: Handlebars prompt templates rendered against a context node
//! - **skill**: Parameters, functions, skills and their declarative records
//! - **kernel**: Registries, path lookup and chained calls
//! - **error**: Generator and kernel errors
//!
//! ## Design Philosophy
//!
//! - **Validate First**: A generator is never invoked for an input with missing parameters
//! - **Backends Outside**: Concrete generators are plugged in through factories keyed by a type id
//! - **Read-Only After Setup**: Skills and factories are registered once, then shared

pub mod error;
pub mod generator;
pub mod kernel;
pub mod skill;
pub mod template;

pub use error::*;
pub use generator::*;
pub use kernel::*;
pub use skill::*;
pub use template::*;

pub use context_store::{self, Content, Role, Value};
