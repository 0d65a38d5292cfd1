//! # Context Store
//!
//! The data model shared by everything that talks to a text generator. A
//! [`Content`] node holds one message (or any structured payload) and,
//! through its predecessor link, the whole conversation that led to it.
//!
//! ## Core Components
//!
//! - **value**: A typed value tree with dot-path navigation
//! - **content**: Context nodes with predecessor fallback and reserved keys
//! - **error**: Conversion and serialization errors
//!
//! ## Design Philosophy
//!
//! - **Path-Addressable**: Every property is reachable through a dot path such as `"foo.bar.baz"`
//! - **History by Reference**: A node links to an already finished predecessor and never mutates it
//! - **Shadowing**: Local values always win over values inherited from older turns

pub mod content;
pub mod error;
pub mod value;

pub use content::*;
pub use error::*;
pub use value::*;
