//! Acyclic Loader builds a directed acyclic graph of named components and loads them with
//! maximum concurrency.
//!
//! Every component has a constructor which may depend on other components. Dependencies are
//! declared through a dependency record, validated once when the graph is built, and loaded
//! concurrently on demand. Each component is constructed at most once per [`LoaderGraph`].
//!
//! The crate consists of three parts:
//! 1. [`GraphBuilder`] - registers a constructor for every component
//! 2. The dependency graph - validates constructor shapes, dependencies, types and cycles
//! 3. [`LoaderGraph`] - loads and caches components, and derives graphs with separate caches
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use acyclic_loader::{GraphBuilder, Overwrites};
//!
//! acyclic_loader::dependencies! {
//!     struct ServerOptions {
//!         port: Arc<u16> => "Port",
//!     }
//! }
//!
//! let loader = GraphBuilder::new()
//!     .provide("Port", || async { 80_u16 })
//!     .provide_with("Server", |options: ServerOptions| async move {
//!         format!(":{}", options.port)
//!     })
//!     .build()
//!     .unwrap();
//!
//! futures::executor::block_on(async {
//!     let server = loader.load_as::<String>("Server").await.unwrap();
//!     assert_eq!(server.as_str(), ":80");
//!
//!     // Overwriting a component recomputes everything depending on it
//!     let testing = loader
//!         .with_overwrites(Overwrites::new().set("Port", 8080_u16))
//!         .unwrap();
//!     let server = testing.load_as::<String>("Server").await.unwrap();
//!     assert_eq!(server.as_str(), ":8080");
//! });
//! ```

pub mod builder;
pub mod component;
mod dependency_graph;
pub mod errors;
pub mod loader;
pub mod overwrites;
pub mod resolver;
pub mod types;

pub use builder::GraphBuilder;
pub use component::ComponentSpec;
pub use errors::{BindError, DefinitionError, DependencyLoadError, LoadError, OverwriteError};
pub use loader::{LoadStatus, LoaderGraph, Spawner};
pub use overwrites::Overwrites;
pub use resolver::{
    dependencies::{Dependencies, ResolvedDependencies},
    Resolver,
};
pub use types::{DependencyInfo, DynError, Injectable, Instance, TypeInfo};
