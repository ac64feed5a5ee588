//! clusterboard: an operator dashboard over the FAQ clustering backend.
//!
//! The library holds everything the `clusterboard` binary drives:
//! - [`model`] and [`store`]: normalized records and the snapshot store
//! - [`view`]: filter, sort, pagination and selection engines
//! - [`analytics`]: aggregations and the fetch log
//! - [`dashboard`]: one store plus one view state, shared by every surface
//! - [`backend`]: the HTTP client and its wire types
//! - [`cli`] and [`web`]: the two surfaces

pub mod analytics;
pub mod backend;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod model;
pub mod store;
pub mod view;
pub mod web;
