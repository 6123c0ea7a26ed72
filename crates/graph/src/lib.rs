//! Trellis Graph - type catalog, store abstraction, and resolution layer.
//!
//! This crate is the core of Trellis. It maps a declarative graph-shaped
//! request (a tree of requested fields with arguments) onto a set of store
//! operations, traversing relationships lazily and applying nested-write
//! semantics for creates.
//!
//! # Architecture
//!
//! - [`catalog`] - Static declarations of entity shapes, relations, and the
//!   operations the API accepts
//! - [`request`] - The parsed operation tree handed over by the transport,
//!   plus mutation input shapes
//! - [`store`] - The five-primitive store seam with in-memory and Postgres
//!   implementations
//! - [`resolver`] - Demand-driven execution of operations against a store
//!
//! The transport and schema-validation layer is an external collaborator:
//! this crate receives already-parsed operations and never sees GraphQL
//! wire syntax.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod error;
pub mod request;
pub mod resolver;
pub mod store;

pub use error::GraphError;
pub use resolver::{RelationResolver, Resolver};
