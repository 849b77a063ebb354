//! Core types and trait definitions for the gym booking service.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the domain model, the store capability traits, and the
//! [`EnrollmentService`](service::EnrollmentService) that gates admission to
//! activities.

pub mod activity;
pub mod enrollment;
pub mod error;
pub mod service;
pub mod store;
pub mod user;

pub use error::{Checked, Conflict, Entity, Error, Result};
