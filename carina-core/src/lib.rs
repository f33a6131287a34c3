//! Carina Core
//!
//! Resource model, schemas and the lifecycle reconciler shared by Carina providers

pub mod clock;
pub mod id;
pub mod lifecycle;
pub mod provider;
pub mod resource;
pub mod schema;
pub mod timeouts;
