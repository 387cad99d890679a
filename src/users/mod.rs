//! User profile and tenant administration
//!
//! Plumbing around the auth core: self-service profile reads/updates
//! and the tenant-scoped admin listing.

mod service;

pub use service::{UsersError, UsersService};
