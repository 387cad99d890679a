//! Campus Auth Server Library
//!
//! This library exports the core modules for the multi-tenant
//! credential and session service.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
pub mod users;
