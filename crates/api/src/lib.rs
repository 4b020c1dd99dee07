//! Storekeep API library.
//!
//! Order-management JSON service: orders with line items, addresses and
//! metadata, plus user and address lookups, behind bearer-token auth.
//! Exposed as a library so the router can be driven from tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
