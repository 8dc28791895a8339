//! Storefront backend: accounts with bearer tokens, a product catalog, a
//! per-user cart embedded in the account record, and image uploads.
//!
//! The [`client`] module is the storefront side: a session-scoped HTTP client
//! and the checkout flow that drains the cart after a simulated payment.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
pub mod upload;
