//! Shopfront Core - domain types, business rules and collaborator seams.
//!
//! This crate is shared by every Shopfront component:
//! - `storefront` - Public shop: browse, cart, checkout, account
//! - `admin` - Back-office for products, orders, users and promo codes
//! - `cli` - Operator tooling (catalog seeding, role changes, promo codes)
//!
//! # Architecture
//!
//! All data lives in a hosted realtime database and accounts in a hosted
//! identity service. Both are reached through traits ([`db::Database`],
//! [`auth::IdentityProvider`]) with in-memory implementations for tests and
//! local development. REST clients for the hosted services are behind the
//! `remote` feature so the pure parts stay free of HTTP dependencies.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, money and percentages, emails, status enums
//! - [`models`] - Records and their rules (cart, promo codes, address book)
//! - [`catalog`] - Filtering and sorting the product collection
//! - [`db`] - Database seam and typed repositories
//! - [`auth`] - Identity service seam
//! - [`checkout`] - The stock-reserving checkout sequence

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod catalog;
pub mod checkout;
pub mod db;
pub mod models;
pub mod types;

pub use types::*;
