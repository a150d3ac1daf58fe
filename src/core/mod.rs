//! Framework-agnostic business logic.
//!
//! Every function takes a database connection and, for tenant data, a
//! [`tenant::TenantContext`]; nothing here knows about HTTP.

pub mod ai_model;
pub mod api_key;
pub mod audit;
pub mod communication;
pub mod company;
pub mod compliance;
pub mod content;
pub mod finance;
pub mod geofence;
pub mod inspection;
pub mod journal;
pub mod project;
pub mod risk;
pub mod tenant;
pub mod validate;
pub mod webhook;
