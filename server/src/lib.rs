//! REST API for an event-management application: users, events and
//! subscriptions stored in Postgres.

pub mod auth;
pub mod config;
pub mod db;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod state;
pub mod utils;
