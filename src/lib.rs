//! Bookkeeping service for a restaurant's merchandise purchases and operating
//! expenses: record entry, edit reconciliation and a weighted price report.

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod normalization;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod telemetry;
pub mod validation;

pub use routes::build_router;
