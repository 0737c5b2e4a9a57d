//! Library exports for the shortener front-end
//!
//! This module exposes internal components for testing and potential library usage.

pub mod analytics;
pub mod api;
pub mod clipboard;
pub mod config;
pub mod database;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod model;
pub mod route;
pub mod session;
pub mod validation;
pub mod view;
