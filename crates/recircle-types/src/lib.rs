//! Wire types shared by the ReCircle API handlers and the database layer.

pub mod api;
pub mod models;
