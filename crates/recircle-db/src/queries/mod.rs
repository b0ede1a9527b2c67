//! `impl Database` blocks, one file per feature area.

mod chat;
mod community;
mod events;
mod marketplace;
mod payments;
mod projects;
mod recycling;
mod trade;
mod users;

pub use community::Cluster;
pub use payments::{NewPayment, PaymentUpdate};
pub use projects::NewPledge;
pub use recycling::{NewRecycling, RecyclingOutcome};
