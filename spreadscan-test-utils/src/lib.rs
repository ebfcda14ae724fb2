//! Mock venue servers for integration-testing the discovery pipeline:
//! scripted REST inventory endpoints and WebSocket ticker servers that
//! speak each venue's dialect.

pub mod inventory;
pub mod rest;
pub mod ws;

pub use inventory::{inventory_body, native_symbol};
pub use rest::{EndpointScript, MockEndpoint};
pub use ws::{MockTickerServer, TickerScript};
