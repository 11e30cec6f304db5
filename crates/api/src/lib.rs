//! HTTP host for the gatekeeper pipeline: server wiring, middleware chain and
//! request/response mapping.

pub mod app;
pub mod audit;
pub mod authz;
pub mod config;
pub mod middleware;
