// Library exports for the CliniQ&A web client
// This allows integration tests and the binary to share the modules

pub mod config;
pub mod error;
pub mod extractors;
pub mod identity;
pub mod model;
pub mod remote;
pub mod routes;
pub mod session;
pub mod state;
pub mod view;
