//! Integration tests
//!
//! `router_tests` drive the axum router in-process and never reach the
//! database. `api_tests` need a running server and database and are ignored
//! by default.

mod api_tests;
mod common;
mod router_tests;
