//! HTTP Surface
//!
//! Router, health probes, and the metrics endpoint. The chat domain's
//! CRUD API lives in a separate REST service; this process only serves
//! the gateway and its operational endpoints.

pub mod handlers;
pub mod routes;
