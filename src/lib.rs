//! Recruiting pipeline core: jobs, candidates, assessments and responses in
//! an embedded store, served through a simulated API with latency and random
//! failures, and a typed client on top.

pub mod chaos;
pub mod client;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod models;
pub mod query;
pub mod validation;
