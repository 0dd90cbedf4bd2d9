//! Common test utilities
#![allow(dead_code)]

pub mod router_mock;
pub mod test_fixtures;

pub use router_mock::MockRouter;
pub use test_fixtures::*;
