//! Resoconto turns structured event notes into downloadable PDF summary
//! reports, delivered directly or through a single-use retrieval link.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
