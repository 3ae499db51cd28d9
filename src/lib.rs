//! Timelines, follow feeds and a short-lived result cache for a small
//! community blogging service.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
