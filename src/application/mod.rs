//! Application services: listing selection, pagination and write actions.

pub mod error;
pub mod follow;
pub mod listing;
pub mod pagination;
pub mod posts;
pub mod repos;
pub mod viewer;
