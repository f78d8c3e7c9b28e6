// src/services/mod.rs
pub mod browser;
pub mod dates;
pub mod google_oauth;
pub mod rendered;
pub mod resolver;
pub mod sheets;
pub mod store;
pub mod tabular;
