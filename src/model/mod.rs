pub mod apperror;
pub mod config;
pub mod models;
pub mod seed;
pub mod validation;
