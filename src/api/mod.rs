pub mod endpoints;
pub mod middleware;
pub mod proxy;
pub mod rest;
pub mod state;
