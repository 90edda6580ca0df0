pub mod forest_fires;
pub mod proxy;
