pub mod config;
pub mod error;
pub mod heatmap;
pub mod identity;
