//! Sample records and the derived visible-set filter behind the heatmap.

mod filter;
mod sample;

pub use filter::{FilterSet, HeatmapData};
pub use sample::{MicroplasticSample, MicroplasticType};
