pub mod analysis;
pub mod boosting;
pub mod config;
pub mod dataset;
pub mod eda;
pub mod events;
pub mod features;
pub mod logistic;
pub mod match_summary;
pub mod matches;
pub mod metrics;
pub mod model;
pub mod preprocess;
pub mod provider;
pub mod simulate;
pub mod split;
pub mod state;
pub mod tracking;
pub mod training;
pub mod tuning;
