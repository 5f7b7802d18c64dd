//! Dairy Ration Library
//!
//! Nutrient intake aggregation for dairy cattle rations: per-feed component
//! intakes from a feed library, summed into a whole-diet row.

pub mod build_info;
pub mod db;
pub mod input;
pub mod models;
pub mod nutrition;
