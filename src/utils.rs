pub mod stats;
pub mod truncated_normal;
