// Domain layer - Pure models and algorithms
pub mod entity;
pub mod report;
pub mod slo;
pub mod time_series;
pub mod traffic_light;
