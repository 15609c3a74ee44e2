pub mod error;
pub mod redis;
pub mod vision;
