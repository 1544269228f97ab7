pub mod config;
pub mod health;
pub mod indexing_status;
pub mod realtime;
