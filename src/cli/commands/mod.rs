pub mod config;
pub mod generate;
pub mod interview;
pub mod providers;
pub mod serve;
