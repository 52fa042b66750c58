pub mod api;
pub mod categorizer;
pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod services;
pub mod sources;
pub mod storage;
pub mod text;
pub mod worker;
