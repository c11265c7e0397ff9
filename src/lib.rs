pub mod arguments;
pub mod assets;
pub mod classifier;
pub mod clients;
pub mod config;
pub mod errors;
pub mod logger;
pub mod output;
pub mod readers;
pub mod records;
pub mod registry;
pub mod report;
pub mod resolver;
pub mod retry;
pub mod storage; // credential tables (sqlite)
