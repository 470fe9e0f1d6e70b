pub mod config;
pub mod errors;
pub mod frequency;
pub mod hash;
pub mod ingest;
pub mod keys;
pub mod maintenance;
pub mod merge;
pub mod storage;
