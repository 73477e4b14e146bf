pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod core_loop;
pub mod event_log;
pub mod exec;
pub mod logging;
pub mod processor;
pub mod provenance;
pub mod template;
pub mod types;
pub mod verify;
