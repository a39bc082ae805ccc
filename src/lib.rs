pub mod commands;
pub mod compiler;
pub mod config;
pub mod error;
pub mod ffmpeg;
pub mod metadata;
pub mod staleness;
pub mod tags;
pub mod task;
pub mod worker;
