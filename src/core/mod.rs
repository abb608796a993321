//! Core library modules for ciciot-dl
//!
//! Building blocks shared by the CSV, capture and cleanup pipelines.

pub mod config;
pub mod confirm;
pub mod downloader;
pub mod error;
pub mod layout;
pub mod listing;
pub mod merge;
pub mod stream;
pub mod table;
