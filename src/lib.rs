pub mod config;
pub mod domain;
pub mod error;
pub mod forms;
pub mod logging;
pub mod server;
pub mod storage;
pub mod views;
pub mod web;
