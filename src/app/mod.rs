pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod server;
pub mod storage;
pub mod task_input;
pub mod task_list;
pub mod ui;
