pub mod config;
pub mod connection;
pub mod focus;
pub mod history;
pub mod query_client;
pub mod render;
pub mod response;
pub mod result_model;
pub mod scroll;
pub mod session;
