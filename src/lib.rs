pub mod app;
pub mod cnpj_ws;
pub mod config;
pub mod domain;
pub mod error;
pub mod error_log;
pub mod input;
pub mod output;
pub mod store;
