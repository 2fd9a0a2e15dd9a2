pub mod api;
pub mod app_state;
pub mod chain;
pub mod http;
pub mod init_telemetry;
pub mod settings;
