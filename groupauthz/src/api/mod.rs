pub mod authorization;
pub mod error;
pub mod request_path;
pub mod router;
