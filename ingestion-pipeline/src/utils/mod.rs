pub mod pdf;
pub mod thumbnail;
pub mod upload;
