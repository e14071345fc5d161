pub mod connection;
pub mod feed;
pub mod subscription;
