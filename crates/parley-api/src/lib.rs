pub mod channels;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod profiles;
pub mod state;
