pub mod convert;
pub mod error;
pub mod messages;
pub mod pair;
pub mod resolver;

pub use error::ChatError;
pub use pair::CanonicalPair;
pub use resolver::{Resolution, resolve};
