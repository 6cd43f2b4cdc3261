pub mod checked;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod identity;

pub use checked::*;
pub use config::Context;
pub use error::{Error, Result};
