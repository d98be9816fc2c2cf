mod config;
mod error;
mod format;
mod parse;
mod refresh;
mod timestamp;
mod unit;

pub use crate::config::*;
pub use crate::error::*;
pub use crate::format::*;
pub use crate::parse::*;
pub use crate::refresh::*;
pub use crate::timestamp::*;
pub use crate::unit::*;
