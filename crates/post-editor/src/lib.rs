mod config;
mod error;
mod metadata;
mod payload;
mod schedule;
mod session;
mod slug;

pub use crate::config::*;
pub use crate::error::*;
pub use crate::metadata::*;
pub use crate::payload::*;
pub use crate::schedule::*;
pub use crate::session::*;
pub use crate::slug::*;

pub use buletin_post_core::PostType;
