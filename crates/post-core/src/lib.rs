mod blocks;
mod core;
mod dispatch;
mod format;
mod html;
mod insert;
mod marks;
mod ops;
mod paywall;
mod platform;
mod plugin;
mod serde_value;
mod tracker;
mod tree;

pub use crate::blocks::{ALIGNMENTS, block_alignment};
pub use crate::core::*;
pub use crate::dispatch::*;
pub use crate::format::*;
pub use crate::html::*;
pub use crate::insert::{CHECKLIST_PLACEHOLDER, CODE_PLACEHOLDER, is_checklist_item, table_template};
pub use crate::ops::*;
pub use crate::paywall::*;
pub use crate::platform::*;
pub use crate::plugin::*;
pub use crate::serde_value::*;
pub use crate::tracker::*;
