//! Protocol module

#![allow(missing_docs)]

pub mod http;
pub mod plist;
pub mod video;
