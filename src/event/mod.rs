//! Input decoding and event dispatch.

pub mod dispatch;
pub mod input;
