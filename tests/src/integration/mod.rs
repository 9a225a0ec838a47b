//! Cross-component flows.

pub mod live;
pub mod pipeline;
