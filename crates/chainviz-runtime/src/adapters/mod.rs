//! # Consumer Adapters
//!
//! Pure bus consumers. None of them writes back into the engine.

pub mod ui_state;

pub use ui_state::{UiState, UiStateHandle, UiStateMirror, MAX_RECENT_BLOCKS, MAX_RECENT_TRANSACTIONS};
