//! UI layer: immediate-mode panels and views over [`crate::state::AppState`].
pub mod map;
pub mod panels;
pub mod plot;
