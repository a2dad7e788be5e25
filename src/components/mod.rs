//! UI components for the two independently-mounted modules.

pub mod board_grid;
pub mod board_panel;
pub mod controls_panel;
pub mod error_line;
