//! User-facing surfaces: buttons, the headless page, the settings popup

pub mod button;
pub mod headless;
pub mod popup;
