//! "Watch on ..." button model

use crate::core::page::MountSlot;
use crate::types::{ResolveType, Target};

/// Everything a mount point needs to draw a button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonView {
    pub href: String,
    /// Empty for the icon-only player button
    pub label: String,
    pub theme: &'static str,
}

impl ButtonView {
    pub fn for_target(slot: MountSlot, target: &Target) -> Self {
        let platform = target.platform.settings();
        let label = match slot {
            MountSlot::Player => String::new(),
            MountSlot::Subscribe => match target.kind {
                ResolveType::Channel => format!("Channel on {}", platform.button_text),
                ResolveType::Video => format!("Watch on {}", platform.button_text),
            },
        };

        Self {
            href: target.url(),
            label,
            theme: platform.theme,
        }
    }
}
