//! Fixed configuration: service identity, cadence, and the page tables.
//!
//! None of this is read from disk or flags. `PresenceConfig` exists so tests
//! can shorten the poll interval without touching the constants.

use std::time::Duration;

/// Discord application id the presence is published under.
pub const DISCORD_CLIENT_ID: &str = "1257700837833179136";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 3_000;
pub const LARGE_IMAGE_KEY: &str = "resolve_logo";
pub const LARGE_IMAGE_TEXT: &str = "DaVinci Resolve";
pub const RENDER_ICON_KEY: &str = "render_icon";
/// Page assumed when the host cannot report one.
pub const FALLBACK_PAGE: &str = "edit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageDisplay {
    pub icon: &'static str,
    pub name: &'static str,
}

const PAGES: &[(&str, PageDisplay)] = &[
    ("media", PageDisplay { icon: "media_icon", name: "Media" }),
    ("cut", PageDisplay { icon: "cut_icon", name: "Cut" }),
    ("edit", PageDisplay { icon: "edit_icon", name: "Edit" }),
    ("fusion", PageDisplay { icon: "fusion_icon", name: "Fusion" }),
    ("color", PageDisplay { icon: "color_icon", name: "Color" }),
    ("fairlight", PageDisplay { icon: "fairlight_icon", name: "Fairlight" }),
    ("deliver", PageDisplay { icon: "deliver_icon", name: "Deliver" }),
];

/// Looks up the icon and display name for a (lower-cased) page id.
pub fn page_display(page: &str) -> Option<PageDisplay> {
    PAGES
        .iter()
        .find(|(id, _)| *id == page)
        .map(|(_, display)| *display)
}

#[derive(Debug, Clone)]
pub struct PresenceConfig {
    pub client_id: String,
    pub poll_interval: Duration,
    pub large_image_key: String,
    pub large_image_text: String,
    pub render_icon_key: String,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            client_id: DISCORD_CLIENT_ID.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            large_image_key: LARGE_IMAGE_KEY.to_string(),
            large_image_text: LARGE_IMAGE_TEXT.to_string(),
            render_icon_key: RENDER_ICON_KEY.to_string(),
        }
    }
}
