//! Observation + render state → presence snapshot.
//!
//! Render mode takes priority: while a render is active the snapshot shows
//! progress only, with no page or timeline text.

use crate::config::{page_display, PresenceConfig};
use crate::types::{PresenceSnapshot, RawObservation, RenderState};
use chrono::{DateTime, Utc};

pub const STATE_SEPARATOR: &str = " | ";
pub const RENDERING_INDETERMINATE_TEXT: &str = "Rendering in progress…";
pub const RENDERING_SMALL_TEXT: &str = "Rendering";

pub fn build(
    obs: &RawObservation,
    render: RenderState,
    process_started_at: DateTime<Utc>,
    config: &PresenceConfig,
) -> PresenceSnapshot {
    let details = format!("Project: {}", obs.project_name);

    if let RenderState::Active { started_at } = render {
        let (state_text, small_text) = match &obs.render_progress {
            Some(progress) if progress.percentage > 0 => (
                format!("Rendering: {}% complete", progress.percentage),
                format!("Rendering {}%", progress.percentage),
            ),
            _ => (
                RENDERING_INDETERMINATE_TEXT.to_string(),
                RENDERING_SMALL_TEXT.to_string(),
            ),
        };
        return PresenceSnapshot {
            details,
            state_text: Some(state_text),
            large_image_key: config.large_image_key.clone(),
            large_image_text: config.large_image_text.clone(),
            small_image_key: Some(config.render_icon_key.clone()),
            small_image_text: Some(small_text),
            start_timestamp: Some(started_at.timestamp()),
        };
    }

    let page = page_display(&obs.page);
    let mut state_text = page.map(|display| display.name.to_string());
    if let Some(timeline) = &obs.timeline {
        let timeline_text = format!("Timeline: {}", timeline.name);
        state_text = Some(match state_text {
            Some(page_text) => format!("{}{}{}", page_text, STATE_SEPARATOR, timeline_text),
            None => timeline_text,
        });
    }

    PresenceSnapshot {
        details,
        state_text,
        large_image_key: config.large_image_key.clone(),
        large_image_text: config.large_image_text.clone(),
        small_image_key: page.map(|display| display.icon.to_string()),
        small_image_text: page.map(|display| display.name.to_string()),
        start_timestamp: Some(process_started_at.timestamp()),
    }
}
