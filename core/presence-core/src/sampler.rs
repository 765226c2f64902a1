//! Per-tick host sampling.
//!
//! Each host query can fail independently. A failure degrades its own field
//! to a default and never aborts the sample; only the project liveness check
//! (done by the supervisor before sampling) is allowed to end the loop.

use crate::config::FALLBACK_PAGE;
use crate::host::HostApp;
use crate::types::{ProjectInfo, RawObservation, RenderProgress};
use tracing::{debug, warn};

/// Job status string the host uses for the job currently being rendered.
pub const RENDERING_STATUS: &str = "Rendering";
pub const UNKNOWN_JOB_LABEL: &str = "Unknown";

pub fn sample<H: HostApp + ?Sized>(host: &mut H, project: &ProjectInfo) -> RawObservation {
    let page = match host.current_page() {
        Ok(page) if !page.trim().is_empty() => page.trim().to_lowercase(),
        Ok(_) => FALLBACK_PAGE.to_string(),
        Err(err) => {
            debug!(error = %err, fallback = FALLBACK_PAGE, "Current page unavailable");
            FALLBACK_PAGE.to_string()
        }
    };

    let timeline = host.current_timeline().unwrap_or_else(|err| {
        debug!(error = %err, "Timeline lookup failed");
        None
    });

    let render_active = match host.is_rendering() {
        Ok(active) => Some(active),
        Err(err) => {
            warn!(error = %err, "Render status query failed; keeping previous render state");
            None
        }
    };

    // Job listing is skipped only when the host says nothing is rendering.
    let render_progress = if render_active == Some(false) {
        None
    } else {
        render_progress(host)
    };

    RawObservation {
        page,
        project_name: project.name.clone(),
        timeline,
        render_active,
        render_progress,
    }
}

/// Progress of the first job whose status is `Rendering`, if any.
pub fn render_progress<H: HostApp + ?Sized>(host: &mut H) -> Option<RenderProgress> {
    let jobs = match host.render_jobs() {
        Ok(jobs) => jobs,
        Err(err) => {
            warn!(error = %err, "Failed to list render jobs");
            return None;
        }
    };

    for job in jobs {
        let status = match host.render_job_status(&job.job_id) {
            Ok(status) => status,
            Err(err) => {
                debug!(job_id = %job.job_id, error = %err, "Render job status unavailable");
                continue;
            }
        };
        if status.job_status.as_deref() != Some(RENDERING_STATUS) {
            continue;
        }

        let percentage = status
            .completion_percentage
            .map(clamp_percentage)
            .unwrap_or(0);
        let job_label = job
            .target_dir
            .filter(|dir| !dir.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_JOB_LABEL.to_string());
        return Some(RenderProgress {
            percentage,
            job_label,
        });
    }

    None
}

fn clamp_percentage(value: f64) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    value.clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeHost;
    use crate::types::{RenderJob, RenderJobStatus, TimelineInfo};

    fn project() -> ProjectInfo {
        ProjectInfo {
            name: "Demo".to_string(),
        }
    }

    fn job(id: &str, dir: Option<&str>, status: &str, pct: f64) -> (RenderJob, RenderJobStatus) {
        (
            RenderJob {
                job_id: id.to_string(),
                target_dir: dir.map(str::to_string),
            },
            RenderJobStatus {
                job_status: Some(status.to_string()),
                completion_percentage: Some(pct),
            },
        )
    }

    #[test]
    fn page_is_lowercased() {
        let mut host = FakeHost::open("Demo");
        host.page = Some("Color".to_string());
        let obs = sample(&mut host, &project());
        assert_eq!(obs.page, "color");
        assert_eq!(obs.project_name, "Demo");
    }

    #[test]
    fn page_failure_falls_back_to_edit() {
        let mut host = FakeHost::open("Demo");
        host.page = None;
        assert_eq!(sample(&mut host, &project()).page, "edit");
    }

    #[test]
    fn timeline_failure_leaves_timeline_absent() {
        let mut host = FakeHost::open("Demo");
        host.timeline = Some(TimelineInfo {
            name: "Sequence01".to_string(),
            frame_rate: Some("24".to_string()),
        });
        host.timeline_error = true;
        assert!(sample(&mut host, &project()).timeline.is_none());
    }

    #[test]
    fn render_status_failure_is_unknown() {
        let mut host = FakeHost::open("Demo");
        host.rendering = None;
        let obs = sample(&mut host, &project());
        assert_eq!(obs.render_active, None);
        assert!(obs.render_progress.is_none());
    }

    #[test]
    fn render_status_failure_still_reads_job_progress() {
        let mut host = FakeHost::open("Demo");
        host.rendering = None;
        host.jobs = Some(vec![job("a", Some("/out/a"), "Rendering", 30.0)]);
        let obs = sample(&mut host, &project());
        assert_eq!(obs.render_active, None);
        assert_eq!(obs.render_progress.map(|p| p.percentage), Some(30));
    }

    #[test]
    fn job_listing_failure_keeps_render_active() {
        let mut host = FakeHost::open("Demo");
        host.rendering = Some(true);
        host.jobs = None;
        let obs = sample(&mut host, &project());
        assert_eq!(obs.render_active, Some(true));
        assert!(obs.render_progress.is_none());
    }

    #[test]
    fn first_rendering_job_wins() {
        let mut host = FakeHost::open("Demo");
        host.rendering = Some(true);
        host.jobs = Some(vec![
            job("a", Some("/out/a"), "Complete", 100.0),
            job("b", Some("/out/b"), "Rendering", 45.7),
            job("c", Some("/out/c"), "Rendering", 10.0),
        ]);
        let progress = sample(&mut host, &project())
            .render_progress
            .expect("progress");
        assert_eq!(progress.percentage, 45);
        assert_eq!(progress.job_label, "/out/b");
    }

    #[test]
    fn no_rendering_job_means_no_progress() {
        let mut host = FakeHost::open("Demo");
        host.rendering = Some(true);
        host.jobs = Some(vec![job("a", None, "Queued", 0.0)]);
        assert!(sample(&mut host, &project()).render_progress.is_none());
    }

    #[test]
    fn missing_target_dir_uses_unknown_label() {
        let mut host = FakeHost::open("Demo");
        host.rendering = Some(true);
        host.jobs = Some(vec![job("a", None, "Rendering", 12.0)]);
        let progress = render_progress(&mut host).expect("progress");
        assert_eq!(progress.job_label, "Unknown");
    }

    #[test]
    fn percentage_is_clamped() {
        assert_eq!(clamp_percentage(140.0), 100);
        assert_eq!(clamp_percentage(-3.0), 0);
        assert_eq!(clamp_percentage(f64::NAN), 0);
        assert_eq!(clamp_percentage(99.9), 99);
    }
}
