use daedalus_monitor::{MonitorUpdate, RunReport};

use crate::labels::stage_label;

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable progress lines.
    Text,
    /// One JSON object per update.
    Json,
}

/// Formats one update; `None` means nothing is printed for it.
pub fn render_update(update: &MonitorUpdate, format: OutputFormat) -> Option<String> {
    match format {
        OutputFormat::Text => render_text(update),
        OutputFormat::Json => Some(render_json(update).to_string()),
    }
}

fn render_text(update: &MonitorUpdate) -> Option<String> {
    match update {
        MonitorUpdate::StateChanged { state, .. } => Some(format!("[{state}]")),
        MonitorUpdate::SessionReady { session, .. } => Some(format!(
            "session {} (user {})",
            session.session_id, session.user_id
        )),
        MonitorUpdate::StageEntered { author, .. } => Some(format!("== {}", stage_label(author))),
        MonitorUpdate::EventAppended { event, .. } => Some(format!(
            "   {}  [{}, {} tokens]",
            event.title,
            event.model_version,
            event.usage.total()
        )),
        MonitorUpdate::Completed { .. } => Some("[completed]".to_string()),
        // failures are reported as an alert by the caller
        MonitorUpdate::Failed { .. } => None,
    }
}

fn render_json(update: &MonitorUpdate) -> serde_json::Value {
    let run_id = update.run_id().to_string();
    match update {
        MonitorUpdate::StateChanged { state, .. } => {
            serde_json::json!({"type": "state", "run_id": run_id, "state": state})
        }
        MonitorUpdate::SessionReady { session, .. } => {
            serde_json::json!({"type": "session", "run_id": run_id, "session": session})
        }
        MonitorUpdate::StageEntered { author, .. } => serde_json::json!({
            "type": "stage", "run_id": run_id, "author": author, "label": stage_label(author)
        }),
        MonitorUpdate::EventAppended { event, .. } => {
            serde_json::json!({"type": "event", "run_id": run_id, "event": event})
        }
        MonitorUpdate::Completed { reason, .. } => {
            serde_json::json!({"type": "completed", "run_id": run_id, "reason": reason})
        }
        MonitorUpdate::Failed { failure, .. } => serde_json::json!({
            "type": "failed", "run_id": run_id, "error": failure.to_string()
        }),
    }
}

/// One-paragraph summary printed after a run ends.
pub fn render_summary(report: &RunReport) -> String {
    let usage = report.view.total_usage();
    let stages = report
        .view
        .stages()
        .iter()
        .map(|s| stage_label(s))
        .collect::<Vec<_>>()
        .join(" -> ");
    let mut out = format!(
        "{} events across {} stages ({})\ntokens: prompt {}, candidates {}, thoughts {}",
        report.view.events().len(),
        report.view.stages().len(),
        report.state,
        usage.prompt_tokens,
        usage.candidate_tokens,
        usage.thought_tokens,
    );
    if !stages.is_empty() {
        out.push_str("\nstages: ");
        out.push_str(&stages);
    }
    out
}
