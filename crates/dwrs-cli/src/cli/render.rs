//! Progress bars drawn from aggregator snapshots.

use std::collections::HashMap;

use dwrs_core::config::DwrsConfig;
use dwrs_core::input::TaskRequest;
use dwrs_core::progress::{ProgressSnapshot, ProgressWatcher};
use dwrs_core::task::{TaskId, TransferState, TransferStatus};
use dwrs_core::url_model;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Background task that keeps one bar per file in sync with the run.
pub struct Renderer {
    done: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl Renderer {
    pub fn spawn(cfg: &DwrsConfig, requests: &[TaskRequest], watcher: ProgressWatcher) -> Self {
        let bars = Bars::new(cfg, requests);
        let (done, done_rx) = oneshot::channel();
        let handle = tokio::spawn(render_loop(bars, watcher, done_rx));
        Self { done, handle }
    }

    /// Draws the final state and waits for the bars to settle.
    pub async fn finish(self) {
        let _ = self.done.send(());
        if let Err(e) = self.handle.await {
            tracing::warn!("progress renderer stopped: {}", e);
        }
    }
}

async fn render_loop(mut bars: Bars, mut watcher: ProgressWatcher, mut done: oneshot::Receiver<()>) {
    loop {
        tokio::select! {
            snap = watcher.changed() => match snap {
                Some(snap) => bars.update(&snap),
                None => break,
            },
            _ = &mut done => {
                if let Some(snap) = watcher.current() {
                    bars.update(&snap);
                }
                break;
            }
        }
    }
    bars.finish();
}

struct Bars {
    multi: MultiProgress,
    style: ProgressStyle,
    messages: Vec<String>,
    bars: HashMap<TaskId, ProgressBar>,
}

impl Bars {
    fn new(cfg: &DwrsConfig, requests: &[TaskRequest]) -> Self {
        let style = match ProgressStyle::with_template(&cfg.template) {
            Ok(style) => style,
            Err(e) => {
                tracing::warn!("invalid progress template in config, using default: {}", e);
                ProgressStyle::default_bar()
            }
        };
        let style = if cfg.bar_chars.chars().count() >= 2 {
            style.progress_chars(&cfg.bar_chars)
        } else {
            style
        };
        let messages = requests
            .iter()
            .map(|r| format_message(&cfg.msg_template, r))
            .collect();
        Self {
            multi: MultiProgress::new(),
            style,
            messages,
            bars: HashMap::new(),
        }
    }

    fn update(&mut self, snap: &ProgressSnapshot) {
        for (id, state) in snap.iter() {
            if state.status == TransferStatus::Pending {
                continue;
            }
            let bar = self.bar(id);
            if bar.is_finished() {
                continue;
            }
            if let Some(total) = state.bytes_total {
                bar.set_length(total);
            }
            bar.set_position(state.bytes_transferred);
            if state.status.is_terminal() {
                let msg = finished_message(self.messages.get(id.0), state);
                bar.finish_with_message(msg);
            }
        }
    }

    fn bar(&mut self, id: TaskId) -> ProgressBar {
        let multi = &self.multi;
        let style = &self.style;
        let message = self.messages.get(id.0).cloned().unwrap_or_default();
        self.bars
            .entry(id)
            .or_insert_with(|| {
                let bar = multi.add(ProgressBar::new(0));
                bar.set_style(style.clone());
                bar.set_message(message);
                bar
            })
            .clone()
    }

    fn finish(self) {
        for bar in self.bars.values() {
            if !bar.is_finished() {
                bar.abandon();
            }
        }
    }
}

/// Substitutes `{url}` and `{output}` in the configured message template.
fn format_message(template: &str, request: &TaskRequest) -> String {
    let output = match &request.output {
        Some(p) => p.display().to_string(),
        None => url_model::derive_filename(&request.url),
    };
    template
        .replace("{url}", &request.url)
        .replace("{output}", &output)
}

fn finished_message(base: Option<&String>, state: &TransferState) -> String {
    let base = base.map(String::as_str).unwrap_or("");
    match state.status {
        TransferStatus::Completed => format!("{} done", base),
        TransferStatus::Skipped => format!("{} already complete", base),
        _ => match &state.error {
            Some(e) => format!("{} failed: {}", base, e),
            None => format!("{} failed", base),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn message_template_substitution() {
        let req = TaskRequest::new("https://example.com/a/b.iso", None);
        assert_eq!(
            format_message("{url} → {output}", &req),
            "https://example.com/a/b.iso → b.iso"
        );
        let req = TaskRequest::new("https://example.com/x", Some(PathBuf::from("y.bin")));
        assert_eq!(format_message("[{output}]", &req), "[y.bin]");
    }

    #[test]
    fn skipped_message() {
        let mut state = TransferState::pending().with_status(TransferStatus::Skipped);
        state.bytes_transferred = 10;
        let base = "f.bin".to_string();
        assert_eq!(finished_message(Some(&base), &state), "f.bin already complete");
    }
}
