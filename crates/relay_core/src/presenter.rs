use crate::poller::{PollState, TIMED_OUT_MESSAGE};
use crate::submission::JobMetrics;
use crate::validate::format_bytes;

/// Terminal outcome of a job, ready for display.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultView {
    Success {
        download_url: String,
        /// Human readable metric lines, e.g. `Size: 2 MB -> 1 MB`.
        summary: Vec<String>,
        metrics: JobMetrics,
    },
    Failure {
        message: String,
    },
    TimedOut {
        message: String,
    },
}

pub fn present(state: &PollState) -> Option<ResultView> {
    match state {
        PollState::Idle | PollState::Polling { .. } => None,
        PollState::Completed(result) => {
            let mut metrics = result.metrics.clone();
            if metrics.compression_ratio.is_none() {
                metrics.compression_ratio = match (metrics.size_before, metrics.size_after) {
                    (Some(before), Some(after)) => compression_ratio(before, after),
                    _ => None,
                };
            }
            Some(ResultView::Success {
                download_url: result.download_url.clone(),
                summary: summarize(&metrics),
                metrics,
            })
        }
        PollState::Failed { message } => Some(ResultView::Failure {
            message: message.clone(),
        }),
        PollState::TimedOut => Some(ResultView::TimedOut {
            message: TIMED_OUT_MESSAGE.to_string(),
        }),
    }
}

/// Percentage saved, rounded to two decimals. Negative when the output grew.
pub fn compression_ratio(before: u64, after: u64) -> Option<f64> {
    if before == 0 {
        return None;
    }
    let ratio = (1.0 - after as f64 / before as f64) * 100.0;
    Some((ratio * 100.0).round() / 100.0)
}

fn summarize(metrics: &JobMetrics) -> Vec<String> {
    let mut lines = Vec::new();
    match (metrics.size_before, metrics.size_after) {
        (Some(before), Some(after)) => {
            lines.push(format!("Size: {} -> {}", format_bytes(before), format_bytes(after)));
        }
        (None, Some(after)) => lines.push(format!("Size: {}", format_bytes(after))),
        _ => {}
    }
    if let Some(ratio) = metrics.compression_ratio {
        if ratio >= 0.0 {
            lines.push(format!("Reduced by {ratio:.2}%"));
        } else {
            lines.push(format!("Grew by {:.2}%", -ratio));
        }
    }
    if let Some(secs) = metrics.processing_time_secs {
        lines.push(format!("Processed in {secs:.1}s"));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::submission::JobResult;

    #[test]
    fn ratio_is_computed_when_server_omits_it() {
        let state = PollState::Completed(JobResult {
            download_url: "/dl/1".to_string(),
            metrics: JobMetrics {
                processing_time_secs: Some(2.44),
                size_before: Some(2 * 1024 * 1024),
                size_after: Some(1024 * 1024),
                compression_ratio: None,
            },
        });
        let Some(ResultView::Success { summary, metrics, .. }) = present(&state) else {
            panic!("expected success view");
        };
        assert_eq!(metrics.compression_ratio, Some(50.0));
        assert_eq!(
            summary,
            vec!["Size: 2 MB -> 1 MB", "Reduced by 50.00%", "Processed in 2.4s"]
        );
    }

    #[test]
    fn ratio_rounds_to_two_decimals() {
        assert_eq!(compression_ratio(3, 2), Some(33.33));
        assert_eq!(compression_ratio(0, 2), None);
    }

    #[test]
    fn non_terminal_states_have_no_result() {
        assert_eq!(present(&PollState::Idle), None);
    }
}
