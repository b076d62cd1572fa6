//! Synchronous ingestion: bytes -> lines -> frames -> events -> view.
//!
//! The run task owns one `EventPipeline` per run and only suspends between
//! calls while waiting for the next chunk.

use tracing::debug;

use crate::decoder::FrameDecoder;
use crate::errors::ParseFailure;
use crate::event::{StreamEvent, parse_event};
use crate::frame::{Frame, classify};
use crate::projection::ViewState;

/// Result of ingesting input, in stream order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutput {
    /// A new event entered the log.
    Appended {
        event: StreamEvent,
        stage_entered: bool,
    },
    /// The completion sentinel was seen. Nothing follows it.
    Completed,
}

/// Counters for lines that were dropped without ending the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SkipStats {
    pub malformed: u64,
    pub missing_author: u64,
    pub duplicates: u64,
}

#[derive(Debug, Default)]
pub struct EventPipeline {
    decoder: FrameDecoder,
    view: ViewState,
    skipped: SkipStats,
    completed: bool,
}

impl EventPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one network chunk.
    ///
    /// Once the sentinel has been seen, later lines (even from the same
    /// chunk) are discarded.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<PipelineOutput> {
        if self.completed {
            return Vec::new();
        }
        let mut out = Vec::new();
        for line in self.decoder.feed(chunk) {
            self.ingest_line(&line, &mut out);
            if self.completed {
                break;
            }
        }
        out
    }

    /// Processes the unterminated tail once the stream has ended.
    pub fn finish(&mut self) -> Vec<PipelineOutput> {
        let mut out = Vec::new();
        if self.completed {
            return out;
        }
        if let Some(line) = self.decoder.flush() {
            self.ingest_line(&line, &mut out);
        }
        out
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn into_view(self) -> ViewState {
        self.view
    }

    pub fn skipped(&self) -> SkipStats {
        self.skipped
    }

    fn ingest_line(&mut self, line: &str, out: &mut Vec<PipelineOutput>) {
        match classify(line) {
            Frame::Ignored => {}
            Frame::Completion => {
                self.completed = true;
                out.push(PipelineOutput::Completed);
            }
            Frame::Payload(content) => match parse_event(content) {
                Ok(event) => {
                    let projection = self.view.project(event.clone());
                    if projection.appended {
                        out.push(PipelineOutput::Appended {
                            event,
                            stage_entered: projection.stage_entered,
                        });
                    } else {
                        self.skipped.duplicates += 1;
                        debug!(event_id = %event.id, "duplicate event dropped");
                    }
                }
                Err(ParseFailure::MissingAuthor) => {
                    self.skipped.missing_author += 1;
                }
                Err(err @ ParseFailure::Malformed(_)) => {
                    self.skipped.malformed += 1;
                    debug!(error = %err, "skipping malformed payload");
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_chunks(chunks: &[&[u8]]) -> (Vec<PipelineOutput>, EventPipeline) {
        let mut pipeline = EventPipeline::new();
        let mut out = Vec::new();
        for chunk in chunks {
            out.extend(pipeline.push_chunk(chunk));
        }
        out.extend(pipeline.finish());
        (out, pipeline)
    }

    fn authors(out: &[PipelineOutput]) -> Vec<String> {
        out.iter()
            .filter_map(|o| match o {
                PipelineOutput::Appended { event, .. } => Some(event.author.clone()),
                PipelineOutput::Completed => None,
            })
            .collect()
    }

    #[test]
    fn malformed_lines_do_not_stop_the_stream() {
        let (out, pipeline) = run_chunks(&[
            b"data: {\"id\":\"1\",\"author\":\"a\"}\n",
            b"data: {not json}\n",
            b"data: {\"id\":\"2\",\"title\":\"no author\"}\n",
            b"data: {\"id\":\"3\",\"author\":\"b\"}\n",
        ]);
        assert_eq!(authors(&out), vec!["a", "b"]);
        assert_eq!(pipeline.view().events().len(), 2);
        assert_eq!(pipeline.view().stages(), &["a", "b"]);
        assert_eq!(pipeline.skipped().malformed, 1);
        assert_eq!(pipeline.skipped().missing_author, 1);
        assert!(!pipeline.is_completed());
    }

    #[test]
    fn sentinel_stops_projection_within_same_chunk() {
        let (out, pipeline) = run_chunks(&[
            b"data: {\"id\":\"1\",\"author\":\"a\"}\ndata: [DONE]\ndata: {\"id\":\"2\",\"author\":\"b\"}\n",
            b"data: {\"id\":\"3\",\"author\":\"c\"}\n",
        ]);
        assert_eq!(out.last(), Some(&PipelineOutput::Completed));
        assert_eq!(authors(&out), vec!["a"]);
        assert_eq!(pipeline.view().events().len(), 1);
        assert!(pipeline.is_completed());
    }

    #[test]
    fn unterminated_final_line_is_processed_on_finish() {
        let (out, _) = run_chunks(&[b"data: {\"id\":\"1\",\"author\":\"a\"}\ndata: {\"id\":\"2\",\"author\":\"b\"}"]);
        assert_eq!(authors(&out), vec!["a", "b"]);
    }

    #[test]
    fn unterminated_sentinel_completes_on_finish() {
        let (out, pipeline) = run_chunks(&[b"data: {\"id\":\"1\",\"author\":\"a\"}\ndata: [DONE]"]);
        assert_eq!(out.last(), Some(&PipelineOutput::Completed));
        assert!(pipeline.is_completed());
    }

    #[test]
    fn split_points_do_not_change_outputs() {
        let stream = concat!(
            ": ping\n",
            "data: {\"id\":\"1\",\"author\":\"data_preparation_agent\",\"title\":\"Fetching order \u{2713}\"}\n\n",
            "data: {\"id\":\"1\",\"author\":\"data_preparation_agent\"}\n",
            "data: {\"id\":\"2\",\"author\":\"information_architect\"}\n",
            "data: oops\n",
            "data: {\"id\":\"3\",\"author\":\"information_architect\"}\n",
            "data: [DONE]\n",
        )
        .as_bytes();
        let (whole, _) = run_chunks(&[stream]);
        for split in 1..stream.len() {
            let (parts, _) = run_chunks(&[&stream[..split], &stream[split..]]);
            assert_eq!(parts, whole, "split at {split}");
        }
        assert_eq!(whole.len(), 4);
    }

    #[test]
    fn duplicates_are_counted() {
        let (out, pipeline) = run_chunks(&[
            b"data: {\"id\":\"1\",\"author\":\"a\"}\n",
            b"data: {\"id\":\"1\",\"author\":\"a\"}\n",
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(pipeline.skipped().duplicates, 1);
    }
}
