//! Frame acquisition seam.
//!
//! The capture collaborator only ever answers one question: "what is the
//! newest frame right now?" Backlog older than the newest frame is the
//! source's problem to discard; the pipeline never queues. `FrameFeed`
//! layers the retry policy on top: bounded backoff on read failures and,
//! after too many consecutive failures, a permanent fall back to
//! mouse-only until restart.

use std::time::Instant;

use log::{debug, warn};

use laser_arcade_core::RgbFrameView;

/// Where a frame came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOrigin {
    Camera,
    /// No capture device; placeholder frames in tests and tools.
    None,
}

/// One owned RGB8 camera image.
#[derive(Clone, Debug)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    /// Interleaved RGB, row-major, `len = width * height * 3`.
    pub data: Vec<u8>,
    pub captured_at: Instant,
    pub origin: FrameOrigin,
}

impl Frame {
    /// Borrow the pixel data; `None` if the buffer length is inconsistent.
    pub fn view(&self) -> Option<RgbFrameView<'_>> {
        RgbFrameView::new(self.width, self.height, &self.data)
    }
}

#[derive(thiserror::Error, Debug, Clone)]
pub enum CameraError {
    #[error("camera unavailable: {0}")]
    Unavailable(String),
}

/// Capture-side interface consumed by the pipeline.
pub trait FrameSource {
    /// Newest available frame, or `Ok(None)` when nothing new arrived
    /// since the last poll. Implementations must drop any buffered
    /// backlog and hand out only the freshest frame.
    fn poll_newest(&mut self) -> Result<Option<Frame>, CameraError>;
}

/// A session with no capture device at all.
///
/// Every poll reports unavailable, so the feed falls back to mouse-only
/// after the failure limit; the pointer is mouse-driven from the first
/// tick either way.
pub struct NoCamera;

impl FrameSource for NoCamera {
    fn poll_newest(&mut self) -> Result<Option<Frame>, CameraError> {
        Err(CameraError::Unavailable("no capture device".into()))
    }
}

/// Outcome of one feed poll.
#[derive(Debug)]
pub enum FeedStatus {
    Frame(Frame),
    /// Camera healthy, no new frame this tick.
    Idle,
    /// A read failed; the feed is waiting out its backoff.
    BackingOff,
    /// The failure limit was hit: mouse-only for the rest of the session.
    CameraGone,
}

const DEFAULT_FAILURE_LIMIT: u32 = 30;
const MAX_BACKOFF_TICKS: u32 = 8;

/// Retry/backoff wrapper around a [`FrameSource`].
pub struct FrameFeed<S> {
    source: Option<S>,
    consecutive_failures: u32,
    failure_limit: u32,
    backoff_ticks: u32,
    skip_remaining: u32,
}

impl<S: FrameSource> FrameFeed<S> {
    pub fn new(source: S) -> Self {
        Self::with_failure_limit(source, DEFAULT_FAILURE_LIMIT)
    }

    pub fn with_failure_limit(source: S, failure_limit: u32) -> Self {
        Self {
            source: Some(source),
            consecutive_failures: 0,
            failure_limit: failure_limit.max(1),
            backoff_ticks: 0,
            skip_remaining: 0,
        }
    }

    /// True once the feed has permanently fallen back to mouse-only.
    pub fn camera_gone(&self) -> bool {
        self.source.is_none()
    }

    pub fn poll(&mut self) -> FeedStatus {
        let Some(source) = self.source.as_mut() else {
            return FeedStatus::CameraGone;
        };

        if self.skip_remaining > 0 {
            self.skip_remaining -= 1;
            return FeedStatus::BackingOff;
        }

        match source.poll_newest() {
            Ok(Some(frame)) => {
                self.consecutive_failures = 0;
                self.backoff_ticks = 0;
                FeedStatus::Frame(frame)
            }
            Ok(None) => FeedStatus::Idle,
            Err(err) => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= self.failure_limit {
                    warn!(
                        "camera failed {} consecutive reads, falling back to mouse-only: {err}",
                        self.consecutive_failures
                    );
                    self.source = None;
                    return FeedStatus::CameraGone;
                }
                self.backoff_ticks = (self.backoff_ticks * 2).clamp(1, MAX_BACKOFF_TICKS);
                self.skip_remaining = self.backoff_ticks;
                debug!(
                    "camera read failed ({err}), retrying in {} ticks",
                    self.backoff_ticks
                );
                FeedStatus::BackingOff
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    fn test_frame(width: usize, height: usize) -> Frame {
        Frame {
            width,
            height,
            data: vec![0; width * height * 3],
            captured_at: Instant::now(),
            origin: FrameOrigin::Camera,
        }
    }

    struct Scripted {
        polls: VecDeque<Result<Option<Frame>, CameraError>>,
    }

    impl FrameSource for Scripted {
        fn poll_newest(&mut self) -> Result<Option<Frame>, CameraError> {
            self.polls
                .pop_front()
                .unwrap_or(Err(CameraError::Unavailable("script exhausted".into())))
        }
    }

    fn scripted(polls: Vec<Result<Option<Frame>, CameraError>>) -> FrameFeed<Scripted> {
        FrameFeed::new(Scripted {
            polls: polls.into(),
        })
    }

    #[test]
    fn frames_pass_through_and_reset_failure_count() {
        let mut feed = scripted(vec![
            Err(CameraError::Unavailable("hiccup".into())),
            Ok(Some(test_frame(4, 4))),
        ]);
        assert!(matches!(feed.poll(), FeedStatus::BackingOff));
        // One backoff tick after the first failure
        assert!(matches!(feed.poll(), FeedStatus::BackingOff));
        assert!(matches!(feed.poll(), FeedStatus::Frame(_)));
        assert!(!feed.camera_gone());
    }

    #[test]
    fn failure_limit_permanently_drops_the_camera() {
        let mut feed = FrameFeed::with_failure_limit(
            Scripted {
                polls: VecDeque::new(),
            },
            3,
        );
        let mut gone = 0;
        for _ in 0..32 {
            if matches!(feed.poll(), FeedStatus::CameraGone) {
                gone += 1;
            }
        }
        assert!(gone > 0, "feed should give up within 32 polls");
        assert!(feed.camera_gone());
        // Once gone, every poll reports gone
        assert!(matches!(feed.poll(), FeedStatus::CameraGone));
    }

    #[test]
    fn backoff_grows_and_is_bounded() {
        let mut feed = FrameFeed::with_failure_limit(
            Scripted {
                polls: VecDeque::new(),
            },
            1000,
        );
        // Consume failures and count the skip runs between them
        let mut run_lengths = Vec::new();
        let mut current = 0;
        for _ in 0..120 {
            match feed.poll() {
                FeedStatus::BackingOff if feed.skip_remaining > 0 => current += 1,
                _ => {
                    if current > 0 {
                        run_lengths.push(current);
                    }
                    current = 0;
                }
            }
        }
        // Doubling 1, 2, 4, 8, then capped at 8
        assert!(run_lengths.windows(2).all(|w| w[1] >= w[0]));
        assert!(run_lengths.iter().all(|&r| r <= MAX_BACKOFF_TICKS));
    }

    #[test]
    fn idle_polls_are_not_failures() {
        let mut feed = scripted(vec![Ok(None), Ok(None), Ok(Some(test_frame(2, 2)))]);
        assert!(matches!(feed.poll(), FeedStatus::Idle));
        assert!(matches!(feed.poll(), FeedStatus::Idle));
        assert!(matches!(feed.poll(), FeedStatus::Frame(_)));
    }

    #[test]
    fn frame_view_checks_buffer_length() {
        let mut frame = test_frame(4, 4);
        assert!(frame.view().is_some());
        frame.data.pop();
        assert!(frame.view().is_none());
    }
}
