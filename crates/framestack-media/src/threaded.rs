//! A decoder backed by a pool of worker threads.
//!
//! Background opens and frame decodes are queued on a bounded channel and
//! picked up by the workers. Blocking opens, and frame misses on clips
//! opened for a final render, run on the calling thread instead so the
//! render never sees a missing frame.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use framestack_core::memory_budget::{FRAME_CACHE_SIZE, LOOKAHEAD_FRAMES};
use framestack_core::{FrameNumber, SharedFrameBuffer};
use framestack_timeline::{Clip, Footage, FootageStream, PlaybackState};
use parking_lot::{Condvar, Mutex};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cache::{FrameCache, FrameKey};
use crate::decoder::{source_frame, Decoder, FrameFetch, FrameRequest, OpenMode};
use crate::source::MediaSource;

const QUEUE_CAPACITY: usize = 64;

enum Job {
    Open {
        footage: Option<Arc<Footage>>,
        playback: Arc<PlaybackState>,
    },
    Probe(Arc<Footage>),
    Decode {
        key: FrameKey,
        footage: Arc<Footage>,
        stream: FootageStream,
    },
    Shutdown,
}

/// State shared with the workers.
struct Shared {
    source: Arc<dyn MediaSource>,
    /// Open clips and how they were opened. Lock before `cache`.
    clips: Mutex<HashMap<Uuid, OpenMode>>,
    cache: Mutex<FrameCache>,
    /// Decodes queued or running.
    pending: Mutex<HashSet<FrameKey>>,
    idle: Condvar,
}

impl Shared {
    fn finish_open(&self, footage: Option<&Footage>, playback: &PlaybackState) {
        if let Some(footage) = footage {
            probe(self.source.as_ref(), footage);
        }
        playback.set_finished_opening(true);
    }

    fn decode(
        &self,
        key: FrameKey,
        footage: &Footage,
        stream: &FootageStream,
    ) -> Option<SharedFrameBuffer> {
        match self.source.decode(footage, stream, key.frame) {
            Ok(frame) => {
                let frame = Arc::new(frame);
                // Holding `clips` keeps a concurrent close from missing this insert
                let clips = self.clips.lock();
                if clips.contains_key(&key.clip) {
                    self.cache.lock().insert(key, frame.clone());
                }
                Some(frame)
            }
            Err(e) => {
                warn!("Failed to decode frame {} of {}: {}", key.frame, footage.name, e);
                None
            }
        }
    }

    fn finish_decode(&self, key: &FrameKey) {
        self.pending.lock().remove(key);
        self.idle.notify_all();
    }
}

fn probe(source: &dyn MediaSource, footage: &Footage) {
    if footage.is_ready() || footage.is_invalid() {
        return;
    }
    match source.probe(footage) {
        Ok(()) => footage.set_ready(true),
        Err(e) => {
            warn!("Footage {} is not decodable: {}", footage.name, e);
            footage.set_invalid(true);
        }
    }
}

fn run_worker(shared: Arc<Shared>, jobs: Receiver<Job>) {
    while let Ok(job) = jobs.recv() {
        match job {
            Job::Open { footage, playback } => shared.finish_open(footage.as_deref(), &playback),
            Job::Probe(footage) => probe(shared.source.as_ref(), &footage),
            Job::Decode {
                key,
                footage,
                stream,
            } => {
                if shared.clips.lock().contains_key(&key.clip) {
                    shared.decode(key, &footage, &stream);
                }
                shared.finish_decode(&key);
            }
            Job::Shutdown => break,
        }
    }
}

/// Worker-pool [`Decoder`] over a [`MediaSource`].
pub struct ThreadedDecoder {
    shared: Arc<Shared>,
    jobs: Sender<Job>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadedDecoder {
    /// A decoder with one worker per core, up to four.
    pub fn new(source: Arc<dyn MediaSource>) -> Self {
        let workers = thread::available_parallelism().map_or(2, |n| n.get().min(4));
        Self::with_workers(source, workers, FRAME_CACHE_SIZE)
    }

    pub fn with_workers(source: Arc<dyn MediaSource>, workers: usize, cache_budget: usize) -> Self {
        let shared = Arc::new(Shared {
            source,
            clips: Mutex::new(HashMap::new()),
            cache: Mutex::new(FrameCache::new(cache_budget)),
            pending: Mutex::new(HashSet::new()),
            idle: Condvar::new(),
        });
        let (tx, rx) = bounded(QUEUE_CAPACITY);

        let workers = (0..workers.max(1))
            .map(|i| {
                let shared = Arc::clone(&shared);
                let rx = rx.clone();
                thread::Builder::new()
                    .name(format!("framestack-decode-{i}"))
                    .spawn(move || run_worker(shared, rx))
            })
            .filter_map(|spawned| match spawned {
                Ok(handle) => Some(handle),
                Err(e) => {
                    warn!("Failed to spawn decode worker: {}", e);
                    None
                }
            })
            .collect::<Vec<_>>();

        info!("Decoder started with {} workers", workers.len());
        Self {
            shared,
            jobs: tx,
            workers,
        }
    }

    /// Probe imported footage on the calling thread, marking it ready or
    /// invalid. Clips only activate once their footage is ready.
    pub fn probe_footage(&self, footage: &Footage) {
        probe(self.shared.source.as_ref(), footage);
    }

    /// Queue a probe of imported footage.
    pub fn probe_in_background(&self, footage: Arc<Footage>) {
        if let Err(e) = self.jobs.send(Job::Probe(footage)) {
            if let Job::Probe(footage) = e.into_inner() {
                self.probe_footage(&footage);
            }
        }
    }

    /// Number of frames currently cached.
    pub fn cached_frames(&self) -> usize {
        self.shared.cache.lock().len()
    }

    /// Block until no decodes are queued or running for `clip`.
    pub fn wait_idle(&self, clip: Uuid) {
        let mut pending = self.shared.pending.lock();
        while pending.iter().any(|key| key.clip == clip) {
            self.shared.idle.wait(&mut pending);
        }
    }

    /// Queue a decode unless it is cached or already queued. Prefetches
    /// are dropped when the queue is full.
    fn enqueue(&self, key: FrameKey, footage: &Arc<Footage>, stream: &FootageStream) {
        if self.shared.cache.lock().contains(&key) || !self.shared.pending.lock().insert(key) {
            return;
        }
        let job = Job::Decode {
            key,
            footage: Arc::clone(footage),
            stream: stream.clone(),
        };
        match self.jobs.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.shared.finish_decode(&key);
            }
        }
    }

    fn prefetch(
        &self,
        clip: &Clip,
        footage: &Arc<Footage>,
        stream: &FootageStream,
        from: FrameNumber,
        request: &FrameRequest,
    ) {
        let step = if clip.reversed != (request.playback_speed < 0.0) {
            -1
        } else {
            1
        };
        for i in 1..=LOOKAHEAD_FRAMES as FrameNumber {
            let frame = from + i * step;
            if frame < 0 || (footage.length > 0 && frame >= footage.length) {
                break;
            }
            self.enqueue(FrameKey::new(clip.id, frame), footage, stream);
        }
    }
}

impl Decoder for ThreadedDecoder {
    fn open(&self, clip: &Clip, mode: OpenMode) {
        self.shared.clips.lock().insert(clip.id, mode);
        let footage = clip.footage().cloned();

        match mode {
            OpenMode::Blocking => self.shared.finish_open(footage.as_deref(), &clip.playback),
            OpenMode::Background => {
                let job = Job::Open {
                    footage,
                    playback: Arc::clone(&clip.playback),
                };
                if let Err(e) = self.jobs.send(job) {
                    // Workers are gone; finish here so the clip can still close
                    warn!("Decode queue closed, opening {} inline", clip.name);
                    if let Job::Open { footage, playback } = e.into_inner() {
                        self.shared.finish_open(footage.as_deref(), &playback);
                    }
                }
            }
        }
    }

    fn close(&self, clip: &Clip, wait: bool) {
        {
            let mut clips = self.shared.clips.lock();
            clips.remove(&clip.id);
            let dropped = self.shared.cache.lock().remove_clip(clip.id);
            debug!(clip = %clip.name, dropped, "decoder closed clip");
        }
        if wait {
            self.wait_idle(clip.id);
        }
    }

    fn retrieve_frame(&self, clip: &Clip, request: &FrameRequest) -> FrameFetch {
        let Some(footage) = clip.footage() else {
            return FrameFetch::NotReady;
        };
        if !self.is_stream_ready(footage) {
            return FrameFetch::NotReady;
        }
        let Some(stream) = footage.stream(true, clip.media_stream) else {
            return FrameFetch::NotReady;
        };

        let frame = source_frame(clip, footage, stream, request);
        let key = FrameKey::new(clip.id, frame);
        let mode = self.shared.clips.lock().get(&clip.id).copied();

        let cached = self.shared.cache.lock().get(&key);
        if let Some(cached) = cached {
            if mode == Some(OpenMode::Background) {
                self.prefetch(clip, footage, stream, frame, request);
            }
            return FrameFetch::Ready {
                frame: cached,
                source_frame: frame,
            };
        }

        match mode {
            None => FrameFetch::NotReady,
            Some(OpenMode::Blocking) => match self.shared.decode(key, footage, stream) {
                Some(decoded) => FrameFetch::Ready {
                    frame: decoded,
                    source_frame: frame,
                },
                None => FrameFetch::NotReady,
            },
            Some(OpenMode::Background) => {
                self.enqueue(key, footage, stream);
                self.prefetch(clip, footage, stream, frame, request);
                FrameFetch::NotReady
            }
        }
    }
}

impl Drop for ThreadedDecoder {
    fn drop(&mut self) {
        for _ in &self.workers {
            // Blocks while the queue is full; workers keep draining it
            let _ = self.jobs.send(Job::Shutdown);
        }
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("Decode worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{close_clip, open_clip};
    use crate::source::TestPatternSource;
    use framestack_core::FrameRate;
    use framestack_timeline::{Media, TrackIndex};
    use std::time::{Duration, Instant};

    fn decoder() -> ThreadedDecoder {
        ThreadedDecoder::with_workers(Arc::new(TestPatternSource), 2, 64 * 1024 * 1024)
    }

    fn footage_clip() -> Clip {
        let footage = Footage::new(
            "bars",
            "bars.mov",
            vec![FootageStream::video(0, 8, 4, FrameRate::FPS_24)],
        )
        .with_length(240);
        Clip::new("bars", TrackIndex::video(1), 0, 100).with_media(Media::footage(footage), 0)
    }

    fn request(playhead: FrameNumber) -> FrameRequest {
        FrameRequest {
            playhead,
            rate: FrameRate::FPS_24,
            playback_speed: 1.0,
        }
    }

    fn eventually(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn test_blocking_open_and_retrieve() {
        let decoder = decoder();
        let clip = footage_clip();
        open_clip(&decoder, &clip, OpenMode::Blocking);

        assert!(clip.playback.finished_opening());
        assert!(decoder.is_stream_ready(clip.footage().unwrap()));
        match decoder.retrieve_frame(&clip, &request(12)) {
            FrameFetch::Ready {
                frame,
                source_frame,
            } => {
                assert_eq!(source_frame, 12);
                assert_eq!(
                    frame.to_rgba8(),
                    TestPatternSource::frame(8, 4, 12).to_rgba8()
                );
            }
            FrameFetch::NotReady => panic!("blocking clips always have a frame"),
        }
    }

    #[test]
    fn test_background_open_completes() {
        let decoder = decoder();
        let clip = footage_clip();
        open_clip(&decoder, &clip, OpenMode::Background);
        assert!(eventually(|| clip.playback.finished_opening()));
        assert!(clip.footage().unwrap().is_ready());
    }

    #[test]
    fn test_background_retrieve_fills_cache() {
        let decoder = decoder();
        let clip = footage_clip();
        open_clip(&decoder, &clip, OpenMode::Background);
        assert!(eventually(|| clip.playback.finished_opening()));

        assert!(eventually(|| decoder.retrieve_frame(&clip, &request(5)).is_ready()));
        // Lookahead frames arrive too
        decoder.wait_idle(clip.id);
        assert!(decoder.cached_frames() > 1);
    }

    #[test]
    fn test_close_drops_cached_frames() {
        let decoder = decoder();
        let clip = footage_clip();
        open_clip(&decoder, &clip, OpenMode::Blocking);
        assert!(decoder.retrieve_frame(&clip, &request(0)).is_ready());
        assert_eq!(decoder.cached_frames(), 1);

        assert!(close_clip(&decoder, &clip, true));
        assert_eq!(decoder.cached_frames(), 0);
        assert!(!decoder.retrieve_frame(&clip, &request(0)).is_ready());
    }

    #[test]
    fn test_probe_in_background() {
        let decoder = decoder();
        let clip = footage_clip();
        let footage = Arc::clone(clip.footage().unwrap());
        decoder.probe_in_background(Arc::clone(&footage));
        assert!(eventually(|| footage.is_ready()));
        assert!(decoder.is_stream_ready(&footage));
    }

    #[test]
    fn test_undecodable_footage_is_invalid() {
        let decoder = decoder();
        let clip = Clip::new("empty", TrackIndex::video(1), 0, 10)
            .with_media(Media::footage(Footage::new("empty", "empty.bin", vec![])), 0);
        open_clip(&decoder, &clip, OpenMode::Blocking);
        let footage = clip.footage().unwrap();
        assert!(footage.is_invalid());
        assert!(!decoder.is_stream_ready(footage));
        assert!(clip.playback.finished_opening());
    }

    #[test]
    fn test_clip_without_footage_opens_immediately() {
        let decoder = decoder();
        let clip = Clip::new("gap", TrackIndex::video(1), 0, 10);
        open_clip(&decoder, &clip, OpenMode::Background);
        assert!(eventually(|| clip.playback.finished_opening()));
        assert!(!decoder.retrieve_frame(&clip, &request(0)).is_ready());
    }
}
