use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::diagnostics::PlaybackStats;
use crate::models::error::StreamError;
use crate::models::pcm::PcmBlock;
use crate::models::segment::PlaybackSegment;
use crate::models::state::{PlaybackState, SegmentState};
use crate::playback::accumulator::AccumulationBuffer;
use crate::processing::wav_format;
use crate::traits::ephemeral_storage::EphemeralStorage;
use crate::traits::segment_player::{PlaybackCallback, PlaybackHandle, PlaybackOutcome, SegmentPlayer};
use crate::traits::stream_delegate::StreamDelegate;

/// Accumulated bytes at which inbound audio is framed into a segment.
pub const SEGMENT_THRESHOLD_BYTES: usize = 30 * 1024;

struct ActiveSegment {
    segment: PlaybackSegment,
    handle: Option<PlaybackHandle>,
}

struct SchedulerState {
    buffer: AccumulationBuffer,
    queue: VecDeque<PlaybackSegment>,
    playing: Option<ActiveSegment>,
    next_index: u64,
    /// Bumped on cleanup so completions from before it are ignored.
    generation: u64,
    playback_state: PlaybackState,
    stats: PlaybackStats,
}

enum Notification {
    Error(StreamError),
    State(PlaybackState),
    Finished(PlaybackSegment),
}

struct Shared {
    state: Mutex<SchedulerState>,
    storage: Arc<dyn EphemeralStorage>,
    player: Arc<dyn SegmentPlayer>,
    delegate: Mutex<Option<Arc<dyn StreamDelegate>>>,
}

/// Turns inbound PCM chunks into framed segments and plays them in order.
///
/// ```text
/// ingest → [AccumulationBuffer] → frame → [EphemeralStorage] → queue → [SegmentPlayer]
/// ```
///
/// One segment plays at a time. Completion of a segment releases its storage
/// and starts the next one; an empty queue halts the consumer until the next
/// flush. Cloning yields another handle to the same scheduler.
#[derive(Clone)]
pub struct SegmentScheduler {
    shared: Arc<Shared>,
}

impl SegmentScheduler {
    pub fn new(storage: Arc<dyn EphemeralStorage>, player: Arc<dyn SegmentPlayer>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(SchedulerState {
                    buffer: AccumulationBuffer::new(),
                    queue: VecDeque::new(),
                    playing: None,
                    next_index: 0,
                    generation: 0,
                    playback_state: PlaybackState::Idle,
                    stats: PlaybackStats::default(),
                }),
                storage,
                player,
                delegate: Mutex::new(None),
            }),
        }
    }

    pub fn set_delegate(&self, delegate: Arc<dyn StreamDelegate>) {
        *self.shared.delegate.lock() = Some(delegate);
    }

    /// Append an inbound chunk, flushing a segment once the threshold is reached.
    ///
    /// Empty or odd-length chunks are logged and discarded. A chunk at a
    /// different sample rate than the buffered audio flushes the buffer first.
    pub fn ingest(&self, pcm: &[u8], sample_rate: u32) {
        let block = PcmBlock::new(pcm.to_vec());
        let mut notes = Vec::new();
        {
            let mut state = self.shared.state.lock();
            state.stats.chunks_received += 1;

            let valid = block.validate().and_then(|()| {
                if sample_rate == 0 {
                    return Err(StreamError::MalformedBlock { len: block.len() });
                }
                Ok(())
            });
            if let Err(e) = valid {
                log::warn!("Discarding inbound chunk at {} Hz: {}", sample_rate, e);
                state.stats.malformed_chunks += 1;
                notes.push(Notification::Error(e));
            } else {
                if state.buffer.sample_rate().is_some_and(|rate| rate != sample_rate) {
                    self.shared.flush_locked(&mut state, &mut notes);
                }
                state.buffer.push(block, sample_rate);
                if state.buffer.byte_len() >= SEGMENT_THRESHOLD_BYTES {
                    self.shared.flush_locked(&mut state, &mut notes);
                }
            }
        }
        self.shared.notify(notes);
        Shared::advance(&self.shared);
    }

    /// Flush a non-empty, sub-threshold buffer so trailing audio still plays.
    pub fn flush_remaining(&self) {
        let mut notes = Vec::new();
        {
            let mut state = self.shared.state.lock();
            if !state.buffer.is_empty() {
                self.shared.flush_locked(&mut state, &mut notes);
            }
        }
        self.shared.notify(notes);
        Shared::advance(&self.shared);
    }

    /// Unload the playing segment, delete every queued segment's storage,
    /// discard buffered audio and reset all counters.
    ///
    /// The segment index keeps increasing so a `play` still in flight from
    /// before the cleanup can never open a newer segment under a reused key.
    pub fn cleanup(&self) {
        let (playing, queued, was_active) = {
            let mut state = self.shared.state.lock();
            state.generation += 1;
            state.buffer.clear();
            state.stats = PlaybackStats::default();
            let was_active = state.playback_state == PlaybackState::Active;
            state.playback_state = PlaybackState::Idle;
            let queued: Vec<PlaybackSegment> = state.queue.drain(..).collect();
            (state.playing.take(), queued, was_active)
        };

        let mut notes = Vec::new();
        if let Some(active) = playing {
            if let Some(handle) = active.handle {
                self.shared.player.unload(handle);
            }
            self.shared.release_storage(&active.segment, &mut notes);
        }
        for segment in &queued {
            self.shared.release_storage(segment, &mut notes);
        }
        log::debug!("Scheduler cleanup released {} queued segments", queued.len());

        if was_active {
            notes.push(Notification::State(PlaybackState::Idle));
        }
        self.shared.notify(notes);
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.shared.state.lock().playback_state
    }

    pub fn stats(&self) -> PlaybackStats {
        self.shared.state.lock().stats.clone()
    }

    /// Segments waiting behind the one currently playing.
    pub fn queued_len(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    pub fn buffered_bytes(&self) -> usize {
        self.shared.state.lock().buffer.byte_len()
    }

    /// Index of the segment currently playing.
    pub fn playing_index(&self) -> Option<u64> {
        self.shared.state.lock().playing.as_ref().map(|a| a.segment.index)
    }
}

impl Shared {
    /// Frame the buffer into a segment, store it and enqueue it.
    ///
    /// A storage failure drops the segment; its audio is lost.
    fn flush_locked(&self, state: &mut SchedulerState, notes: &mut Vec<Notification>) {
        let Some((pcm, sample_rate)) = state.buffer.take() else {
            return;
        };

        let index = state.next_index;
        state.next_index += 1;

        let key = PlaybackSegment::key_for(index);
        let framed = wav_format::frame(&pcm, sample_rate);

        match self.storage.write(&key, &framed) {
            Ok(storage_path) => {
                let mut segment = PlaybackSegment {
                    index,
                    key,
                    storage_path,
                    state: SegmentState::Buffered,
                    byte_len: pcm.len(),
                    sample_rate,
                };
                segment.advance();
                log::debug!("Queued segment {} ({} bytes @ {} Hz)", index, pcm.len(), sample_rate);
                state.stats.segments_created += 1;
                state.queue.push_back(segment);
            }
            Err(e) => {
                log::warn!("Dropping segment {}: {}", index, e);
                state.stats.storage_failures += 1;
                notes.push(Notification::Error(e));
            }
        }
    }

    /// Start the next queued segment if nothing is playing.
    ///
    /// The state lock is never held across calls into the player.
    fn advance(shared: &Arc<Shared>) {
        loop {
            let mut notes = Vec::new();
            let next = {
                let mut state = shared.state.lock();
                if state.playing.is_some() {
                    return;
                }
                match state.queue.pop_front() {
                    Some(mut segment) => {
                        segment.advance();
                        if state.playback_state == PlaybackState::Idle {
                            state.playback_state = PlaybackState::Active;
                            notes.push(Notification::State(PlaybackState::Active));
                        }
                        state.playing = Some(ActiveSegment {
                            segment: segment.clone(),
                            handle: None,
                        });
                        Some((segment, state.generation))
                    }
                    None => {
                        if state.playback_state == PlaybackState::Active {
                            state.playback_state = PlaybackState::Idle;
                            notes.push(Notification::State(PlaybackState::Idle));
                        }
                        None
                    }
                }
            };
            shared.notify(notes);

            let Some((segment, generation)) = next else {
                return;
            };
            let index = segment.index;

            let weak = Arc::downgrade(shared);
            let on_finished: PlaybackCallback = Arc::new(move |outcome: PlaybackOutcome| {
                if let Some(shared) = weak.upgrade() {
                    if Shared::finish(&shared, generation, index, outcome) {
                        Shared::advance(&shared);
                    }
                }
            });

            match shared.player.play(&segment.storage_path, on_finished) {
                Ok(handle) => {
                    let stale = {
                        let mut state = shared.state.lock();
                        let same_generation = state.generation == generation;
                        match state.playing.as_mut() {
                            Some(active) if same_generation && active.segment.index == index => {
                                active.handle = Some(handle);
                                false
                            }
                            _ => true,
                        }
                    };
                    // Already finished (or cleaned up) before `play` returned.
                    if stale {
                        shared.player.unload(handle);
                    }
                    return;
                }
                Err(e) => {
                    log::warn!("Segment {} failed to start: {}", index, e);
                    Shared::finish(shared, generation, index, PlaybackOutcome::Failed(e));
                }
            }
        }
    }

    /// Retire the playing segment. Returns false for stale completions.
    fn finish(shared: &Arc<Shared>, generation: u64, index: u64, outcome: PlaybackOutcome) -> bool {
        let active = {
            let mut state = shared.state.lock();
            let current = state.generation == generation
                && state.playing.as_ref().is_some_and(|a| a.segment.index == index);
            if !current {
                log::debug!("Ignoring stale completion for segment {}", index);
                return false;
            }
            match &outcome {
                PlaybackOutcome::Finished => state.stats.segments_played += 1,
                PlaybackOutcome::Failed(_) => state.stats.playback_failures += 1,
            }
            state.playing.take()
        };
        let Some(ActiveSegment { mut segment, handle }) = active else {
            return false;
        };

        let mut notes = Vec::new();
        if let PlaybackOutcome::Failed(e) = outcome {
            log::warn!("Segment {} playback failed: {}", index, e);
            notes.push(Notification::Error(e));
        }
        if let Some(handle) = handle {
            shared.player.unload(handle);
        }
        shared.release_storage(&segment, &mut notes);
        segment.advance();
        notes.push(Notification::Finished(segment));
        shared.notify(notes);
        true
    }

    fn release_storage(&self, segment: &PlaybackSegment, notes: &mut Vec<Notification>) {
        if let Err(e) = self.storage.delete(&segment.key) {
            log::warn!("Failed to release segment {}: {}", segment.index, e);
            notes.push(Notification::Error(e));
        }
    }

    fn notify(&self, notes: Vec<Notification>) {
        if notes.is_empty() {
            return;
        }
        let Some(delegate) = self.delegate.lock().clone() else {
            return;
        };
        for note in notes {
            match note {
                Notification::Error(e) => delegate.on_error(&e),
                Notification::State(s) => delegate.on_playback_state_changed(s),
                Notification::Finished(segment) => delegate.on_segment_finished(&segment),
            }
        }
    }
}
