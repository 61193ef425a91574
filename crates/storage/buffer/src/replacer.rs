use crate::frame::FrameId;
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

/// Tracks the frames eligible for eviction, in least-recently-unpinned order.
///
/// A frame enters the tracked set when its pin count drops to zero and
/// leaves it when it is pinned again or chosen as a victim. The queue holds
/// the most recently unpinned frame at the front; victims are popped from
/// the back.
#[derive(Debug, Default)]
pub(crate) struct LruReplacer {
    inner: Mutex<LruState>,
}

#[derive(Debug, Default)]
struct LruState {
    /// Front is most recently unpinned, back is the next victim.
    queue: VecDeque<FrameId>,
    /// Membership set; keeps `unpin` idempotent.
    members: HashSet<FrameId>,
}

impl LruReplacer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Removes and returns the least recently unpinned frame, if any.
    pub(crate) fn victim(&self) -> Option<FrameId> {
        let mut state = self.inner.lock().unwrap();
        let frame_id = state.queue.pop_back()?;
        state.members.remove(&frame_id);
        Some(frame_id)
    }

    /// Removes `frame_id` from the tracked set. No-op if it is not tracked.
    pub(crate) fn pin(&self, frame_id: FrameId) {
        let mut state = self.inner.lock().unwrap();
        if state.members.remove(&frame_id) {
            let position = state
                .queue
                .iter()
                .position(|tracked| *tracked == frame_id)
                .expect("replacer queue out of sync with member set");
            let _ = state.queue.remove(position);
        }
    }

    /// Inserts `frame_id` at the most-recent end. A second unpin of a frame
    /// already tracked does not change its position.
    pub(crate) fn unpin(&self, frame_id: FrameId) {
        let mut state = self.inner.lock().unwrap();
        if state.members.insert(frame_id) {
            state.queue.push_front(frame_id);
        }
    }

    /// Number of frames currently eligible for eviction.
    pub(crate) fn size(&self) -> usize {
        self.inner.lock().unwrap().members.len()
    }
}
