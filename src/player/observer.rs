// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::audio::SoundBuffer;

/// Receives each voice's panned buffer during a render pass, before it is mixed.
///
/// Called on the render thread with the player locked. Implementations must not block and
/// must not call back into the player.
pub trait BufferObserver: Send + Sync {
    fn on_buffer(&self, buffer: &SoundBuffer);
}

impl<F> BufferObserver for F
where
    F: Fn(&SoundBuffer) + Send + Sync,
{
    fn on_buffer(&self, buffer: &SoundBuffer) {
        self(buffer)
    }
}

/// Forwards copies of rendered buffers to another thread over a bounded channel.
///
/// Buffers are dropped rather than waited on when the receiver falls behind.
pub struct ChannelObserver {
    sender: Sender<SoundBuffer>,
    dropped: AtomicU64,
}

impl ChannelObserver {
    pub fn bounded(capacity: usize) -> (Self, Receiver<SoundBuffer>) {
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        (
            ChannelObserver {
                sender,
                dropped: AtomicU64::new(0),
            },
            receiver,
        )
    }

    /// Number of buffers discarded because the channel was full or closed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl BufferObserver for ChannelObserver {
    fn on_buffer(&self, buffer: &SoundBuffer) {
        match self.sender.try_send(buffer.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_closure_observer() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let observer = move |buffer: &SoundBuffer| {
            counter.fetch_add(buffer.frames(), Ordering::Relaxed);
        };
        observer.on_buffer(&SoundBuffer::silence(32, 2, 44100));
        assert_eq!(calls.load(Ordering::Relaxed), 32);
    }

    #[test]
    fn test_channel_observer_drops_when_full() {
        let (observer, receiver) = ChannelObserver::bounded(1);
        let buffer = SoundBuffer::silence(4, 1, 8000);

        observer.on_buffer(&buffer);
        observer.on_buffer(&buffer);
        assert_eq!(observer.dropped(), 1);

        assert_eq!(receiver.try_recv().ok(), Some(buffer));
        assert!(receiver.try_recv().is_err());
    }
}
