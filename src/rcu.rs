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
//! Read-copy-update publication of shared state.
//!
//! Readers take a snapshot with [`RcuManager::reader`] and never block. A writer copies the
//! current value, edits the copy and publishes it as a whole. Only one writer at a time may
//! hold a copy; the next writer waits until the current one publishes or gives up.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use arc_swap::ArcSwap;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Mutex, MutexGuard};

pub struct RcuManager<T> {
    current: ArcSwap<T>,
    writer: Mutex<()>,
    subscribers: Mutex<Vec<Sender<Arc<T>>>>,
}

impl<T: Clone> RcuManager<T> {
    pub fn new(initial: T) -> RcuManager<T> {
        RcuManager {
            current: ArcSwap::from_pointee(initial),
            writer: Mutex::new(()),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// The most recently published value.
    pub fn reader(&self) -> Arc<T> {
        self.current.load_full()
    }

    /// Takes the writer lock and returns a private copy of the current value.
    pub fn write_copy(&self) -> RcuWriter<'_, T> {
        let guard = self.writer.lock();
        let copy = T::clone(&self.current.load());
        RcuWriter {
            manager: self,
            copy,
            _guard: guard,
        }
    }

    /// Receives every value published after this call.
    pub fn subscribe(&self) -> Receiver<Arc<T>> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    fn publish(&self, value: T) -> Arc<T> {
        let published = Arc::new(value);
        self.current.store(published.clone());

        // Subscribers that have gone away are dropped.
        self.subscribers
            .lock()
            .retain(|tx| tx.send(published.clone()).is_ok());
        published
    }
}

/// A writer's private copy. Publish it with [`RcuWriter::update`]; dropping it discards the
/// edits and releases the writer lock.
pub struct RcuWriter<'a, T> {
    manager: &'a RcuManager<T>,
    copy: T,
    _guard: MutexGuard<'a, ()>,
}

impl<T: Clone> RcuWriter<'_, T> {
    /// Publishes the copy, replacing the current value for all later readers.
    pub fn update(self) -> Arc<T> {
        let RcuWriter {
            manager,
            copy,
            _guard,
        } = self;
        manager.publish(copy)
    }

    /// Discards the copy.
    pub fn abort(self) {}
}

impl<T> Deref for RcuWriter<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.copy
    }
}

impl<T> DerefMut for RcuWriter<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.copy
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::thread;

    use super::RcuManager;

    #[test]
    fn test_readers_keep_their_snapshot() {
        let manager = RcuManager::new(vec![1]);
        let before = manager.reader();

        let mut writer = manager.write_copy();
        writer.push(2);
        // Unpublished edits are invisible.
        assert_eq!(vec![1], *manager.reader());
        writer.update();

        assert_eq!(vec![1], *before);
        assert_eq!(vec![1, 2], *manager.reader());
    }

    #[test]
    fn test_abort_discards_edits() {
        let manager = RcuManager::new(String::from("a"));
        let mut writer = manager.write_copy();
        writer.push('b');
        writer.abort();
        assert_eq!("a", manager.reader().as_str());

        // The writer lock is free again.
        let mut writer = manager.write_copy();
        writer.push('c');
        writer.update();
        assert_eq!("ac", manager.reader().as_str());
    }

    #[test]
    fn test_subscribers_see_updates() {
        let manager = RcuManager::new(0u32);
        let rx = manager.subscribe();

        let mut writer = manager.write_copy();
        *writer = 7;
        writer.update();

        assert_eq!(7, *rx.recv().unwrap());
        drop(rx);

        // A dropped subscriber doesn't stop publication.
        let mut writer = manager.write_copy();
        *writer = 8;
        writer.update();
        assert_eq!(8, *manager.reader());
    }

    #[test]
    fn test_concurrent_writers_serialize() {
        let manager = Arc::new(RcuManager::new(0u64));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                thread::spawn(move || {
                    for _ in 0..500 {
                        let mut writer = manager.write_copy();
                        *writer += 1;
                        writer.update();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(4000, *manager.reader());
    }
}
