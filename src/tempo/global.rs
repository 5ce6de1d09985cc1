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
//! The process-wide tempo map.
//!
//! Each thread keeps its own snapshot, taken on first use and replaced only when the thread
//! asks for it with [`TempoMap::update_thread_tempo_map`]. Conversions done during one
//! processing cycle therefore all see the same map, however many edits are published
//! meanwhile.

use std::cell::RefCell;
use std::sync::{Arc, OnceLock};

use crossbeam_channel::Receiver;
use tracing::{debug, info};

use crate::rcu::{RcuManager, RcuWriter};

use super::map::TempoMap;
use super::point::Positioned;

/// A private copy of the process-wide map, checked out for editing.
pub type TempoMapWriter = RcuWriter<'static, TempoMap>;

static MANAGER: OnceLock<RcuManager<TempoMap>> = OnceLock::new();

thread_local! {
    static THREAD_MAP: RefCell<Option<Arc<TempoMap>>> = const { RefCell::new(None) };
}

impl TempoMap {
    fn manager() -> &'static RcuManager<TempoMap> {
        MANAGER.get_or_init(|| RcuManager::new(TempoMap::default()))
    }

    /// Publishes `map` as the process-wide map and makes it the calling thread's snapshot.
    pub fn init(map: TempoMap) -> Arc<TempoMap> {
        let mut writer = TempoMap::write_copy();
        *writer = map;
        TempoMap::update(writer)
    }

    /// The calling thread's snapshot.
    pub fn use_map() -> Arc<TempoMap> {
        THREAD_MAP.with(|cell| {
            cell.borrow_mut()
                .get_or_insert_with(|| TempoMap::manager().reader())
                .clone()
        })
    }

    /// Replaces the calling thread's snapshot with the most recently published map.
    pub fn update_thread_tempo_map() {
        let latest = TempoMap::manager().reader();
        THREAD_MAP.with(|cell| *cell.borrow_mut() = Some(latest));
    }

    /// Refreshes the calling thread's snapshot and returns it.
    pub fn fetch() -> Arc<TempoMap> {
        TempoMap::update_thread_tempo_map();
        TempoMap::use_map()
    }

    /// Checks out a copy of the current map for editing. Blocks while another writer holds
    /// a copy.
    pub fn write_copy() -> TempoMapWriter {
        TempoMap::manager().write_copy()
    }

    /// Publishes an edited copy. The calling thread's snapshot is refreshed; other threads
    /// see the new map the next time they refresh theirs.
    pub fn update(writer: TempoMapWriter) -> Arc<TempoMap> {
        let published = writer.update();
        info!(
            tempos = published.n_tempos(),
            meters = published.n_meters(),
            points = published.points().len(),
            last = published.points().last().map_or(0, |p| p.sclock()),
            "Published tempo map"
        );
        THREAD_MAP.with(|cell| *cell.borrow_mut() = Some(published.clone()));
        published
    }

    /// Discards an edited copy.
    pub fn abort_update(writer: TempoMapWriter) {
        writer.abort();
        debug!("Discarded tempo map edit");
    }

    /// Receives every map published from now on.
    pub fn subscribe() -> Receiver<Arc<TempoMap>> {
        TempoMap::manager().subscribe()
    }
}
