/*
    Asteria, satellite orbit propagation and determination
    Copyright (C) 2026 The Asteria contributors

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use log::trace;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;

/// Applies `func(i)` exactly once for each `i` in `[begin, end)` across
/// `min(available_parallelism, end - begin)` worker threads.
///
/// A shared atomic cursor hands out one index at a time to whichever worker
/// asks next: per-index work (a full trajectory propagation) has highly
/// variable cost, and static partitioning would stall on stragglers. There is
/// no ordering guarantee between indices and no guarantee about which thread
/// executes which index.
///
/// `func` must be safe to call concurrently on disjoint data; each call
/// receives a distinct index and is expected to write to a distinct output
/// slot. The engine applies no synchronization around the call.
///
/// The first error returned by `func` stops the index hand-out and is reported
/// once every in-flight call has completed; the remaining indices are
/// abandoned. A panic on a worker is resumed on the caller after the join.
pub fn parallel_for<E, F>(begin: usize, end: usize, func: F) -> Result<(), E>
where
    E: Send,
    F: Fn(usize) -> Result<(), E> + Sync,
{
    let threads = thread::available_parallelism().map_or(1, |n| n.get());
    parallel_for_with(threads, begin, end, func)
}

/// [`parallel_for`] with an explicit worker count.
pub fn parallel_for_with<E, F>(threads: usize, begin: usize, end: usize, func: F) -> Result<(), E>
where
    E: Send,
    F: Fn(usize) -> Result<(), E> + Sync,
{
    if begin >= end {
        return Ok(());
    }

    let workers = threads.clamp(1, end - begin);
    let cursor = AtomicUsize::new(begin);
    let failure: Mutex<Option<E>> = Mutex::new(None);
    let panicked: Mutex<Option<Box<dyn std::any::Any + Send>>> = Mutex::new(None);

    trace!(
        "parallel_for over [{begin}, {end}) with {workers} workers"
    );

    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                let index = cursor.fetch_add(1, Ordering::SeqCst);
                if index >= end {
                    break;
                }
                match catch_unwind(AssertUnwindSafe(|| func(index))) {
                    Ok(Ok(())) => {}
                    Ok(Err(error)) => {
                        let mut slot = failure.lock().unwrap();
                        if slot.is_none() {
                            *slot = Some(error);
                        }
                        // Stop handing out further indices
                        cursor.store(end, Ordering::SeqCst);
                        break;
                    }
                    Err(payload) => {
                        let mut slot = panicked.lock().unwrap();
                        if slot.is_none() {
                            *slot = Some(payload);
                        }
                        cursor.store(end, Ordering::SeqCst);
                        break;
                    }
                }
            });
        }
    });

    if let Some(payload) = panicked.into_inner().unwrap() {
        resume_unwind(payload);
    }
    match failure.into_inner().unwrap() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}
