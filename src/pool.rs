//! Fixed-size, thread-safe connection pool (SPEC_FULL.md §4.8).
//!
//! A single mutex guards the slot array; handle operations on an already-borrowed
//! [`Connection`] take no pool lock. Native OS threads with blocking I/O only — no
//! cooperative scheduler, no worker task.
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex};

use crate::common::verbose;
use crate::connection::Connection;
use crate::error::Result;
use crate::options::Options;

type OnRelease = Box<dyn Fn(&mut Connection) + Send + Sync>;

enum Slot {
    /// Not yet connected.
    Empty,
    /// Connected and available for [`Pool::borrow`].
    Idle(Connection),
    /// Checked out via a live [`Handle`].
    Borrowed,
}

struct Inner {
    connect_options: Options,
    on_release: OnRelease,
    slots: Mutex<Vec<Slot>>,
}

/// A fixed-size pool of PostgreSQL connections.
pub struct Pool(Arc<Inner>);

impl Pool {
    /// Build a pool of `size` slots against `connect_options`, with the default
    /// `on_release` hook (`DISCARD ALL`). No connections are established yet; see
    /// [`Pool::connect`] to prewarm or [`Pool::borrow`] to connect lazily.
    pub fn new(connect_options: Options, size: usize) -> Self {
        PoolOptions::new(size).build(connect_options)
    }

    /// Eagerly establish a connection for every slot still `Empty`.
    pub fn connect(&self) -> Result<()> {
        let len = { self.0.slots.lock().expect("pool mutex poisoned").len() };
        for index in 0..len {
            let is_empty = matches!(self.0.slots.lock().expect("pool mutex poisoned")[index], Slot::Empty);
            if is_empty {
                let conn = Connection::connect(self.0.connect_options.clone())?;
                self.0.slots.lock().expect("pool mutex poisoned")[index] = Slot::Idle(conn);
            }
        }
        Ok(())
    }

    /// Disconnect and drop every currently idle connection, resetting its slot to
    /// `Empty`. Borrowed connections are unaffected.
    pub fn disconnect(&self) {
        let mut slots = self.0.slots.lock().expect("pool mutex poisoned");
        for slot in slots.iter_mut() {
            if let Slot::Idle(_) = slot {
                if let Slot::Idle(conn) = std::mem::replace(slot, Slot::Empty) {
                    if let Err(e) = conn.disconnect() {
                        verbose!(error = %e, "error disconnecting pooled connection");
                    }
                }
            }
        }
    }

    /// Check out an idle connection, connecting lazily if a slot is `Empty`. Returns
    /// `None` ("an invalid handle") if every slot is currently borrowed.
    pub fn borrow(&self) -> Option<Handle> {
        let mut slots = self.0.slots.lock().expect("pool mutex poisoned");
        let index = slots.iter().position(|s| !matches!(s, Slot::Borrowed))?;

        match std::mem::replace(&mut slots[index], Slot::Borrowed) {
            Slot::Idle(conn) => Some(Handle { pool: Arc::clone(&self.0), index, conn: Some(conn) }),
            Slot::Empty => {
                drop(slots);
                match Connection::connect(self.0.connect_options.clone()) {
                    Ok(conn) => Some(Handle { pool: Arc::clone(&self.0), index, conn: Some(conn) }),
                    Err(e) => {
                        verbose!(error = %e, "pool failed to lazily connect slot");
                        self.0.slots.lock().expect("pool mutex poisoned")[index] = Slot::Empty;
                        None
                    }
                }
            }
            Slot::Borrowed => unreachable!("position() only returns non-Borrowed slots"),
        }
    }

    /// Total slot count (idle, empty, and borrowed).
    pub fn size(&self) -> usize {
        self.0.slots.lock().expect("pool mutex poisoned").len()
    }

    /// Connections currently idle (connected but not borrowed).
    pub fn num_idle(&self) -> usize {
        self.0.slots.lock().expect("pool mutex poisoned").iter().filter(|s| matches!(s, Slot::Idle(_))).count()
    }
}

impl Clone for Pool {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool").field("size", &self.size()).field("num_idle", &self.num_idle()).finish()
    }
}

/// Builder for [`Pool`] (slot count and the release hook).
pub struct PoolOptions {
    size: usize,
    on_release: Option<OnRelease>,
}

impl PoolOptions {
    pub fn new(size: usize) -> Self {
        Self { size, on_release: None }
    }

    /// Replace the default `DISCARD ALL` release hook. Must not panic; a panicking
    /// hook poisons the pool mutex for every other slot.
    pub fn on_release(mut self, hook: impl Fn(&mut Connection) + Send + Sync + 'static) -> Self {
        self.on_release = Some(Box::new(hook));
        self
    }

    pub fn build(self, connect_options: Options) -> Pool {
        let mut slots = Vec::with_capacity(self.size);
        slots.resize_with(self.size, || Slot::Empty);
        Pool(Arc::new(Inner {
            connect_options,
            on_release: self.on_release.unwrap_or_else(|| Box::new(default_on_release)),
            slots: Mutex::new(slots),
        }))
    }
}

fn default_on_release(conn: &mut Connection) {
    if let Err(e) = conn.perform("DISCARD ALL") {
        verbose!(error = %e, "default on_release DISCARD ALL failed");
    }
}

/// An RAII-borrowed connection. Returns to its pool slot (after running `on_release`)
/// when dropped.
pub struct Handle {
    pool: Arc<Inner>,
    index: usize,
    conn: Option<Connection>,
}

impl Deref for Handle {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        self.conn.as_ref().expect("Handle.conn only None after drop")
    }
}

impl DerefMut for Handle {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_mut().expect("Handle.conn only None after drop")
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            (self.pool.on_release)(&mut conn);
            self.pool.slots.lock().expect("pool mutex poisoned")[self.index] = Slot::Idle(conn);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_options() -> Options {
        Options::new("postgres", "localhost", 5432)
    }

    #[test]
    fn borrow_on_all_busy_pool_returns_none() {
        let pool = PoolOptions::new(0).build(test_options());
        assert!(pool.borrow().is_none());
    }

    #[test]
    fn size_and_num_idle_reflect_slot_state() {
        let pool = PoolOptions::new(3).build(test_options());
        assert_eq!(pool.size(), 3);
        assert_eq!(pool.num_idle(), 0);
    }
}
