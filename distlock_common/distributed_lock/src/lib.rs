//! Distributed lock module, providing mutual exclusion through a shared cache backend.
//!
//! Two variants share the retry loop and release-on-drop guard:
//! * [`RobustLock`] relies on the backend's atomic `SET NX PX` and a scripted
//!   compare-and-delete;
//! * [`BasicLock`] composes non-atomic reads and writes and keeps the race windows that
//!   come with that.
//!
//! ```no_run
//! use std::sync::Arc;
//! use distributed_lock::{redis_backend, RobustLock};
//!
//! let backend = Arc::new(redis_backend().unwrap());
//! let lock = RobustLock::new(backend);
//! let sold = lock.lock("seckill", || Ok::<_, std::io::Error>(true)).unwrap();
//! ```

pub mod basic_lock;
pub mod clock;
pub mod config;
pub mod error;
pub mod guard;
pub mod lock;
pub mod metrics;
pub mod retry;
pub mod token;

pub use basic_lock::BasicLock;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{redis_backend, LockConfig};
pub use error::{DistributedLockError, Result};
pub use guard::LockGuard;
pub use lock::RobustLock;
pub use metrics::{LockEvent, MetricsSnapshot};
pub use retry::{Acquisition, Backoff, RetryPolicy};
