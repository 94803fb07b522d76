//! Collection side of the harness: waiting for the watcher to go quiet and
//! reading what it reported.

mod quiescence;
mod reader;

pub use quiescence::{DebounceBarrier, Quiescence, QuiescenceError, SettleConfig};
pub use reader::{NotificationError, NotificationReader};
