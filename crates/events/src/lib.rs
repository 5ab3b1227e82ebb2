//! Post-commit notification mechanics.
//!
//! Generic over the committed message so the mechanics stay independent of the
//! order model. The pipeline instantiates it with the committed order header.

pub mod observable;
pub mod observer;

pub use observable::{CommitObservable, NotifyReport};
pub use observer::{CommitObserver, ObserverError};
