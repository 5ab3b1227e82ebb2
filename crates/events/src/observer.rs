use thiserror::Error;

/// An observer refused or failed to handle a committed message.
///
/// Never propagated to the committing order: the observable logs it and moves
/// on to the next observer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("observer failed: {0}")]
pub struct ObserverError(pub String);

impl ObserverError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Receives messages after they have been committed.
///
/// Invoked synchronously on the committing thread, so implementations should
/// hand long-running work off (see the notification fan-out) rather than
/// block the intake worker.
pub trait CommitObserver<M>: Send + Sync {
    /// Name used in log lines when this observer fails.
    fn name(&self) -> &str {
        core::any::type_name::<Self>()
    }

    fn on_commit(&self, committed: &M) -> Result<(), ObserverError>;
}

impl<M, F> CommitObserver<M> for F
where
    F: Fn(&M) -> Result<(), ObserverError> + Send + Sync,
{
    fn on_commit(&self, committed: &M) -> Result<(), ObserverError> {
        self(committed)
    }
}
