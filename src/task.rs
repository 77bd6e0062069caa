//! Tri-state container for a single in-flight async computation

/// State of an async computation
///
/// A fresh `Pending` value replaces the previous one whenever the inputs of
/// the computation change; earlier results are discarded, never shown stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsyncTask<T, E> {
    Pending,
    Successful(T),
    Failed(E),
}

impl<T, E> AsyncTask<T, E> {
    pub fn pending() -> Self {
        AsyncTask::Pending
    }

    pub fn successful(data: T) -> Self {
        AsyncTask::Successful(data)
    }

    pub fn failed(error: E) -> Self {
        AsyncTask::Failed(error)
    }

    /// True only when data is available
    pub fn is_successful(&self) -> bool {
        matches!(self, AsyncTask::Successful(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, AsyncTask::Pending)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, AsyncTask::Failed(_))
    }

    /// Data of a successful task
    pub fn data(&self) -> Option<&T> {
        match self {
            AsyncTask::Successful(data) => Some(data),
            _ => None,
        }
    }

    /// Error of a failed task
    pub fn error(&self) -> Option<&E> {
        match self {
            AsyncTask::Failed(error) => Some(error),
            _ => None,
        }
    }

    /// Short tag for logs and metrics
    pub fn tag(&self) -> &'static str {
        match self {
            AsyncTask::Pending => "pending",
            AsyncTask::Successful(_) => "successful",
            AsyncTask::Failed(_) => "failed",
        }
    }
}
