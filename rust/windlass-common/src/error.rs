use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

pub type StdErrorBoxed = Box<dyn std::error::Error + Send + Sync + 'static>;

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn queue_closed() -> Error {
        Error(ErrorKind::QueueClosed.into())
    }

    pub fn queue_full() -> Error {
        Error(ErrorKind::QueueFull.into())
    }

    pub fn task_failed(message: impl Into<String>) -> Error {
        Error(
            ErrorKind::TaskFailed {
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn task_panicked(message: impl Into<String>) -> Error {
        Error(
            ErrorKind::TaskPanicked {
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn negative_counter() -> Error {
        Error(ErrorKind::NegativeCounter.into())
    }

    pub fn deadline_exceeded(timeout: Duration) -> Error {
        Error(ErrorKind::DeadlineExceeded { timeout }.into())
    }

    pub fn lock_poisoned(resource: impl Into<String>) -> Error {
        Error(
            ErrorKind::LockPoisoned {
                resource: resource.into(),
            }
            .into(),
        )
    }

    pub fn codec<E>(context: impl Into<String>, source: E) -> Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error(
            ErrorKind::Codec {
                context: context.into(),
                source: Box::new(source),
            }
            .into(),
        )
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("task queue is closed")]
    QueueClosed,

    #[error("task queue is at capacity")]
    QueueFull,

    #[error("task failed: {message}")]
    TaskFailed { message: String },

    #[error("task panicked: {message}")]
    TaskPanicked { message: String },

    #[error("completion count dropped below zero: done() exceeded add()")]
    NegativeCounter,

    #[error("deadline of {timeout:?} exceeded")]
    DeadlineExceeded { timeout: Duration },

    #[error("lock for '{resource}' is poisoned")]
    LockPoisoned { resource: String },

    #[error("codec error: {context}")]
    Codec {
        context: String,
        source: StdErrorBoxed,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}
