//! Subtree error boundaries
//!
//! A `Boundary` runs one fallible unit of work on its own task. An error or
//! a panic inside it becomes a `Fallback` describing what failed and how
//! the user can recover, while everything outside the boundary keeps
//! running.

use std::any::Any;
use std::fmt::Display;
use std::future::Future;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryLevel {
    /// A whole view
    Page,
    /// One panel of a view
    Component,
    /// Application-wide state; only a reload recovers
    Critical,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recovery {
    Retry,
    Reload,
}

impl BoundaryLevel {
    pub fn recovery(&self) -> Recovery {
        match self {
            Self::Page | Self::Component => Recovery::Retry,
            Self::Critical => Recovery::Reload,
        }
    }

    fn headline(&self) -> &'static str {
        match self {
            Self::Page => "This page failed to load",
            Self::Component => "This section failed to load",
            Self::Critical => "Critical error, please reload the application",
        }
    }
}

/// What a failed subtree renders instead of its content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fallback {
    pub boundary: String,
    pub level: BoundaryLevel,
    pub error_id: String,
    pub headline: String,
    pub message: String,
    pub recovery: Recovery,
}

/// Either the subtree's value or its fallback.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Guarded<T> {
    Ready { value: T },
    Failed { fallback: Fallback },
}

impl<T> Guarded<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Ready { value } => Some(value),
            Self::Failed { .. } => None,
        }
    }

    pub fn fallback(&self) -> Option<&Fallback> {
        match self {
            Self::Ready { .. } => None,
            Self::Failed { fallback } => Some(fallback),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Boundary {
    name: String,
    level: BoundaryLevel,
}

impl Boundary {
    pub fn new(name: impl Into<String>, level: BoundaryLevel) -> Self {
        Self {
            name: name.into(),
            level,
        }
    }

    pub fn page(name: impl Into<String>) -> Self {
        Self::new(name, BoundaryLevel::Page)
    }

    pub fn component(name: impl Into<String>) -> Self {
        Self::new(name, BoundaryLevel::Component)
    }

    pub fn critical(name: impl Into<String>) -> Self {
        Self::new(name, BoundaryLevel::Critical)
    }

    pub fn level(&self) -> BoundaryLevel {
        self.level
    }

    /// Run `work` on its own task and contain any failure.
    pub async fn guard<T, E, F>(&self, work: F) -> Guarded<T>
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Display + Send + 'static,
    {
        match tokio::spawn(work).await {
            Ok(Ok(value)) => Guarded::Ready { value },
            Ok(Err(e)) => Guarded::Failed {
                fallback: self.contain(e.to_string()),
            },
            Err(join_err) => {
                let message = if join_err.is_panic() {
                    panic_message(join_err.into_panic())
                } else {
                    "task was cancelled".to_string()
                };
                Guarded::Failed {
                    fallback: self.contain(message),
                }
            }
        }
    }

    /// Report a failure detected outside the boundary's own work.
    pub fn reject<T>(&self, message: impl Into<String>) -> Guarded<T> {
        Guarded::Failed {
            fallback: self.contain(message.into()),
        }
    }

    fn contain(&self, message: String) -> Fallback {
        let error_id = format!(
            "{}-{}",
            self.name,
            &uuid::Uuid::new_v4().simple().to_string()[..8]
        );
        log::error!(
            "💥 [{:?} boundary '{}'] {} ({})",
            self.level,
            self.name,
            message,
            error_id
        );
        Fallback {
            boundary: self.name.clone(),
            level: self.level,
            error_id,
            headline: self.level.headline().to_string(),
            message,
            recovery: self.level.recovery(),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send + 'static>) -> String {
    if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else {
        "unknown panic".to_string()
    }
}
