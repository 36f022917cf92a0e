//! Lifecycle handshake records.
//!
//! Every spawned actor sends a `ReadinessRecord` to its spawner before doing any
//! work, and an `ExitRecord` from `stopped()`. Both travel over one-shot channels;
//! the spawner waits on them with a deadline.

use std::fmt;
use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::GameError;
use crate::game::types::PlayerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessRole {
    Display,
    Dispatcher,
    Player(PlayerId),
}

impl fmt::Display for ProcessRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessRole::Display => write!(f, "display driver"),
            ProcessRole::Dispatcher => write!(f, "turn dispatcher"),
            ProcessRole::Player(id) => write!(f, "player {id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessIdentity {
    pub role: ProcessRole,
    pub instance: Uuid,
}

impl ProcessIdentity {
    pub fn new(role: ProcessRole) -> Self {
        Self {
            role,
            instance: Uuid::new_v4(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessRecord {
    pub identity: ProcessIdentity,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitRecord {
    pub identity: ProcessIdentity,
}

/// Sending half kept by an actor until it reports readiness.
pub type ReadySender = oneshot::Sender<ReadinessRecord>;
/// Sending half kept by an actor until it stops.
pub type ExitSender = oneshot::Sender<ExitRecord>;

/// Whether an exit was confirmed or had to be assumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitStatus {
    Confirmed,
    /// The actor went away without sending its record (dropped or panicked).
    Vanished,
    /// No record within the deadline.
    TimedOut,
}

pub async fn await_readiness(
    role: ProcessRole,
    rx: oneshot::Receiver<ReadinessRecord>,
    deadline: Duration,
) -> Result<ReadinessRecord, GameError> {
    match tokio::time::timeout(deadline, rx).await {
        Ok(Ok(record)) => {
            debug!(
                "[Handshake] {} ready: {}",
                role,
                serde_json::to_string(&record).unwrap_or_default()
            );
            Ok(record)
        }
        Ok(Err(_)) => Err(GameError::Handshake {
            role,
            reason: "exited before reporting readiness".to_string(),
        }),
        Err(_) => Err(GameError::Handshake {
            role,
            reason: format!("no readiness record within {}ms", deadline.as_millis()),
        }),
    }
}

pub async fn await_exit(
    role: ProcessRole,
    rx: oneshot::Receiver<ExitRecord>,
    deadline: Duration,
) -> ExitStatus {
    match tokio::time::timeout(deadline, rx).await {
        Ok(Ok(record)) => {
            debug!("[Handshake] {} exited ({})", role, record.identity.instance);
            ExitStatus::Confirmed
        }
        Ok(Err(_)) => {
            warn!("[Handshake] {} vanished without an exit record", role);
            ExitStatus::Vanished
        }
        Err(_) => {
            warn!("[Handshake] {} did not confirm exit within {}ms", role, deadline.as_millis());
            ExitStatus::TimedOut
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_readiness_received() {
        let (tx, rx) = oneshot::channel();
        let identity = ProcessIdentity::new(ProcessRole::Display);
        tx.send(ReadinessRecord {
            identity,
            detail: String::new(),
        })
        .unwrap();
        let record = await_readiness(ProcessRole::Display, rx, Duration::from_millis(50))
            .await
            .unwrap();
        assert_eq!(record.identity, identity);
    }

    #[tokio::test]
    async fn test_readiness_sender_dropped() {
        let (tx, rx) = oneshot::channel::<ReadinessRecord>();
        drop(tx);
        let err = await_readiness(ProcessRole::Dispatcher, rx, Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GameError::Handshake {
                role: ProcessRole::Dispatcher,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_exit_timeout() {
        let (_tx, rx) = oneshot::channel::<ExitRecord>();
        let status = await_exit(ProcessRole::Display, rx, Duration::from_millis(20)).await;
        assert_eq!(status, ExitStatus::TimedOut);
    }
}
