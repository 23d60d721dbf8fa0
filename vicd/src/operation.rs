/* -------------------------------------------------------------------------- *\
 *                |   █████╗ ██╗   ██╗██████╗  █████╗ ███████╗ |              *
 *                |  ██╔══██╗██║   ██║██╔══██╗██╔══██╗██╔════╝ |              *
 *                |  ███████║██║   ██║██████╔╝███████║█████╗   |              *
 *                |  ██╔══██║██║   ██║██╔══██╗██╔══██║██╔══╝   |              *
 *                |  ██║  ██║╚██████╔╝██║  ██║██║  ██║███████╗ |              *
 *                |  ╚═╝  ╚═╝ ╚═════╝ ╚═╝  ╚═╝╚═╝  ╚═╝╚══════╝ |              *
 *                +--------------------------------------------+              *
 *                                                                            *
 *                         Distributed Systems Runtime                        *
 * -------------------------------------------------------------------------- *
 * Copyright 2022 - 2024, the aurae contributors                              *
 * SPDX-License-Identifier: Apache-2.0                                        *
\* -------------------------------------------------------------------------- */

//! Cancellation and deadlines for a single request flowing through the
//! provider.
//!
//! An [Operation] is created once per incoming request and handed by
//! reference to every step. Each remote call is wrapped with
//! [Operation::guard] so that cancelling the operation, or running past its
//! deadline, stops the flow at the next remote call.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Why a guarded call did not run to completion.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Interrupted {
    #[error("was cancelled")]
    Cancelled,
    #[error("exceeded its deadline")]
    DeadlineExceeded,
}

#[derive(Debug, Clone)]
pub struct Operation {
    id: Uuid,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl Operation {
    pub fn new() -> Self {
        Self { id: Uuid::new_v4(), cancel: CancellationToken::new(), deadline: None }
    }

    /// Bounds the operation to `timeout` from now. An earlier deadline
    /// already set on the operation is kept.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        self
    }

    /// A child operation shares the parent's deadline and is cancelled with
    /// it, but may be cancelled on its own.
    pub fn child(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn cancel(&self) {
        self.cancel.cancel()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Runs `fut` unless the operation is cancelled or its deadline passes
    /// first. A cancelled operation never polls `fut`.
    pub async fn guard<F: Future>(
        &self,
        fut: F,
    ) -> Result<F::Output, Interrupted> {
        if self.cancel.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }

        let bounded = async {
            match self.deadline {
                Some(deadline) => tokio::time::timeout_at(deadline, fut)
                    .await
                    .map_err(|_| Interrupted::DeadlineExceeded),
                None => Ok(fut.await),
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Interrupted::Cancelled),
            output = bounded => output,
        }
    }
}

impl Default for Operation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn guard_passes_output_through() {
        let op = Operation::new();
        assert_eq!(op.guard(async { 7 }).await, Ok(7));
    }

    #[tokio::test]
    async fn cancelled_operation_does_not_poll() {
        let op = Operation::new();
        op.cancel();

        let mut polled = false;
        let result = op.guard(async { polled = true }).await;

        assert_eq!(result, Err(Interrupted::Cancelled));
        assert!(!polled);
    }

    #[tokio::test]
    async fn cancelling_parent_cancels_child() {
        let parent = Operation::new();
        let child = parent.child();
        parent.cancel();

        assert!(child.is_cancelled());
        assert_eq!(child.guard(async {}).await, Err(Interrupted::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_interrupts_slow_call() {
        let op = Operation::new().with_timeout(Duration::from_secs(1));

        let result = op
            .guard(tokio::time::sleep(Duration::from_secs(5)))
            .await;

        assert_eq!(result, Err(Interrupted::DeadlineExceeded));
    }

    #[test]
    fn earlier_deadline_wins() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .expect("runtime");
        let _guard = rt.enter();

        let op = Operation::new().with_timeout(Duration::from_secs(1));
        let first = op.deadline;
        let op = op.with_timeout(Duration::from_secs(60));

        assert_eq!(op.deadline, first);
    }
}
