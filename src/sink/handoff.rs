// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::Context;
use std::task::Poll;

use crate::Error;
use crate::ErrorKind;

type Outcome = Result<(), Error>;

/// A receipt for a write that has been handed off to a sink.
///
/// The dispatch call that returned it has already completed the hand-off. The `Handoff` resolves
/// once the sink's worker performed the write (not necessarily once it is durable), yielding the
/// sink's error if the write failed. Failures are never retried.
///
/// Dropping a `Handoff` makes the write fire-and-forget: a failure nobody observes is reported to
/// the sink's [`Trap`](crate::Trap) instead.
///
/// A `Handoff` can be awaited, or waited on from synchronous code with [`Handoff::wait`].
#[must_use = "a dropped Handoff makes the write fire-and-forget"]
pub struct Handoff {
    state: State,
}

enum State {
    Ready(Option<Outcome>),
    Pending(oneshot::Receiver<Outcome>),
}

impl fmt::Debug for Handoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            State::Ready(Some(Ok(()))) => "done",
            State::Ready(Some(Err(_))) => "failed",
            State::Ready(None) => "consumed",
            State::Pending(_) => "pending",
        };
        f.debug_struct("Handoff").field("state", &state).finish()
    }
}

impl Handoff {
    /// A handoff that has already completed successfully.
    pub fn done() -> Handoff {
        Handoff {
            state: State::Ready(Some(Ok(()))),
        }
    }

    /// A handoff that has already failed.
    pub fn failed(err: Error) -> Handoff {
        Handoff {
            state: State::Ready(Some(Err(err))),
        }
    }

    pub(crate) fn pending(receiver: oneshot::Receiver<Outcome>) -> Handoff {
        Handoff {
            state: State::Pending(receiver),
        }
    }

    /// Block the current thread until the write completes.
    pub fn wait(self) -> Result<(), Error> {
        match self.state {
            State::Ready(outcome) => outcome.unwrap_or_else(|| Err(consumed())),
            State::Pending(receiver) => receiver.recv().unwrap_or_else(|_| Err(closed())),
        }
    }
}

impl Future for Handoff {
    type Output = Result<(), Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match &mut this.state {
            State::Ready(outcome) => Poll::Ready(outcome.take().unwrap_or_else(|| Err(consumed()))),
            State::Pending(receiver) => match Pin::new(receiver).poll(cx) {
                Poll::Ready(Ok(outcome)) => {
                    this.state = State::Ready(None);
                    Poll::Ready(outcome)
                }
                Poll::Ready(Err(_)) => {
                    this.state = State::Ready(None);
                    Poll::Ready(Err(closed()))
                }
                Poll::Pending => Poll::Pending,
            },
        }
    }
}

fn closed() -> Error {
    Error::new(
        ErrorKind::SinkClosed,
        "sink worker exited before completing the write",
    )
}

fn consumed() -> Error {
    Error::new(ErrorKind::Unexpected, "handoff polled after completion")
}
