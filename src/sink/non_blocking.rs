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

use std::io::Write;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::SendTimeoutError;
use crossbeam_channel::Sender;
use crossbeam_channel::bounded;
use crossbeam_channel::unbounded;

use crate::Error;
use crate::ErrorKind;
use crate::Trap;
use crate::sink::Handoff;
use crate::sink::Message;
use crate::sink::worker::Worker;

/// A guard that flushes entries associated with a [`NonBlocking`] writer on drop.
///
/// Writing to a [`NonBlocking`] writer does **not** immediately write the entry to the
/// underlying file. The entry is written by a dedicated thread at some later point, so if the
/// program terminates abruptly some entries may not be written. Dropping the guard asks the worker
/// to drain its queue and waits up to the shutdown timeout for it to finish.
#[derive(Debug)]
pub struct WorkerGuard {
    _guard: Option<JoinHandle<()>>,
    sender: Sender<Message>,
    shutdown: Sender<()>,
    shutdown_timeout: Duration,
}

impl WorkerGuard {
    fn new(
        handle: JoinHandle<()>,
        sender: Sender<Message>,
        shutdown: Sender<()>,
        shutdown_timeout: Option<Duration>,
    ) -> Self {
        const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(100);

        WorkerGuard {
            _guard: Some(handle),
            sender,
            shutdown,
            shutdown_timeout: shutdown_timeout.unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT),
        }
    }
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        let shutdown_timeout = self.shutdown_timeout;
        match self
            .sender
            .send_timeout(Message::Shutdown, shutdown_timeout)
        {
            Ok(()) => {
                // Attempt to wait for `Worker` to flush all messages before dropping. This happens
                // when the `Worker` calls `recv()` on a zero-capacity channel. Use `send_timeout`
                // so that drop is not blocked indefinitely.
                let _ = self.shutdown.send_timeout((), shutdown_timeout);
            }
            Err(SendTimeoutError::Disconnected(_)) => (),
            Err(SendTimeoutError::Timeout(_)) => {
                log::warn!(
                    target: "logroute::sink",
                    "failed to send shutdown signal to sink worker within {shutdown_timeout:?}"
                );
            }
        }
    }
}

/// A non-blocking writer: entries are queued to a background worker thread.
#[derive(Clone, Debug)]
pub struct NonBlocking {
    sender: Sender<Message>,
}

impl NonBlocking {
    fn create<T: Write + Send + 'static>(
        writer: T,
        thread_name: String,
        buffered_lines_limit: Option<usize>,
        shutdown_timeout: Option<Duration>,
        trap: Arc<dyn Trap>,
    ) -> Result<(NonBlocking, WorkerGuard), Error> {
        let (sender, receiver) = match buffered_lines_limit {
            Some(cap) => bounded(cap),
            None => unbounded(),
        };

        let (shutdown_sender, shutdown_receiver) = bounded(0);

        let worker = Worker::new(writer, receiver, shutdown_receiver, trap);
        let worker_guard = WorkerGuard::new(
            worker.make_thread(thread_name)?,
            sender.clone(),
            shutdown_sender,
            shutdown_timeout,
        );

        Ok((Self { sender }, worker_guard))
    }

    /// Queue one entry. Blocks only when a bounded queue is full.
    pub fn send(&self, record: Vec<u8>) -> Handoff {
        let (ack, receiver) = oneshot::channel();
        match self.sender.send(Message::Record { record, ack }) {
            Ok(()) => Handoff::pending(receiver),
            Err(_) => Handoff::failed(Error::new(
                ErrorKind::SinkClosed,
                "failed to send log entry to sink worker",
            )),
        }
    }

    /// Ask the worker to flush the underlying writer.
    pub fn flush(&self) -> Handoff {
        let (ack, receiver) = oneshot::channel();
        match self.sender.send(Message::Flush { ack }) {
            Ok(()) => Handoff::pending(receiver),
            Err(_) => Handoff::failed(Error::new(
                ErrorKind::SinkClosed,
                "failed to send flush request to sink worker",
            )),
        }
    }
}

/// A builder for configuring [`NonBlocking`].
#[derive(Debug)]
pub struct NonBlockingBuilder {
    thread_name: String,
    buffered_lines_limit: Option<usize>,
    shutdown_timeout: Option<Duration>,
}

impl Default for NonBlockingBuilder {
    fn default() -> Self {
        NonBlockingBuilder {
            thread_name: "logroute-sink".to_string(),
            buffered_lines_limit: None,
            shutdown_timeout: None,
        }
    }
}

impl NonBlockingBuilder {
    /// Sets the number of entries to buffer before exerting backpressure on senders.
    #[must_use]
    pub fn buffered_lines_limit(mut self, buffered_lines_limit: Option<usize>) -> NonBlockingBuilder {
        self.buffered_lines_limit = buffered_lines_limit;
        self
    }

    /// Sets the shutdown timeout before the worker guard dropped.
    #[must_use]
    pub fn shutdown_timeout(mut self, shutdown_timeout: Option<Duration>) -> NonBlockingBuilder {
        self.shutdown_timeout = shutdown_timeout;
        self
    }

    /// Override the worker thread's name.
    #[must_use]
    pub fn thread_name(mut self, name: impl Into<String>) -> NonBlockingBuilder {
        self.thread_name = name.into();
        self
    }

    /// Completes the builder, spawning the worker thread.
    pub fn finish<T: Write + Send + 'static>(
        self,
        writer: T,
        trap: Arc<dyn Trap>,
    ) -> Result<(NonBlocking, WorkerGuard), Error> {
        NonBlocking::create(
            writer,
            self.thread_name,
            self.buffered_lines_limit,
            self.shutdown_timeout,
            trap,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Mutex;

    use super::*;
    use crate::DefaultTrap;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_entries_written_in_submission_order() {
        let buf = SharedBuf::default();
        let (writer, guard) = NonBlockingBuilder::default()
            .thread_name("test-ordering")
            .finish(buf.clone(), Arc::new(DefaultTrap::default()))
            .unwrap();

        let handoffs = (0..100)
            .map(|i| writer.send(format!("{i}\n").into_bytes()))
            .collect::<Vec<_>>();
        for handoff in handoffs {
            handoff.wait().unwrap();
        }
        drop(guard);

        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        let lines = text.lines().map(|l| l.parse::<usize>().unwrap()).collect::<Vec<_>>();
        assert_eq!(lines, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_write_failure_reaches_handoff() {
        let (writer, _guard) = NonBlockingBuilder::default()
            .buffered_lines_limit(Some(4))
            .finish(BrokenWriter, Arc::new(DefaultTrap::default()))
            .unwrap();

        let err = writer.send(b"lost".to_vec()).wait().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SinkWrite);
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_flush_completes() {
        let (writer, _guard) = NonBlockingBuilder::default()
            .finish(SharedBuf::default(), Arc::new(DefaultTrap::default()))
            .unwrap();
        writer.flush().wait().unwrap();
    }
}
