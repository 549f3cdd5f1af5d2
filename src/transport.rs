//! Byte transport to the receiver.
//!
//! The session only ever talks to a [`Transport`]; serial ports, TCP
//! sockets and the `mock::MockTransport` used in tests all sit behind it.
//! The mock is only built with the `test-util` feature.

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Asynchronous byte-level link to a receiver
#[async_trait]
pub trait Transport: Send {
    /// Open (or reopen) the link
    async fn open(&mut self) -> Result<()>;

    /// Close the link. Closing a closed link is not an error.
    async fn close(&mut self) -> Result<()>;

    /// Write all bytes
    async fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Read whatever is available into `buf`.
    ///
    /// Waits up to `timeout` and returns [`AvrError::Timeout`](crate::AvrError::Timeout)
    /// if nothing arrived. `Ok(0)` means the peer closed the link.
    async fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    fn is_open(&self) -> bool;
}

#[cfg(any(test, feature = "test-util"))]
pub mod mock {
    //! Scriptable in-memory transport for tests.

    use super::Transport;
    use crate::error::{AvrError, Result};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct MockState {
        open: bool,
        link_down: bool,
        inbound: VecDeque<Vec<u8>>,
        responders: Vec<(Vec<u8>, Vec<u8>)>,
        writes: Vec<Vec<u8>>,
        failing_opens: usize,
        opens: usize,
        closes: usize,
    }

    /// In-memory transport.
    ///
    /// Clones share state, so a test can keep one handle while the session
    /// owns another. Writes are recorded; a write matching a responder
    /// queues the scripted reply for reading.
    #[derive(Debug, Clone, Default)]
    pub struct MockTransport {
        state: Arc<Mutex<MockState>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        fn state(&self) -> MutexGuard<'_, MockState> {
            self.state.lock().unwrap_or_else(PoisonError::into_inner)
        }

        /// Queue bytes to be returned by the next read
        pub fn push_inbound(&self, data: &[u8]) {
            self.state().inbound.push_back(data.to_vec());
        }

        /// Reply with `response` whenever exactly `request` is written
        pub fn respond(&self, request: &[u8], response: &[u8]) {
            self.state()
                .responders
                .push((request.to_vec(), response.to_vec()));
        }

        /// Acknowledge probes the way the receiver does
        pub fn acknowledge_probes(&self) {
            self.respond(b"\r\n", b"R\r\n");
        }

        /// Make the next `count` opens fail
        pub fn fail_opens(&self, count: usize) {
            self.state().failing_opens = count;
        }

        /// Break the link: reads and writes fail until the next open
        pub fn drop_link(&self) {
            self.state().link_down = true;
        }

        /// Every write so far
        pub fn writes(&self) -> Vec<Vec<u8>> {
            self.state().writes.clone()
        }

        /// Every write so far, as text with the terminator stripped
        pub fn written_lines(&self) -> Vec<String> {
            self.state()
                .writes
                .iter()
                .map(|w| {
                    String::from_utf8_lossy(w)
                        .trim_end_matches("\r\n")
                        .to_string()
                })
                .collect()
        }

        pub fn clear_writes(&self) {
            self.state().writes.clear();
        }

        /// Successful opens
        pub fn open_count(&self) -> usize {
            self.state().opens
        }

        pub fn close_count(&self) -> usize {
            self.state().closes
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn open(&mut self) -> Result<()> {
            let mut state = self.state();
            if state.failing_opens > 0 {
                state.failing_opens -= 1;
                return Err(AvrError::Transport("connection refused".to_string()));
            }
            state.open = true;
            state.link_down = false;
            state.opens += 1;
            Ok(())
        }

        async fn close(&mut self) -> Result<()> {
            let mut state = self.state();
            state.open = false;
            state.closes += 1;
            Ok(())
        }

        async fn write(&mut self, data: &[u8]) -> Result<()> {
            let mut state = self.state();
            if !state.open {
                return Err(AvrError::NotConnected);
            }
            if state.link_down {
                return Err(AvrError::Transport("broken pipe".to_string()));
            }
            state.writes.push(data.to_vec());

            let replies: Vec<Vec<u8>> = state
                .responders
                .iter()
                .filter(|(request, _)| request == data)
                .map(|(_, response)| response.clone())
                .collect();
            state.inbound.extend(replies);
            Ok(())
        }

        async fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
            for attempt in 0..2 {
                {
                    let mut state = self.state();
                    if !state.open {
                        return Err(AvrError::NotConnected);
                    }
                    if state.link_down {
                        return Err(AvrError::Transport("connection reset".to_string()));
                    }
                    if let Some(mut chunk) = state.inbound.pop_front() {
                        let n = chunk.len().min(buf.len());
                        buf[..n].copy_from_slice(&chunk[..n]);
                        if n < chunk.len() {
                            state.inbound.push_front(chunk.split_off(n));
                        }
                        return Ok(n);
                    }
                }
                if attempt == 0 {
                    tokio::time::sleep(timeout).await;
                }
            }
            Err(AvrError::Timeout)
        }

        fn is_open(&self) -> bool {
            self.state().open
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn responders_queue_replies() {
            let mock = MockTransport::new();
            mock.respond(b"?V\r\n", b"VOL081\r\n");
            let mut transport = mock.clone();
            transport.open().await.unwrap();

            transport.write(b"?V\r\n").await.unwrap();
            let mut buf = [0u8; 4];
            let n = transport.read(&mut buf, Duration::from_millis(100)).await.unwrap();
            assert_eq!(&buf[..n], b"VOL0");
            let n = transport.read(&mut buf, Duration::from_millis(100)).await.unwrap();
            assert_eq!(&buf[..n], b"81\r\n");

            let err = transport.read(&mut buf, Duration::from_millis(100)).await;
            assert!(matches!(err, Err(AvrError::Timeout)));
            assert_eq!(mock.written_lines(), vec!["?V"]);
        }

        #[tokio::test]
        async fn scripted_open_failures() {
            let mut mock = MockTransport::new();
            mock.fail_opens(1);
            assert!(mock.open().await.is_err());
            assert!(!mock.is_open());
            assert!(mock.open().await.is_ok());
            assert_eq!(mock.open_count(), 1);
        }

        #[tokio::test]
        async fn dropped_link_fails_until_reopened() {
            let mut mock = MockTransport::new();
            mock.open().await.unwrap();
            mock.drop_link();
            assert!(mock.write(b"PO\r\n").await.unwrap_err().is_link_down());

            mock.open().await.unwrap();
            assert!(mock.write(b"PO\r\n").await.is_ok());
        }
    }
}
