//! Reactor / input loop
//!
//! One loop, one thread. Each turn waits for whichever comes first:
//! readable terminal input, the escape-decode timeout, or the earliest
//! timer deadline. The chosen activity runs to completion before the
//! loop waits again, so key handling and timer callbacks never overlap.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

use e_core::config::InputConfig;
use e_core::error::Result;
use e_input::{KeyCode, KeyDecoder};

use crate::runtime::{KeyFlow, KeyHandler, Runtime, ScriptHost};

/// Why `Reactor::run` returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The key handler asked to quit
    Quit,
    /// A script requested a stop
    Stopped,
    /// The input stream reached end of file
    InputClosed,
}

async fn sleep_until_some(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// The editor's event loop
#[derive(Debug)]
pub struct Reactor {
    runtime: Runtime,
    decoder: KeyDecoder,
    running: bool,
    escape_timeout: Duration,
    escape_deadline: Option<Instant>,
    read_chunk: usize,
}

impl Default for Reactor {
    fn default() -> Self {
        Self::new(&InputConfig::default())
    }
}

impl Reactor {
    pub fn new(config: &InputConfig) -> Self {
        Self {
            runtime: Runtime::new(),
            decoder: KeyDecoder::new(),
            running: false,
            escape_timeout: config.escape_timeout(),
            escape_deadline: None,
            read_chunk: config.read_chunk.max(1),
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut Runtime {
        &mut self.runtime
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Run until the handler quits, a script stops the loop, or input
    /// closes. I/O errors on the input are fatal and returned.
    pub async fn run<R, H>(&mut self, input: &mut R, host: &mut H) -> Result<StopReason>
    where
        R: AsyncRead + Unpin,
        H: ScriptHost + KeyHandler,
    {
        self.running = true;
        info!("reactor started");
        let result = self.run_inner(input, host).await;
        self.running = false;
        match &result {
            Ok(reason) => info!(?reason, "reactor stopped"),
            Err(err) => info!(error = %err, "reactor failed"),
        }
        result
    }

    async fn run_inner<R, H>(&mut self, input: &mut R, host: &mut H) -> Result<StopReason>
    where
        R: AsyncRead + Unpin,
        H: ScriptHost + KeyHandler,
    {
        let mut buf = vec![0u8; self.read_chunk];

        loop {
            if self.runtime.take_stop_request() {
                return Ok(StopReason::Stopped);
            }

            let timer_deadline = self.runtime.timers().next_deadline();
            let escape_deadline = self.escape_deadline;

            tokio::select! {
                biased;

                read = input.read(&mut buf) => {
                    let n = read?;
                    if n == 0 {
                        if let Some(key) = self.decoder.flush() {
                            if self.deliver(host, &key) == KeyFlow::Quit {
                                return Ok(StopReason::Quit);
                            }
                        }
                        return Ok(StopReason::InputClosed);
                    }
                    if self.on_readable(&buf[..n], host) == KeyFlow::Quit {
                        return Ok(StopReason::Quit);
                    }
                    // input that never lets up must not starve overdue timers
                    self.fire_overdue(host);
                }

                _ = sleep_until_some(escape_deadline) => {
                    self.escape_deadline = None;
                    if let Some(key) = self.decoder.flush() {
                        debug!("escape timeout");
                        if self.deliver(host, &key) == KeyFlow::Quit {
                            return Ok(StopReason::Quit);
                        }
                    }
                }

                _ = sleep_until_some(timer_deadline) => {
                    self.runtime.fire_due(host, Instant::now());
                }
            }
        }
    }

    /// Decode a batch of bytes and deliver the keys in order. After a
    /// quit the rest of the batch is still decoded, so the decoder ends
    /// idle, but those keys are dropped.
    fn on_readable<H>(&mut self, bytes: &[u8], host: &mut H) -> KeyFlow
    where
        H: ScriptHost + KeyHandler,
    {
        let keys = self.decoder.feed(bytes);
        self.escape_deadline = self
            .decoder
            .is_pending()
            .then(|| Instant::now() + self.escape_timeout);

        let mut flow = KeyFlow::Continue;
        for key in keys {
            if flow == KeyFlow::Quit {
                debug!(%key, "dropping key after quit");
                continue;
            }
            flow = self.deliver(host, &key);
        }
        flow
    }

    fn fire_overdue<H: ScriptHost>(&mut self, host: &mut H) {
        let now = Instant::now();
        if self.runtime.timers().next_deadline().is_some_and(|d| d <= now) {
            self.runtime.fire_due(host, now);
        }
    }

    fn deliver<H>(&mut self, host: &mut H, key: &KeyCode) -> KeyFlow
    where
        H: ScriptHost + KeyHandler,
    {
        let flow = host.handle_key(&mut self.runtime, key);
        self.runtime.release_pending(host);
        flow
    }

    /// Cancel all timers and listeners, returning the number of timers
    pub fn shutdown<H: ScriptHost + ?Sized>(&mut self, host: &mut H) -> usize {
        self.runtime.shutdown(host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use e_core::error::ScriptError;
    use e_core::events::{CallbackId, TargetId};
    use e_input::NamedKey;
    use tokio::io::AsyncWriteExt;

    use crate::runtime::{ScriptScope, ScriptValue};
    use crate::timer::TimerId;

    /// Records keys; `q` quits. Timer callbacks record their id and stop
    /// the loop once `stop_after` timers fired.
    #[derive(Default)]
    struct Recorder {
        keys: Vec<KeyCode>,
        fired: Vec<TimerId>,
        stop_after: usize,
        released: Vec<CallbackId>,
    }

    impl ScriptHost for Recorder {
        fn call(
            &mut self,
            scope: &mut ScriptScope<'_>,
            _callback: CallbackId,
            _target: Option<TargetId>,
            args: &[ScriptValue],
        ) -> std::result::Result<(), ScriptError> {
            if let [ScriptValue::Timer(id)] = args {
                self.fired.push(*id);
                if self.fired.len() >= self.stop_after {
                    scope.request_stop();
                }
            }
            Ok(())
        }

        fn release(&mut self, callback: CallbackId) {
            self.released.push(callback);
        }
    }

    impl KeyHandler for Recorder {
        fn handle_key(&mut self, _runtime: &mut Runtime, key: &KeyCode) -> KeyFlow {
            self.keys.push(key.clone());
            if *key == KeyCode::Char('q') {
                KeyFlow::Quit
            } else {
                KeyFlow::Continue
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_quit_drops_rest_of_batch() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let mut reactor = Reactor::default();
        let mut recorder = Recorder::default();

        client.write_all(b"ab\x1b[Aqzz").await.unwrap();
        let reason = reactor.run(&mut server, &mut recorder).await.unwrap();

        assert_eq!(reason, StopReason::Quit);
        assert_eq!(
            recorder.keys,
            vec![
                KeyCode::Char('a'),
                KeyCode::Char('b'),
                KeyCode::Named(NamedKey::Up),
                KeyCode::Char('q'),
            ]
        );
        assert!(!reactor.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_closed() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let mut reactor = Reactor::default();
        let mut recorder = Recorder::default();

        client.write_all(b"hi").await.unwrap();
        drop(client);

        let reason = reactor.run(&mut server, &mut recorder).await.unwrap();
        assert_eq!(reason, StopReason::InputClosed);
        assert_eq!(recorder.keys, vec![KeyCode::Char('h'), KeyCode::Char('i')]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lone_escape_times_out() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let mut reactor = Reactor::default();
        let mut recorder = Recorder::default();

        let typist = async move {
            client.write_all(b"\x1b").await.unwrap();
            tokio::time::sleep(Duration::from_millis(500)).await;
            client.write_all(b"q").await.unwrap();
            client
        };

        let (reason, _client) = tokio::join!(reactor.run(&mut server, &mut recorder), typist);
        assert_eq!(reason.unwrap(), StopReason::Quit);
        assert_eq!(
            recorder.keys,
            vec![KeyCode::Unrecognized(vec![0x1b]), KeyCode::Char('q')]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_relative_timer_is_consumed_by_one_expiry() {
        let (_client, mut server) = tokio::io::duplex(64);
        let mut reactor = Reactor::default();
        let mut recorder = Recorder {
            stop_after: 1,
            ..Default::default()
        };

        let callback = CallbackId::new(1);
        let id = reactor.runtime_mut().set_timer(callback, 10, false).unwrap();

        let started = Instant::now();
        let reason = reactor.run(&mut server, &mut recorder).await.unwrap();

        assert_eq!(reason, StopReason::Stopped);
        assert_eq!(recorder.fired, vec![id]);
        assert!(Instant::now() - started >= Duration::from_millis(10));
        assert!(!reactor.runtime_mut().clear_timer(id));
        assert_eq!(recorder.released, vec![callback]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timers_fire_while_input_keeps_arriving() {
        let (mut client, mut server) = tokio::io::duplex(64);
        // one byte per read, so input is always ready
        let config = InputConfig {
            read_chunk: 1,
            ..InputConfig::default()
        };
        let mut reactor = Reactor::new(&config);
        let mut recorder = Recorder {
            stop_after: 1,
            ..Default::default()
        };

        let id = reactor.runtime_mut().set_timer(CallbackId::new(1), 0, false).unwrap();
        client.write_all(b"abcq").await.unwrap();

        let reason = reactor.run(&mut server, &mut recorder).await.unwrap();
        assert_eq!(reason, StopReason::Stopped);
        assert_eq!(recorder.keys, vec![KeyCode::Char('a')]);
        assert_eq!(recorder.fired, vec![id]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeating_timer_interleaves_with_keys() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let mut reactor = Reactor::default();
        let mut recorder = Recorder {
            stop_after: 5,
            ..Default::default()
        };

        let id = reactor.runtime_mut().set_timer(CallbackId::new(1), 10, true).unwrap();
        client.write_all(b"x").await.unwrap();

        let reason = reactor.run(&mut server, &mut recorder).await.unwrap();
        assert_eq!(reason, StopReason::Stopped);
        assert_eq!(recorder.keys, vec![KeyCode::Char('x')]);
        assert_eq!(recorder.fired, vec![id; 5]);

        // still outstanding until cancelled
        assert!(reactor.runtime().timers().contains(id));
        assert_eq!(reactor.shutdown(&mut recorder), 1);
        assert!(!reactor.runtime().timers().contains(id));
    }
}
