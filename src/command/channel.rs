use std::io::{BufRead as _, Write as _};
use std::sync::mpsc::{self, Receiver, TryRecvError};

use anyhow::Context as _;
use tracing::{debug, info, warn};

use crate::foundation::error::{PanoError, PanoResult};

/// Line-oriented control transport, polled once per tick.
pub trait ControlChannel {
    /// Next pending line, without blocking.
    fn poll_line(&mut self) -> Option<String>;

    /// Send a reply line back to the controller.
    fn reply(&mut self, line: &str);
}

/// Reads commands from stdin on a helper thread; replies go to stdout.
pub struct StdinChannel {
    rx: Receiver<String>,
    closed: bool,
}

impl StdinChannel {
    /// Start the stdin reader thread.
    pub fn spawn() -> PanoResult<Self> {
        let (tx, rx) = mpsc::channel();
        std::thread::Builder::new()
            .name("control-stdin".to_owned())
            .spawn(move || {
                for line in std::io::stdin().lock().lines() {
                    match line {
                        Ok(line) => {
                            if tx.send(line).is_err() {
                                break;
                            }
                        }
                        Err(err) => {
                            warn!(error = %err, "reading control input failed");
                            break;
                        }
                    }
                }
            })
            .context("spawn control reader")
            .map_err(PanoError::from)?;
        Ok(Self { rx, closed: false })
    }
}

impl ControlChannel for StdinChannel {
    fn poll_line(&mut self) -> Option<String> {
        match self.rx.try_recv() {
            Ok(line) => Some(line),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                if !self.closed {
                    info!("control input closed");
                    self.closed = true;
                }
                None
            }
        }
    }

    fn reply(&mut self, line: &str) {
        let mut out = std::io::stdout().lock();
        if let Err(err) = writeln!(out, "{line}").and_then(|()| out.flush()) {
            warn!(error = %err, "writing control reply failed");
        }
    }
}

/// In-process transport; replies are only logged.
impl ControlChannel for Receiver<String> {
    fn poll_line(&mut self) -> Option<String> {
        self.try_recv().ok()
    }

    fn reply(&mut self, line: &str) {
        debug!(reply = line, "control reply");
    }
}
