//! Terminal input thread feeding the browser's event loop.
//!
//! `crossterm::event::poll` blocks, so input is read on an OS thread rather than a
//! tokio task. Dropping the handler only raises the shutdown flag; the thread exits
//! at its next poll timeout.

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent};
use log::{error, trace};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug)]
pub enum TermEvent {
    Key(KeyEvent),
    /// Nothing happened for a tick; also sent after a resize so the frame is redrawn
    Tick,
    Error(io::Error),
}

pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<TermEvent>,
    shutdown: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl EventHandler {
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = shutdown.clone();

        let thread = std::thread::spawn(move || {
            while !shutdown_flag.load(Ordering::Relaxed) {
                match event::poll(tick_rate) {
                    Err(e) => {
                        let _ = tx.send(TermEvent::Error(e));
                        break;
                    }
                    Ok(false) => {
                        if tx.send(TermEvent::Tick).is_err() {
                            break;
                        }
                        continue;
                    }
                    Ok(true) => {}
                }
                let sent = match event::read() {
                    Ok(CrosstermEvent::Key(key)) => tx.send(TermEvent::Key(key)),
                    Ok(CrosstermEvent::Resize(width, height)) => {
                        trace!("Terminal resized to [{width}x{height}]");
                        tx.send(TermEvent::Tick)
                    }
                    // EINTR
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(()),
                    Err(e) => {
                        let _ = tx.send(TermEvent::Error(e));
                        break;
                    }
                    Ok(_) => Ok(()),
                };
                if sent.is_err() {
                    break;
                }
            }
        });

        Self {
            rx,
            shutdown,
            thread: Some(thread),
        }
    }

    pub async fn next(&mut self) -> Option<TermEvent> {
        self.rx.recv().await
    }

    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                error!("Terminal input thread panicked");
            }
        }
    }
}

impl Drop for EventHandler {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}
