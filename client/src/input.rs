//! Keyboard input on a dedicated OS thread.
//!
//! crossterm's event reads block, so they stay off the async runtime. The
//! thread polls with a short timeout and checks the shutdown signal between
//! polls; decoded keys are handed to the session over a channel.

use crate::shutdown::Shutdown;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use log::{debug, error};
use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Stab,
    Quit,
}

/// Translates a terminal event into a game key.
///
/// Arrows move, Space stabs, Esc quits. Releases and repeats are ignored.
pub fn key_from_event(event: &Event) -> Option<Key> {
    let Event::Key(KeyEvent { code, kind, .. }) = event else {
        return None;
    };

    if *kind != KeyEventKind::Press {
        return None;
    }

    match code {
        KeyCode::Up => Some(Key::Up),
        KeyCode::Down => Some(Key::Down),
        KeyCode::Left => Some(Key::Left),
        KeyCode::Right => Some(Key::Right),
        KeyCode::Char(' ') => Some(Key::Stab),
        KeyCode::Esc => Some(Key::Quit),
        _ => None,
    }
}

pub struct InputManager {
    handle: Option<JoinHandle<()>>,
}

impl InputManager {
    pub fn spawn(
        sender: mpsc::UnboundedSender<Key>,
        shutdown: Shutdown,
        poll_timeout: Duration,
    ) -> io::Result<Self> {
        let handle = thread::Builder::new()
            .name("arena-input".to_string())
            .spawn(move || Self::run_loop(sender, shutdown, poll_timeout))?;

        Ok(Self {
            handle: Some(handle),
        })
    }

    /// Waits for the input thread; it exits once the shutdown signal fires.
    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }

    fn run_loop(sender: mpsc::UnboundedSender<Key>, shutdown: Shutdown, poll_timeout: Duration) {
        while !shutdown.is_triggered() {
            match event::poll(poll_timeout) {
                Ok(true) => match event::read() {
                    Ok(event) => {
                        if let Some(key) = key_from_event(&event) {
                            if sender.send(key).is_err() {
                                break;
                            }
                        }
                    }
                    Err(e) => error!("Error reading terminal event: {}", e),
                },
                Ok(false) => {}
                Err(e) => {
                    error!("Error polling terminal events: {}", e);
                    break;
                }
            }
        }

        debug!("Input thread finished");
    }
}

/// Blocks until any key is pressed. Used to hold the final board on screen.
pub fn wait_for_any_key() -> io::Result<()> {
    loop {
        if let Event::Key(KeyEvent {
            kind: KeyEventKind::Press,
            ..
        }) = event::read()?
        {
            return Ok(());
        }
    }
}
