//! Render command bus.
//!
//! All fighter actors, the network dispatcher and the renderer's own timers
//! push into one channel that a single renderer task drains. Order is FIFO
//! per sender; sends from different tasks interleave in completion order.

use shared::Line;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Paint a fighter glyph. `enemy` selects the remote colour.
    Draw { x: i32, y: i32, enemy: bool },
    /// Blank the cell a fighter is leaving.
    Hide { x: i32, y: i32 },
    /// Flash a fighter that was struck.
    Hit { x: i32, y: i32 },
    /// Push the back buffer to the terminal.
    Flush,
    /// A protocol line: render directives are handled by the renderer,
    /// anything else is written to the server.
    Raw(Line),
}

/// Sending half of the bus. Cheap to clone, one per producer.
#[derive(Debug, Clone)]
pub struct CommandBus {
    tx: mpsc::UnboundedSender<Command>,
}

/// Receiving half of the bus, owned by the renderer task.
#[derive(Debug)]
pub struct CommandStream {
    rx: mpsc::UnboundedReceiver<Command>,
}

pub fn command_bus() -> (CommandBus, CommandStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CommandBus { tx }, CommandStream { rx })
}

impl CommandBus {
    /// Queues a command. Returns false once the renderer has gone away.
    pub fn send(&self, command: Command) -> bool {
        self.tx.send(command).is_ok()
    }
}

impl CommandStream {
    pub async fn recv(&mut self) -> Option<Command> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Command> {
        self.rx.try_recv().ok()
    }

    /// Everything queued right now, without waiting.
    pub fn drain(&mut self) -> Vec<Command> {
        let mut commands = Vec::new();
        while let Some(command) = self.try_recv() {
            commands.push(command);
        }
        commands
    }
}
