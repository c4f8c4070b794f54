//! The single consumer of the render command bus.
//!
//! [`Renderer`] turns semantic commands into cell writes on a [`Backend`],
//! handles the board-level directives that arrive as protocol lines, and
//! forwards every other protocol line to the network writer.

use crate::commands::{Command, CommandBus, CommandStream};
use crate::shutdown::{Shutdown, ShutdownReason};
use crossterm::{
    cursor::MoveTo,
    queue,
    style::{self, Print, SetBackgroundColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use log::{debug, error, info, warn};
use shared::{Action, Line, ARENA_WIDTH, BORDER_BOTTOM, BORDER_RIGHT, BORDER_TOP};
use std::io::{self, Write};
use std::time::Duration;
use tokio::sync::mpsc;

pub const FIGHTER_GLYPH: char = '♥';
const HORIZONTAL_BORDER: char = '─';
const VERTICAL_BORDER: char = '│';

pub const BANNER_START: &str = "ARENA!! FIGHT TO THE DEATH!!";
pub const BANNER_DEFEAT: &str = "YOU DIED! - GAME OVER";
pub const BANNER_VICTORY: &str = "YOU WIN!!! - GAME OVER";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Default,
    Black,
    Red,
    Green,
    Yellow,
    Cyan,
}

impl From<Color> for style::Color {
    fn from(color: Color) -> Self {
        match color {
            Color::Default => style::Color::Reset,
            Color::Black => style::Color::Black,
            Color::Red => style::Color::Red,
            Color::Green => style::Color::Green,
            Color::Yellow => style::Color::Yellow,
            Color::Cyan => style::Color::Cyan,
        }
    }
}

/// Cell-level drawing surface.
pub trait Backend: Send {
    fn set_cell(&mut self, x: i32, y: i32, glyph: char, fg: Color, bg: Color) -> io::Result<()>;
    fn clear(&mut self) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
}

/// Backend writing ANSI sequences to stdout through crossterm.
///
/// Writes are queued and only reach the terminal on `flush`.
pub struct CrosstermBackend<W: Write + Send> {
    out: W,
}

impl CrosstermBackend<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write + Send> CrosstermBackend<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write + Send> Backend for CrosstermBackend<W> {
    fn set_cell(&mut self, x: i32, y: i32, glyph: char, fg: Color, bg: Color) -> io::Result<()> {
        let (Ok(col), Ok(row)) = (u16::try_from(x), u16::try_from(y)) else {
            return Ok(());
        };

        queue!(
            self.out,
            MoveTo(col, row),
            SetForegroundColor(fg.into()),
            SetBackgroundColor(bg.into()),
            Print(glyph)
        )
    }

    fn clear(&mut self) -> io::Result<()> {
        queue!(
            self.out,
            SetBackgroundColor(style::Color::Reset),
            Clear(ClearType::All)
        )
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

pub struct Renderer<B: Backend> {
    backend: B,
    bus: CommandBus,
    outbound: mpsc::UnboundedSender<Line>,
    shutdown: Shutdown,
    hit_flash: Duration,
}

impl<B: Backend> Renderer<B> {
    /// `bus` is used only for the delayed half of the hit flash.
    pub fn new(
        backend: B,
        bus: CommandBus,
        outbound: mpsc::UnboundedSender<Line>,
        shutdown: Shutdown,
        hit_flash: Duration,
    ) -> Self {
        Self {
            backend,
            bus,
            outbound,
            shutdown,
            hit_flash,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Clears the screen and draws the banner and the arena border.
    pub fn draw_board(&mut self, message: &str) -> io::Result<()> {
        self.backend.clear()?;

        let mut x = ARENA_WIDTH / 2 - (ARENA_WIDTH / 2) / 2;
        for glyph in message.chars() {
            self.backend.set_cell(x, 0, glyph, Color::Red, Color::Black)?;
            x += 1;
        }

        for x in 1..BORDER_RIGHT {
            self.backend
                .set_cell(x, BORDER_TOP, HORIZONTAL_BORDER, Color::Green, Color::Black)?;
            self.backend
                .set_cell(x, BORDER_BOTTOM, HORIZONTAL_BORDER, Color::Green, Color::Black)?;
        }

        for y in BORDER_TOP..BORDER_BOTTOM {
            self.backend
                .set_cell(0, y, VERTICAL_BORDER, Color::Green, Color::Black)?;
            self.backend
                .set_cell(BORDER_RIGHT, y, VERTICAL_BORDER, Color::Green, Color::Black)?;
        }

        self.backend.flush()
    }

    fn paint(&mut self, x: i32, y: i32, glyph: char, fg: Color) -> io::Result<()> {
        self.backend.set_cell(x, y, glyph, fg, Color::Black)?;
        self.backend.flush()
    }

    pub fn apply(&mut self, command: Command) -> io::Result<()> {
        match command {
            Command::Draw { x, y, enemy } => {
                let fg = if enemy { Color::Red } else { Color::Cyan };
                self.paint(x, y, FIGHTER_GLYPH, fg)
            }
            Command::Hide { x, y } => self.paint(x, y, ' ', Color::Black),
            Command::Hit { x, y } => {
                self.paint(x, y, FIGHTER_GLYPH, Color::Yellow)?;
                self.schedule_hit_fade(x, y);
                Ok(())
            }
            Command::Flush => self.backend.flush(),
            Command::Raw(line) if line.action.is_directive() => self.apply_directive(line),
            Command::Raw(line) => {
                if self.outbound.send(line).is_err() {
                    warn!("Network writer gone, outbound line dropped");
                }
                Ok(())
            }
        }
    }

    /// Turns a struck fighter back to red once the flash delay has passed.
    fn schedule_hit_fade(&self, x: i32, y: i32) {
        let bus = self.bus.clone();
        let delay = self.hit_flash;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            bus.send(Command::Raw(Line::new(Action::RedrawEnemy, 0, x, y)));
        });
    }

    fn apply_directive(&mut self, line: Line) -> io::Result<()> {
        match line.action {
            Action::RefreshBoard => self.backend.flush(),
            Action::Hide => self.paint(line.x, line.y, ' ', Color::Black),
            Action::RedrawEnemy => self.paint(line.x, line.y, FIGHTER_GLYPH, Color::Red),
            Action::RedrawMe => self.paint(line.x, line.y, FIGHTER_GLYPH, Color::Cyan),
            Action::Kill => {
                info!("Defeated");
                self.draw_board(BANNER_DEFEAT)?;
                self.shutdown.trigger(ShutdownReason::Defeat);
                Ok(())
            }
            Action::Win => {
                info!("Victory");
                self.draw_board(BANNER_VICTORY)?;
                self.shutdown.trigger(ShutdownReason::Victory);
                Ok(())
            }
            _ => {
                debug!("Ignoring non-directive {}", line);
                Ok(())
            }
        }
    }

    /// Drains the bus until shutdown or until every sender is gone, then
    /// hands the backend back.
    pub async fn run(mut self, mut stream: CommandStream) -> B {
        let shutdown = self.shutdown.clone();
        loop {
            tokio::select! {
                command = stream.recv() => match command {
                    Some(command) => {
                        if let Err(e) = self.apply(command) {
                            error!("Error drawing to terminal: {}", e);
                        }
                    }
                    None => break,
                },
                reason = shutdown.wait() => {
                    debug!("Renderer stopping: {}", reason);
                    break;
                }
            }
        }

        self.backend
    }
}
