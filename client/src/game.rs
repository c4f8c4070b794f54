//! Game session: the registry of live fighter actors and the routing of
//! keyboard events and inbound protocol lines to them.

use crate::commands::{Command, CommandBus};
use crate::fighter::{Fighter, FighterHandle, FighterKind};
use crate::input::Key;
use crate::position_index::PositionIndex;
use crate::shutdown::{Shutdown, ShutdownReason};
use log::{debug, info, warn};
use shared::{Action, Direction, Line};
use std::collections::HashMap;
use std::sync::Arc;

pub struct GameSession {
    local_id: Option<i32>,
    fighters: HashMap<i32, FighterHandle>,
    index: Arc<PositionIndex>,
    bus: CommandBus,
    shutdown: Shutdown,
}

impl GameSession {
    pub fn new(index: Arc<PositionIndex>, bus: CommandBus, shutdown: Shutdown) -> Self {
        Self {
            local_id: None,
            fighters: HashMap::new(),
            index,
            bus,
            shutdown,
        }
    }

    /// Starts an actor for `id` unless one already exists.
    ///
    /// Returns `None` when the id is already registered, so a given id never
    /// gets a second actor.
    pub fn spawn_fighter(
        &mut self,
        id: i32,
        x: i32,
        y: i32,
        kind: FighterKind,
    ) -> Option<FighterHandle> {
        if self.fighters.contains_key(&id) {
            return None;
        }

        let fighter = Fighter::new(id, x, y, kind, Arc::clone(&self.index), self.bus.clone());
        let handle = fighter.spawn(self.shutdown.clone());
        info!("Fighter {} ({:?}) joined at ({}, {})", id, kind, x, y);

        self.fighters.insert(id, handle.clone());
        Some(handle)
    }

    /// Spawns the player's own fighter from the bootstrap line.
    pub fn spawn_local(&mut self, id: i32, x: i32, y: i32) -> Option<FighterHandle> {
        let handle = self.spawn_fighter(id, x, y, FighterKind::Local)?;
        self.local_id = Some(id);
        Some(handle)
    }

    pub fn local(&self) -> Option<&FighterHandle> {
        self.local_id.and_then(|id| self.fighters.get(&id))
    }

    pub fn get(&self, id: i32) -> Option<&FighterHandle> {
        self.fighters.get(&id)
    }

    pub fn contains(&self, id: i32) -> bool {
        self.fighters.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.fighters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fighters.is_empty()
    }

    /// Moves the actor registered as `old` under `new`, telling the actor
    /// about its new id. Returns false if `old` is unknown or `new` is taken.
    pub fn rekey(&mut self, old: i32, new: i32) -> bool {
        if self.fighters.contains_key(&new) {
            return false;
        }
        let Some(mut handle) = self.fighters.remove(&old) else {
            return false;
        };

        if !handle.set_id(new) {
            warn!("Fighter {} is not running, re-keyed anyway", old);
        }
        self.fighters.insert(new, handle);
        if self.local_id == Some(old) {
            self.local_id = Some(new);
        }

        info!("Fighter {} is now {}", old, new);
        true
    }

    /// Routes one inbound line.
    ///
    /// Render directives go straight to the bus. Fighter lines are delivered
    /// to every actor, since each one tracks the last foreign id it saw; a
    /// `pos` for an unknown id spawns that fighter first.
    pub fn handle_line(&mut self, line: Line) {
        if line.action.is_directive() {
            debug!("Directive {}", line);
            self.bus.send(Command::Raw(line));
            return;
        }

        if line.action == Action::Pos && !self.contains(line.id) {
            self.spawn_fighter(line.id, line.x, line.y, FighterKind::Remote);
        }

        for (id, fighter) in &self.fighters {
            if !fighter.send_message(line.clone()) {
                warn!("Fighter {} is not running, dropped {}", id, line);
            }
        }
    }

    /// Maps one key press onto the local fighter.
    pub fn handle_key(&self, key: Key) {
        let direction = match key {
            Key::Quit => {
                info!("Quit requested");
                self.shutdown.trigger(ShutdownReason::Quit);
                return;
            }
            Key::Stab => {
                match self.local() {
                    Some(local) => {
                        if !local.stab() {
                            warn!("Local fighter is not running, dropped stab");
                        }
                    }
                    None => warn!("Key {:?} before the local fighter exists", key),
                }
                return;
            }
            Key::Up => Direction::Up,
            Key::Down => Direction::Down,
            Key::Left => Direction::Left,
            Key::Right => Direction::Right,
        };

        match self.local() {
            Some(local) => {
                if !local.move_in(direction) {
                    warn!("Local fighter is not running, dropped {:?}", key);
                }
            }
            None => warn!("Key {:?} before the local fighter exists", key),
        }
    }
}
