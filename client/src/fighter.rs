//! Fighter actors.
//!
//! A [`Fighter`] is the state of one entity in the arena. It is moved into
//! its own tokio task by [`Fighter::spawn`] and from then on only that task
//! touches it; everything else talks to it through a [`FighterHandle`].
//! Reads of other fighters' positions go through the shared
//! [`PositionIndex`], never through another fighter's fields.

use crate::commands::{Command, CommandBus};
use crate::position_index::PositionIndex;
use crate::shutdown::Shutdown;
use log::{debug, trace};
use shared::{x_in_bounds, y_in_bounds, Action, Direction, Line};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FighterKind {
    /// The fighter controlled from this terminal.
    Local,
    /// A fighter controlled by another client, driven by `pos` lines.
    Remote,
}

/// What the player asked for. Each one is echoed to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAction {
    Move(Direction),
    Stab,
}

/// Mailbox entries processed by the actor loop, one at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FighterMessage {
    Line(Line),
    Act(PlayerAction),
    SetPosition { x: i32, y: i32 },
    SetId(i32),
    SetEnemyId(i32),
    Draw,
}

pub struct Fighter {
    id: i32,
    x: i32,
    y: i32,
    kind: FighterKind,
    enemy_id: i32,
    index: Arc<PositionIndex>,
    bus: CommandBus,
}

impl Fighter {
    /// Creates the fighter and records its starting cell in the index.
    pub fn new(
        id: i32,
        x: i32,
        y: i32,
        kind: FighterKind,
        index: Arc<PositionIndex>,
        bus: CommandBus,
    ) -> Self {
        index.set_position(id, x, y);
        Self {
            id,
            x,
            y,
            kind,
            enemy_id: 0,
            index,
            bus,
        }
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    /// Re-keys the fighter, publishing its position under the new id.
    ///
    /// The old id's index entries are left in place; re-registering the
    /// handle under the new id is the caller's job.
    pub fn set_id(&mut self, id: i32) {
        self.id = id;
        self.index.set_position(id, self.x, self.y);
    }

    pub fn enemy_id(&self) -> i32 {
        self.enemy_id
    }

    pub fn set_enemy_id(&mut self, id: i32) {
        self.enemy_id = id;
    }

    pub fn kind(&self) -> FighterKind {
        self.kind
    }

    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    fn emit(&self, command: Command) {
        if !self.bus.send(command) {
            trace!("Fighter {}: renderer gone, command dropped", self.id);
        }
    }

    pub fn draw(&self) {
        self.emit(Command::Draw {
            x: self.x,
            y: self.y,
            enemy: self.kind == FighterKind::Remote,
        });
    }

    fn hide(&self) {
        self.emit(Command::Hide {
            x: self.x,
            y: self.y,
        });
    }

    /// Steps one cell. Returns whether the step was taken.
    ///
    /// Always emits a `Hide` of the old cell followed by a `Draw` of the
    /// resulting cell, even when the step is refused.
    pub fn move_in(&mut self, direction: Direction) -> bool {
        self.hide();

        let (dx, dy) = direction.delta();
        let target = match (self.x.checked_add(dx), self.y.checked_add(dy)) {
            (Some(new_x), Some(new_y)) => {
                let in_bounds = if dx != 0 {
                    x_in_bounds(new_x)
                } else {
                    y_in_bounds(new_y)
                };
                Some((new_x, new_y)).filter(|_| in_bounds)
            }
            _ => None,
        };

        let accepted = match target {
            Some((new_x, new_y)) if !self.cell_is_occupied(new_x, new_y) => {
                self.x = new_x;
                self.y = new_y;
                self.index.set_position(self.id, self.x, self.y);
                true
            }
            _ => false,
        };

        if !accepted {
            trace!(
                "Fighter {}: move {:?} from ({}, {}) refused",
                self.id,
                direction,
                self.x,
                self.y
            );
        }

        self.draw();
        accepted
    }

    /// No local effect; the stab only matters once it reaches the server.
    pub fn stab(&mut self) {
        debug!("Fighter {} stabs at ({}, {})", self.id, self.x, self.y);
    }

    /// Authoritative placement. Skips bounds and collision checks.
    pub fn set_position(&mut self, x: i32, y: i32) {
        self.hide();
        self.x = x;
        self.y = y;
        self.index.set_position(self.id, x, y);
        self.draw();
    }

    /// Applies a player action and queues the matching line for the server.
    pub fn perform(&mut self, action: PlayerAction) {
        let wire_action = match action {
            PlayerAction::Move(direction) => {
                self.move_in(direction);
                Action::Pos
            }
            PlayerAction::Stab => {
                self.stab();
                Action::Stab
            }
        };

        self.emit(Command::Raw(Line::new(wire_action, self.id, self.x, self.y)));
    }

    fn cell_is_occupied(&self, x: i32, y: i32) -> bool {
        self.index.is_occupied_by(self.enemy_id, x, y)
    }

    /// Reacts to one protocol line seen on the wire.
    pub fn handle_line(&mut self, line: &Line) {
        if line.id == self.id && self.kind == FighterKind::Remote && line.action == Action::Pos {
            self.set_position(line.x, line.y);
            self.emit(Command::Flush);
        }

        if line.id != self.id {
            self.enemy_id = line.id;
        }

        if line.action == Action::Hit && line.id != self.id {
            self.emit(Command::Hit {
                x: self.x,
                y: self.y,
            });
        }
    }

    fn handle_message(&mut self, message: FighterMessage) {
        match message {
            FighterMessage::Line(line) => self.handle_line(&line),
            FighterMessage::Act(action) => self.perform(action),
            FighterMessage::SetPosition { x, y } => self.set_position(x, y),
            FighterMessage::SetId(id) => self.set_id(id),
            FighterMessage::SetEnemyId(id) => self.set_enemy_id(id),
            FighterMessage::Draw => self.draw(),
        }
    }

    /// Draws the fighter and moves it into its own task.
    pub fn spawn(self, shutdown: Shutdown) -> FighterHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = FighterHandle { id: self.id, tx };

        self.draw();
        tokio::spawn(self.run(rx, shutdown));

        handle
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<FighterMessage>, shutdown: Shutdown) {
        debug!("Fighter {} ({:?}) listening", self.id, self.kind);

        loop {
            tokio::select! {
                message = rx.recv() => match message {
                    Some(message) => self.handle_message(message),
                    None => break,
                },
                reason = shutdown.wait() => {
                    debug!("Fighter {} stopping: {}", self.id, reason);
                    break;
                }
            }
        }
    }
}

/// Address of a running fighter actor.
#[derive(Debug, Clone)]
pub struct FighterHandle {
    id: i32,
    tx: mpsc::UnboundedSender<FighterMessage>,
}

impl FighterHandle {
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Queues a message. Returns false if the actor has stopped.
    fn post(&self, message: FighterMessage) -> bool {
        self.tx.send(message).is_ok()
    }

    pub fn send_message(&self, line: Line) -> bool {
        self.post(FighterMessage::Line(line))
    }

    pub fn move_in(&self, direction: Direction) -> bool {
        self.post(FighterMessage::Act(PlayerAction::Move(direction)))
    }

    pub fn stab(&self) -> bool {
        self.post(FighterMessage::Act(PlayerAction::Stab))
    }

    pub fn set_position(&self, x: i32, y: i32) -> bool {
        self.post(FighterMessage::SetPosition { x, y })
    }

    /// Changes the actor's id. Does not re-key any registry holding this
    /// handle; see [`GameSession::rekey`](crate::game::GameSession::rekey).
    pub fn set_id(&mut self, id: i32) -> bool {
        self.id = id;
        self.post(FighterMessage::SetId(id))
    }

    pub fn set_enemy_id(&self, id: i32) -> bool {
        self.post(FighterMessage::SetEnemyId(id))
    }

    pub fn draw(&self) -> bool {
        self.post(FighterMessage::Draw)
    }

    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{command_bus, CommandStream};
    use crate::shutdown::ShutdownReason;
    use shared::{ARENA_WIDTH, MAX_Y, MIN_Y};
    use std::time::Duration;

    fn local_fighter(id: i32, x: i32, y: i32) -> (Fighter, Arc<PositionIndex>, CommandStream) {
        let index = Arc::new(PositionIndex::new());
        let (bus, stream) = command_bus();
        let fighter = Fighter::new(id, x, y, FighterKind::Local, Arc::clone(&index), bus);
        (fighter, index, stream)
    }

    #[test]
    fn test_new_fighter_records_position() {
        let (fighter, index, mut stream) = local_fighter(1, 10, 10);
        assert_eq!(fighter.position(), (10, 10));
        assert_eq!(index.position(1), (10, 10));
        assert!(stream.drain().is_empty());
    }

    #[test]
    fn test_moves_sum_deltas() {
        let (mut fighter, index, _stream) = local_fighter(1, 10, 10);
        let moves = [
            Direction::Right,
            Direction::Right,
            Direction::Down,
            Direction::Left,
            Direction::Down,
            Direction::Up,
        ];

        for direction in moves {
            assert!(fighter.move_in(direction));
        }

        assert_eq!(fighter.position(), (11, 11));
        assert_eq!(index.position(1), (11, 11));
    }

    #[test]
    fn test_move_emits_hide_then_draw() {
        let (mut fighter, _index, mut stream) = local_fighter(1, 10, 10);
        fighter.move_in(Direction::Up);

        assert_eq!(
            stream.drain(),
            vec![
                Command::Hide { x: 10, y: 10 },
                Command::Draw {
                    x: 10,
                    y: 9,
                    enemy: false
                },
            ]
        );
    }

    #[test]
    fn test_blocked_by_tracked_enemy() {
        let (mut fighter, index, mut stream) = local_fighter(1, 10, 10);
        index.set_position(2, 11, 10);
        fighter.set_enemy_id(2);

        assert!(!fighter.move_in(Direction::Right));
        assert_eq!(fighter.position(), (10, 10));
        assert_eq!(
            stream.drain(),
            vec![
                Command::Hide { x: 10, y: 10 },
                Command::Draw {
                    x: 10,
                    y: 10,
                    enemy: false
                },
            ]
        );

        assert!(fighter.move_in(Direction::Down));
        assert_eq!(fighter.position(), (10, 11));
    }

    #[test]
    fn test_untracked_fighter_does_not_block() {
        let (mut fighter, index, _stream) = local_fighter(1, 10, 10);
        index.set_position(3, 11, 10);
        fighter.set_enemy_id(2);

        assert!(fighter.move_in(Direction::Right));
        assert_eq!(fighter.position(), (11, 10));
    }

    #[test]
    fn test_bounds_reject_without_clamping() {
        let (mut fighter, _index, _stream) = local_fighter(1, 0, MIN_Y);
        assert!(!fighter.move_in(Direction::Left));
        assert!(!fighter.move_in(Direction::Up));
        assert_eq!(fighter.position(), (0, MIN_Y));

        let (mut fighter, _index, _stream) = local_fighter(1, ARENA_WIDTH, MAX_Y);
        assert!(!fighter.move_in(Direction::Right));
        assert!(!fighter.move_in(Direction::Down));
        assert_eq!(fighter.position(), (ARENA_WIDTH, MAX_Y));
    }

    #[test]
    fn test_move_from_extreme_coordinate_is_rejected() {
        let (mut fighter, index, _stream) = local_fighter(1, i32::MAX, 10);
        assert!(!fighter.move_in(Direction::Right));
        assert_eq!(fighter.position(), (i32::MAX, 10));

        let (mut fighter, _index2, _stream2) = local_fighter(2, 10, i32::MIN);
        assert!(!fighter.move_in(Direction::Up));
        assert_eq!(fighter.position(), (10, i32::MIN));

        assert_eq!(index.position(1), (i32::MAX, 10));
    }

    #[test]
    fn test_set_id_publishes_under_new_id() {
        let (mut fighter, index, _stream) = local_fighter(1, 12, 14);
        fighter.set_id(5);

        assert_eq!(fighter.id(), 5);
        assert_eq!(index.position(5), (12, 14));
        assert!(index.is_occupied_by(5, 12, 14));
    }

    #[test]
    fn test_perform_queues_wire_line() {
        let (mut fighter, _index, mut stream) = local_fighter(4, 20, 20);
        fighter.perform(PlayerAction::Move(Direction::Left));
        fighter.perform(PlayerAction::Stab);

        let raw: Vec<Line> = stream
            .drain()
            .into_iter()
            .filter_map(|command| match command {
                Command::Raw(line) => Some(line),
                _ => None,
            })
            .collect();

        assert_eq!(
            raw,
            vec![
                Line::new(Action::Pos, 4, 19, 20),
                Line::new(Action::Stab, 4, 19, 20),
            ]
        );
    }

    #[test]
    fn test_stab_has_no_grid_effect() {
        let (mut fighter, _index, mut stream) = local_fighter(1, 10, 10);
        fighter.stab();
        assert_eq!(fighter.position(), (10, 10));
        assert!(stream.drain().is_empty());
    }

    #[test]
    fn test_hit_flashes_own_cell() {
        let (mut fighter, _index, mut stream) = local_fighter(1, 7, 8);
        fighter.handle_line(&Line::parse("hit,2,5,5\n").unwrap());

        assert_eq!(stream.drain(), vec![Command::Hit { x: 7, y: 8 }]);
        assert_eq!(fighter.enemy_id(), 2);
    }

    #[test]
    fn test_hit_on_self_is_ignored() {
        let (mut fighter, _index, mut stream) = local_fighter(1, 7, 8);
        fighter.handle_line(&Line::new(Action::Hit, 1, 7, 8));
        assert!(stream.drain().is_empty());
        assert_eq!(fighter.enemy_id(), 0);
    }

    #[test]
    fn test_remote_pos_is_authoritative() {
        let index = Arc::new(PositionIndex::new());
        let (bus, mut stream) = command_bus();
        let mut fighter = Fighter::new(1, 20, 20, FighterKind::Remote, Arc::clone(&index), bus);

        fighter.handle_line(&Line::parse("pos,1,3,4\n").unwrap());

        assert_eq!(fighter.position(), (3, 4));
        assert_eq!(index.position(1), (3, 4));
        assert_eq!(
            stream.drain(),
            vec![
                Command::Hide { x: 20, y: 20 },
                Command::Draw {
                    x: 3,
                    y: 4,
                    enemy: true
                },
                Command::Flush,
            ]
        );
    }

    #[test]
    fn test_authoritative_pos_ignores_bounds() {
        let index = Arc::new(PositionIndex::new());
        let (bus, _stream) = command_bus();
        let mut fighter = Fighter::new(5, 20, 20, FighterKind::Remote, Arc::clone(&index), bus);

        fighter.handle_line(&Line::new(Action::Pos, 5, 0, 0));
        assert_eq!(fighter.position(), (0, 0));
    }

    #[test]
    fn test_local_ignores_own_pos_echo() {
        let (mut fighter, index, mut stream) = local_fighter(1, 10, 10);
        fighter.handle_line(&Line::new(Action::Pos, 1, 30, 30));

        assert_eq!(fighter.position(), (10, 10));
        assert_eq!(index.position(1), (10, 10));
        assert!(stream.drain().is_empty());
    }

    #[test]
    fn test_enemy_tracking_last_writer_wins() {
        let (mut fighter, _index, _stream) = local_fighter(1, 10, 10);
        fighter.handle_line(&Line::new(Action::Pos, 2, 11, 10));
        fighter.handle_line(&Line::new(Action::Pos, 3, 12, 10));
        assert_eq!(fighter.enemy_id(), 3);
    }

    #[tokio::test]
    async fn test_spawned_actor_processes_messages_in_order() {
        let index = Arc::new(PositionIndex::new());
        let (bus, mut stream) = command_bus();
        let shutdown = Shutdown::new();
        let fighter = Fighter::new(1, 10, 10, FighterKind::Local, Arc::clone(&index), bus);

        let handle = fighter.spawn(shutdown.clone());
        assert_eq!(handle.id(), 1);

        handle.move_in(Direction::Right);
        handle.stab();

        let mut seen = Vec::new();
        while seen.len() < 5 {
            let command = tokio::time::timeout(Duration::from_secs(1), stream.recv())
                .await
                .expect("actor stalled")
                .expect("bus closed");
            seen.push(command);
        }

        assert_eq!(
            seen,
            vec![
                Command::Draw {
                    x: 10,
                    y: 10,
                    enemy: false
                },
                Command::Hide { x: 10, y: 10 },
                Command::Draw {
                    x: 11,
                    y: 10,
                    enemy: false
                },
                Command::Raw(Line::new(Action::Pos, 1, 11, 10)),
                Command::Raw(Line::new(Action::Stab, 1, 11, 10)),
            ]
        );
        assert_eq!(index.position(1), (11, 10));

        shutdown.trigger(ShutdownReason::Quit);
    }

    #[tokio::test]
    async fn test_actor_stops_on_shutdown() {
        let index = Arc::new(PositionIndex::new());
        let (bus, _stream) = command_bus();
        let shutdown = Shutdown::new();
        let handle = Fighter::new(9, 10, 10, FighterKind::Remote, index, bus).spawn(shutdown.clone());

        assert!(handle.is_running());
        shutdown.trigger(ShutdownReason::Disconnected);

        tokio::time::timeout(Duration::from_secs(1), async {
            while handle.is_running() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("actor did not stop");
    }

    #[tokio::test]
    async fn test_handle_set_id_updates_cache() {
        let index = Arc::new(PositionIndex::new());
        let (bus, _stream) = command_bus();
        let shutdown = Shutdown::new();
        let mut handle = Fighter::new(1, 10, 10, FighterKind::Local, index, bus).spawn(shutdown.clone());

        assert!(handle.set_id(6));
        assert_eq!(handle.id(), 6);

        shutdown.trigger(ShutdownReason::Quit);
    }
}
