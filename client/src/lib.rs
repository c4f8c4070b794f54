//! # Arena Client Library
//!
//! Client side of a terminal arena fighting game. Each connected client
//! steers one fighter around a shared grid; positions and hits of the
//! other fighters arrive from the server as `action,id,x,y` text lines.
//!
//! ## Architecture Overview
//!
//! ### Fighter Actors
//! Every fighter, ours and everyone else's, is an actor: a tokio task that
//! owns the fighter's position and processes a mailbox one message at a
//! time. Only that task ever changes the position.
//!
//! ### Shared Position Index
//! Actors publish their committed coordinates to a [`PositionIndex`]
//! shared by `Arc`. A moving fighter consults it to see whether the fighter
//! it is tracking already stands in the target cell. Each read or write
//! takes the lock for that one access only.
//!
//! ### Render Command Bus
//! Actors never touch the terminal. They push `Draw`, `Hide`, `Hit` and
//! `Flush` commands, and protocol lines bound for the server, onto one
//! channel drained by a single renderer task. That task also forwards
//! outbound lines to the network writer.
//!
//! ## Module Organization
//!
//! ### Fighter Module (`fighter`)
//! Fighter state, movement and collision rules, inbound line handling, and
//! the actor loop with its handle.
//!
//! ### Game Module (`game`)
//! The registry of live fighters: spawns one actor per id, routes inbound
//! lines and key presses.
//!
//! ### Input Module (`input`)
//! Keyboard polling on its own thread, mapped to game keys.
//!
//! ### Network Module (`network`)
//! Connection, bootstrap line, the session loop and the socket writer.
//!
//! ### Rendering Module (`rendering`)
//! The renderer task, board drawing, and the crossterm backend.
//!
//! ### Shutdown Module (`shutdown`)
//! One stop signal observed by every loop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::input::Key;
//! use client::network::{Client, ClientConfig};
//! use client::rendering::CrosstermBackend;
//! use client::shutdown::Shutdown;
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::connect(ClientConfig::default()).await?;
//!     let (_key_tx, key_rx) = mpsc::unbounded_channel::<Key>();
//!
//!     let (reason, _backend) = client
//!         .run(CrosstermBackend::stdout(), key_rx, Shutdown::new())
//!         .await?;
//!     println!("session over: {}", reason);
//!     Ok(())
//! }
//! ```

pub mod commands;
pub mod fighter;
pub mod game;
pub mod input;
pub mod network;
pub mod position_index;
pub mod rendering;
pub mod shutdown;

pub use position_index::PositionIndex;
