//! Othello Duel - board engine
//!
//! This crate provides the rules of Othello (Reversi):
//! - An 8x8 board addressed row-major by cell index `0..64`
//! - Move legality and the capture (flip) algorithm
//! - Turn alternation, including passes and game-over detection
//! - Scoring by piece count
//!
//! The engine does no I/O and no locking. A server wraps [`GameState`] in
//! whatever synchronization it needs.

pub mod board;
pub mod game;

// Re-export commonly used types
pub use board::{Board, Cell, Color, Direction, Score, Verdict, BOARD_SIZE, CELL_COUNT};
pub use game::{GameError, GamePhase, GameState, MoveOutcome, TurnOutcome};
