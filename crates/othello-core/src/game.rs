//! Game state machine.
//!
//! Wraps a [`Board`] with turn tracking. Callers are responsible for
//! serializing access; nothing in here locks.

use crate::board::{Board, Color, Score, CELL_COUNT};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Game phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Moves are being accepted
    InProgress,
    /// Neither player can move
    Finished { score: Score },
}

/// Who moves next after a move has been applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnOutcome {
    /// The opponent moves next
    Next(Color),
    /// The opponent has no legal move, so the mover goes again
    Pass(Color),
    /// Nobody can move
    GameOver(Score),
}

/// Everything that happened as a result of one accepted move
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOutcome {
    pub index: usize,
    pub player: Color,
    /// Cells converted to `player`
    pub flipped: Vec<usize>,
    pub turn: TurnOutcome,
}

/// Errors that can occur when playing a move
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Game is over")]
    GameOver,

    #[error("Not your turn")]
    NotYourTurn,

    #[error("Cell {0} is off the board")]
    OutOfBounds(usize),

    #[error("Illegal move at cell {0}")]
    IllegalMove(usize),
}

/// The complete game state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub board: Board,
    pub current_player: Color,
    pub phase: GamePhase,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    /// Standard opening position with black to move
    pub fn new() -> Self {
        Self {
            board: Board::standard(),
            current_player: Color::Black,
            phase: GamePhase::InProgress,
        }
    }

    /// Start over from the opening position
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, GamePhase::Finished { .. })
    }

    /// Current piece count
    pub fn score(&self) -> Score {
        self.board.score()
    }

    /// Hand the turn to whoever can move next.
    ///
    /// The opponent moves if they can; otherwise the current player goes
    /// again; if neither can, the game is over.
    pub fn advance_turn(&mut self) -> TurnOutcome {
        let opponent = self.current_player.opponent();

        if self.board.has_any_legal_move(opponent) {
            self.current_player = opponent;
            TurnOutcome::Next(opponent)
        } else if self.board.has_any_legal_move(self.current_player) {
            TurnOutcome::Pass(self.current_player)
        } else {
            let score = self.board.score();
            self.phase = GamePhase::Finished { score };
            TurnOutcome::GameOver(score)
        }
    }

    /// Validate and apply a move for `player`, then advance the turn.
    pub fn play(&mut self, player: Color, index: usize) -> Result<MoveOutcome, GameError> {
        if self.is_finished() {
            return Err(GameError::GameOver);
        }
        if player != self.current_player {
            return Err(GameError::NotYourTurn);
        }
        if index >= CELL_COUNT {
            return Err(GameError::OutOfBounds(index));
        }
        if !self.board.is_legal_move(index, player) {
            return Err(GameError::IllegalMove(index));
        }

        let flipped = self.board.apply_move(index, player);
        let turn = self.advance_turn();

        Ok(MoveOutcome {
            index,
            player,
            flipped,
            turn,
        })
    }
}
