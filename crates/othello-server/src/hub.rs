//! Session hub: the two-player roster, the shared game and event fan-out.
//!
//! The roster and the game sit behind separate locks. When both are needed the
//! roster is always taken first. Broadcast events are pushed onto a single
//! unbounded conduit and delivered by one [`Dispatcher`], so every participant
//! sees them in the same order. Enqueueing never blocks, so it happens while
//! the relevant lock is still held; network writes happen elsewhere.

use othello_core::{Color, GameError, GameState, MoveOutcome, Score, TurnOutcome};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::protocol::ServerMessage;

/// Identifies one websocket connection
pub type ParticipantId = Uuid;

/// Per-connection queue of messages waiting to be written to the socket
pub type Outbox = mpsc::UnboundedSender<ServerMessage>;

const SESSION_FULL: &str = "Only two players are allowed.";
const GAME_STARTING: &str = "Two players connected. The game can begin.";
const PLAYER_LEFT: &str = "A player disconnected. Waiting for a new player.";

#[derive(Debug, Error)]
pub enum HubError {
    #[error("Session is full")]
    SessionFull,

    #[error("Player not in session")]
    NotRegistered,

    #[error("Waiting for a second player")]
    NotStarted,

    #[error(transparent)]
    Game(#[from] GameError),
}

/// Where the session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Fewer than two players connected
    Waiting,
    /// Two players connected, moves accepted
    InProgress,
    /// Decided by score or resignation; waits for the roster to refill
    Finished,
}

/// Work item for the dispatcher
#[derive(Debug)]
enum Dispatch {
    /// Deliver to everyone registered at delivery time
    Broadcast(ServerMessage),
    /// Deregister once everything queued before it has been delivered
    Remove(ParticipantId),
}

struct Participant {
    color: Color,
    outbox: Outbox,
}

#[derive(Default)]
struct Roster {
    participants: HashMap<ParticipantId, Participant>,
}

impl Roster {
    fn len(&self) -> usize {
        self.participants.len()
    }

    /// Black if nobody holds it, then white
    fn free_color(&self) -> Option<Color> {
        Color::ALL
            .into_iter()
            .find(|&c| !self.participants.values().any(|p| p.color == c))
    }
}

struct Session {
    game: GameState,
    status: SessionStatus,
}

/// The single game and its (at most two) players.
pub struct Hub {
    roster: Mutex<Roster>,
    session: Mutex<Session>,
    events: mpsc::UnboundedSender<Dispatch>,
}

impl Hub {
    /// Create the hub and the dispatcher that drains its event conduit.
    pub fn new() -> (Arc<Self>, Dispatcher) {
        let (events, queue) = mpsc::unbounded_channel();
        let hub = Arc::new(Self {
            roster: Mutex::new(Roster::default()),
            session: Mutex::new(Session {
                game: GameState::new(),
                status: SessionStatus::Waiting,
            }),
            events,
        });
        let dispatcher = Dispatcher {
            hub: Arc::clone(&hub),
            queue,
        };
        (hub, dispatcher)
    }

    pub fn participant_count(&self) -> usize {
        self.roster.lock().len()
    }

    pub fn color_of(&self, id: ParticipantId) -> Option<Color> {
        self.roster.lock().participants.get(&id).map(|p| p.color)
    }

    pub fn status(&self) -> SessionStatus {
        self.session.lock().status
    }

    /// Copy of the current game
    #[cfg(test)]
    pub fn game(&self) -> GameState {
        self.session.lock().game.clone()
    }

    fn broadcast(&self, msg: ServerMessage) {
        // The dispatcher holds an Arc to us, so the receiver outlives every send
        let _ = self.events.send(Dispatch::Broadcast(msg));
    }

    /// Register a new connection and tell it its color.
    ///
    /// A third connection gets a single error message on `outbox` and is not
    /// registered. The second connection resets the game and triggers the
    /// start broadcast.
    pub fn on_connect(&self, id: ParticipantId, outbox: Outbox) -> Result<Color, HubError> {
        let mut roster = self.roster.lock();

        let Some(color) = roster.free_color() else {
            warn!("Rejecting {}: session already has two players", id);
            let _ = outbox.send(ServerMessage::error(SESSION_FULL));
            return Err(HubError::SessionFull);
        };

        let _ = outbox.send(ServerMessage::Color { color });
        roster.participants.insert(id, Participant { color, outbox });
        info!("Player {} joined as {}", id, color);

        if roster.len() == 2 {
            let mut session = self.session.lock();
            session.game.reset();
            session.status = SessionStatus::InProgress;
            info!("Two players connected, starting a new game");

            self.broadcast(ServerMessage::Start {
                board: session.game.board.clone(),
                current_player: session.game.current_player,
                message: GAME_STARTING.to_string(),
            });
        }

        Ok(color)
    }

    /// Apply a move for the player behind `id`.
    ///
    /// Accepted moves broadcast the new board, followed by the result when the
    /// game has ended. Rejected moves change nothing and send nothing; browser
    /// clients treat any `error` frame as fatal.
    pub fn on_move(&self, id: ParticipantId, index: usize) -> Result<MoveOutcome, HubError> {
        // Hold the roster until the session is locked so the mover cannot be
        // replaced (and the game reset) in between.
        let roster = self.roster.lock();
        let color = roster
            .participants
            .get(&id)
            .map(|p| p.color)
            .ok_or(HubError::NotRegistered)?;

        let result = {
            let mut session = self.session.lock();
            drop(roster);
            let result = session.play(color, index);
            if let Ok(outcome) = &result {
                self.broadcast(ServerMessage::Update {
                    board: session.game.board.clone(),
                    current_player: session.game.current_player,
                });
                if let TurnOutcome::GameOver(score) = outcome.turn {
                    info!("Game over: {}", score_message(score));
                    self.broadcast(ServerMessage::Winner {
                        message: score_message(score),
                    });
                }
            }
            result
        };

        match &result {
            Ok(outcome) => info!(
                "{} played {} and flipped {} piece(s)",
                color,
                index,
                outcome.flipped.len()
            ),
            Err(e) => warn!("Rejected move {} from {}: {}", index, color, e),
        }

        result
    }

    /// Relay chat text to everyone, tagged with the sender's color.
    pub fn on_chat(&self, id: ParticipantId, text: String) -> Result<(), HubError> {
        let color = self.color_of(id).ok_or(HubError::NotRegistered)?;
        debug!("Chat from {}", color);
        self.broadcast(ServerMessage::Chat {
            chat_message: text,
            color,
        });
        Ok(())
    }

    /// Concede: the opponent wins whatever the board says.
    ///
    /// The resigning player still receives the result; they are deregistered
    /// right after it has been dispatched. Returns the winning color.
    pub fn on_resign(&self, id: ParticipantId) -> Result<Color, HubError> {
        let color = self.color_of(id).ok_or(HubError::NotRegistered)?;
        let winner = color.opponent();
        let message = format!("{} wins by resignation!", winner);
        info!("{} resigned. {}", color, message);

        {
            let mut session = self.session.lock();
            session.status = SessionStatus::Finished;
            self.broadcast(ServerMessage::Winner { message });
        }
        let _ = self.events.send(Dispatch::Remove(id));

        Ok(winner)
    }

    /// Deregister a connection. Returns whether it was registered.
    ///
    /// The remaining player is told to wait; they are not declared winner.
    pub fn on_disconnect(&self, id: ParticipantId) -> bool {
        let mut roster = self.roster.lock();
        let Some(participant) = roster.participants.remove(&id) else {
            return false;
        };
        info!("Player {} ({}) left", id, participant.color);

        if roster.len() < 2 {
            self.session.lock().status = SessionStatus::Waiting;
            self.broadcast(ServerMessage::error(PLAYER_LEFT));
        }

        true
    }
}

impl Session {
    fn play(&mut self, color: Color, index: usize) -> Result<MoveOutcome, HubError> {
        match self.status {
            SessionStatus::Waiting => Err(HubError::NotStarted),
            SessionStatus::Finished => Err(GameError::GameOver.into()),
            SessionStatus::InProgress => {
                let outcome = self.game.play(color, index)?;
                if self.game.is_finished() {
                    self.status = SessionStatus::Finished;
                }
                Ok(outcome)
            }
        }
    }
}

fn score_message(score: Score) -> String {
    format!("{} ({}-{})", score.verdict, score.black, score.white)
}

/// Single consumer of the hub's event conduit.
pub struct Dispatcher {
    hub: Arc<Hub>,
    queue: mpsc::UnboundedReceiver<Dispatch>,
}

impl Dispatcher {
    /// Deliver events until the hub goes away.
    pub async fn run(mut self) {
        while let Some(item) = self.queue.recv().await {
            self.handle(item);
        }
    }

    /// Deliver whatever is queued right now without waiting.
    #[cfg(test)]
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(item) = self.queue.try_recv() {
            self.handle(item);
            handled += 1;
        }
        handled
    }

    fn handle(&self, item: Dispatch) {
        match item {
            Dispatch::Broadcast(msg) => self.deliver(msg),
            Dispatch::Remove(id) => {
                self.hub.on_disconnect(id);
            }
        }
    }

    fn deliver(&self, msg: ServerMessage) {
        let recipients: Vec<(ParticipantId, Outbox)> = self
            .hub
            .roster
            .lock()
            .participants
            .iter()
            .map(|(id, p)| (*id, p.outbox.clone()))
            .collect();

        debug!("Dispatching {} to {} player(s)", msg.kind(), recipients.len());

        for (id, outbox) in recipients {
            if outbox.send(msg.clone()).is_err() {
                warn!("Writer for {} is gone, dropping player", id);
                self.hub.on_disconnect(id);
            }
        }
    }
}
