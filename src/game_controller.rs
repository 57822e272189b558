//! # Game Controller Module - Central Game State Management
//!
//! This module provides the `GameController` which serves as the single source of truth
//! for the authoritative game state. It ensures proper separation between:
//!
//! - **Authoritative Game State**: The "real" game state owned by the controller
//! - **Search States**: Clones handed to players, which may mutate them freely
//!
//! ## Architecture Overview
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     GameController                       │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │            Authoritative Game State                │  │
//! │  │  • Single source of truth                          │  │
//! │  │  • All moves validated here before application     │  │
//! │  │  • Move history maintained                         │  │
//! │  └────────────────────────────────────────────────────┘  │
//! │                  │                    │                  │
//! │                  ▼                    ▼                  │
//! │        ┌──────────────────┐  ┌──────────────────┐        │
//! │        │ Player 1         │  │ Player -1        │        │
//! │        │ (cloned state)   │  │ (cloned state)   │        │
//! │        └──────────────────┘  └──────────────────┘        │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Besides single moves the controller drives whole games between two
//! [`Player`]s and series of games with alternating first player.

use crate::error::MoveValidationError;
use crate::games::connect4::{Connect4Move, Connect4State, GameStatus, PLAYER_A, PLAYER_B};
use crate::players::Player;
use connect4_shared::COLS;
use std::fmt::Write as _;
use std::time::SystemTime;
use tracing::{debug, info};

/// Result of a successfully applied move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    /// The applied move
    pub move_made: Connect4Move,
    /// Player who made the move
    pub player: i32,
    /// Row the disc landed on
    pub row: usize,
    /// Game status after the move
    pub status: GameStatus,
}

/// A single entry in the move history
#[derive(Debug, Clone)]
pub struct MoveHistoryEntry {
    /// When the move was made
    pub timestamp: SystemTime,
    /// Player who made the move
    pub player: i32,
    /// The move that was made
    pub move_made: Connect4Move,
    /// Move number (1-indexed)
    pub move_number: usize,
}

impl MoveHistoryEntry {
    /// Create a new move history entry
    pub fn new(player: i32, move_made: Connect4Move, move_number: usize) -> Self {
        Self {
            timestamp: SystemTime::now(),
            player,
            move_made,
            move_number,
        }
    }
}

/// The central game controller that owns the authoritative game state
///
/// # Usage
/// ```rust
/// use mcts::game_controller::GameController;
/// use mcts::games::connect4::{Connect4Move, GameStatus};
///
/// let mut controller = GameController::new();
/// let outcome = controller.try_make_move(Connect4Move(3)).unwrap();
/// assert_eq!(outcome.player, 1);
/// assert_eq!(outcome.status, GameStatus::InProgress);
///
/// // Get a clone for a player to search
/// let state_for_ai = controller.get_state_for_search();
/// assert_eq!(state_for_ai.round(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct GameController {
    /// The authoritative game state
    game_state: Connect4State,
    /// Complete history of moves made
    move_history: Vec<MoveHistoryEntry>,
}

impl Default for GameController {
    fn default() -> Self {
        Self::new()
    }
}

impl GameController {
    /// Create a controller for an empty board where player 1 starts
    pub fn new() -> Self {
        Self::from_state(Connect4State::new())
    }

    /// Create a new game controller with the given initial state
    pub fn from_state(initial_state: Connect4State) -> Self {
        Self {
            game_state: initial_state,
            move_history: Vec::new(),
        }
    }

    /// Validate a move without applying it
    pub fn validate_move(&self, mv: &Connect4Move) -> Result<(), MoveValidationError> {
        if self.is_game_over() {
            return Err(MoveValidationError::GameAlreadyOver);
        }
        if mv.0 >= COLS {
            return Err(MoveValidationError::ColumnOutOfRange(mv.0));
        }
        if !self.game_state.is_legal(mv) {
            return Err(MoveValidationError::ColumnFull(mv.0));
        }
        Ok(())
    }

    /// Attempt to make a move
    ///
    /// Validates the move and applies it if valid.
    pub fn try_make_move(&mut self, mv: Connect4Move) -> Result<MoveOutcome, MoveValidationError> {
        self.validate_move(&mv)?;

        let player = self.game_state.current_player();
        let row = self.game_state.landing_row(mv.0);
        let move_number = self.move_history.len() + 1;

        self.game_state.place(mv.0);
        self.game_state.advance_turn();
        self.move_history.push(MoveHistoryEntry::new(player, mv, move_number));

        Ok(MoveOutcome {
            move_made: mv,
            player,
            row,
            status: self.game_state.status(),
        })
    }

    /// Get a clone of the game state for a player to search
    ///
    /// The returned state can be freely modified without affecting the
    /// authoritative state.
    pub fn get_state_for_search(&self) -> Connect4State {
        self.game_state.clone()
    }

    /// Get a reference to the game state for rendering
    pub fn get_render_state(&self) -> &Connect4State {
        &self.game_state
    }

    /// Get the current player
    pub fn get_current_player(&self) -> i32 {
        self.game_state.current_player()
    }

    /// Get the current game status
    pub fn get_status(&self) -> GameStatus {
        self.game_state.status()
    }

    /// Check if the game is over
    pub fn is_game_over(&self) -> bool {
        self.get_status().is_game_over()
    }

    /// Get the winner if the game is over
    pub fn get_winner(&self) -> Option<i32> {
        self.game_state.winner()
    }

    /// Get the complete move history
    pub fn get_move_history(&self) -> &[MoveHistoryEntry] {
        &self.move_history
    }

    /// Get the number of moves made
    pub fn move_count(&self) -> usize {
        self.move_history.len()
    }

    /// Get the last move made, if any
    pub fn get_last_move(&self) -> Option<&MoveHistoryEntry> {
        self.move_history.last()
    }

    /// Columns offered to the player to move; empty once the game is over
    pub fn get_legal_moves(&self) -> Vec<usize> {
        if self.is_game_over() {
            Vec::new()
        } else {
            self.game_state.clever_available_actions()
        }
    }

    /// Reset the game to the given state
    pub fn reset(&mut self, new_state: Connect4State) {
        self.game_state = new_state;
        self.move_history.clear();
    }

    /// Plays the game to the end, `player_a` moving for player 1 and
    /// `player_b` for player -1. Players are offered the clever actions.
    ///
    /// # Panics
    /// Panics if a player returns a column that is not playable.
    pub fn play_game(&mut self, player_a: &mut dyn Player, player_b: &mut dyn Player) -> GameStatus {
        while !self.is_game_over() {
            let to_move = self.get_current_player();
            let offered = self.get_legal_moves();
            let state = self.get_state_for_search();
            let column = if to_move == PLAYER_A {
                player_a.choose(&state, &offered)
            } else {
                player_b.choose(&state, &offered)
            };

            match self.try_make_move(Connect4Move(column)) {
                Ok(outcome) => debug!(
                    player = outcome.player,
                    column,
                    row = outcome.row,
                    "move played"
                ),
                Err(reason) => panic!("player {} chose column {}: {}", to_move, column, reason),
            }
        }

        let status = self.get_status();
        info!(moves = self.move_count(), ?status, "game over");
        status
    }

    /// Format move history as text
    pub fn format_history(&self) -> String {
        if self.move_history.is_empty() {
            return String::from("No moves made yet.");
        }

        let mut output = String::from("=== Connect 4 Game History ===\n\n");
        for entry in &self.move_history {
            let _ = writeln!(
                output,
                "{}. {} - column {}",
                entry.move_number,
                player_name(entry.player),
                entry.move_made.0
            );
        }

        match self.get_status() {
            GameStatus::Won(winner) => {
                let _ = writeln!(output, "\nResult: {} wins!", player_name(winner));
            }
            GameStatus::Draw => output.push_str("\nResult: Draw\n"),
            GameStatus::InProgress => {
                let _ = writeln!(
                    output,
                    "\n(Game in progress - {} to move)",
                    player_name(self.get_current_player())
                );
            }
        }
        output
    }
}

/// Get a human-readable player name
pub fn player_name(player_id: i32) -> &'static str {
    match player_id {
        PLAYER_A => "Player 1 (X)",
        PLAYER_B => "Player 2 (O)",
        _ => "Unknown player",
    }
}

/// Win/draw counts of a series, per seat
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeriesTally {
    pub first_wins: u32,
    pub second_wins: u32,
    pub draws: u32,
}

impl SeriesTally {
    pub fn games(&self) -> u32 {
        self.first_wins + self.second_wins + self.draws
    }

    /// Adds a game in which `first_player_id` was the first participant's color
    pub fn record(&mut self, status: GameStatus, first_player_id: i32) {
        match status {
            GameStatus::Won(w) if w == first_player_id => self.first_wins += 1,
            GameStatus::Won(_) => self.second_wins += 1,
            GameStatus::Draw => self.draws += 1,
            GameStatus::InProgress => {}
        }
    }

    pub fn merge(mut self, other: SeriesTally) -> SeriesTally {
        self.first_wins += other.first_wins;
        self.second_wins += other.second_wins;
        self.draws += other.draws;
        self
    }
}

/// A finished game of a series
#[derive(Debug, Clone)]
pub struct GameRecord {
    pub status: GameStatus,
    /// Color played by the series' first participant
    pub first_color: i32,
    pub final_state: Connect4State,
    /// Columns in the order they were played
    pub moves: Vec<usize>,
}

/// Plays game number `index` of a series: even games give `first` the
/// opening move, odd games give it to `second`. Both players are reset
/// before the game.
pub fn play_series_game(index: u32, first: &mut dyn Player, second: &mut dyn Player) -> GameRecord {
    first.reset();
    second.reset();

    let (players, first_color) = if index % 2 == 0 {
        (vec![PLAYER_A, PLAYER_B], PLAYER_A)
    } else {
        (vec![PLAYER_B, PLAYER_A], PLAYER_B)
    };

    let mut controller = GameController::from_state(Connect4State::with_players(players));
    let status = if first_color == PLAYER_A {
        controller.play_game(first, second)
    } else {
        controller.play_game(second, first)
    };

    GameRecord {
        status,
        first_color,
        moves: controller.move_history.iter().map(|e| e.move_made.0).collect(),
        final_state: controller.game_state,
    }
}

/// Plays `games` games between two players, alternating who opens.
pub fn play_series(games: u32, first: &mut dyn Player, second: &mut dyn Player) -> SeriesTally {
    let mut tally = SeriesTally::default();
    for index in 0..games {
        let record = play_series_game(index, first, second);
        tally.record(record.status, record.first_color);
    }
    info!(
        games,
        first_wins = tally.first_wins,
        second_wins = tally.second_wins,
        draws = tally.draws,
        "series finished"
    );
    tally
}
