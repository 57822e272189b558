//! # Connect 4 Board Engine
//!
//! This module implements the authoritative Connect 4 game state.
//! Players take turns dropping discs into columns, trying to get 4 discs
//! in a row (horizontally, vertically, or diagonally).
//!
//! ## Rules
//! - Players alternate dropping discs into the 7 columns of a 6-row grid
//! - Discs fall to the lowest free row of the column
//! - First player to get 4 discs in a row wins
//! - Game is a draw once all 42 cells are filled with no winner
//!
//! ## Winning-possibility masks
//! Each player carries a bitmask of the cells that would complete four in a
//! row for them. The masks are updated incrementally after every placement
//! by scanning only the line windows that pass through the new disc, so win
//! detection and the "clever" move filter never rescan the whole board.
//! A bit, once set, stays set until the board is reset.

use crate::error::{BoardError, ParseMoveError};
use crate::turn::TurnSequencer;
use connect4_shared::{
    cell_index, check_line_win, completes_line, in_bounds, CELLS, COLS, LINE_DIRECTIONS,
    LINE_SIZE, ROWS,
};
use std::fmt;
use std::str::FromStr;

/// Value of an empty cell
pub const EMPTY: i32 = 0;
/// Player id of the side that moves first by default
pub const PLAYER_A: i32 = 1;
/// Player id of the side that moves second by default
pub const PLAYER_B: i32 = -1;

/// Bits per column in the packed bitboards: one per row plus a sentinel
const COLUMN_STRIDE: usize = ROWS + 1;

/// Seed mixed into fingerprints
const FINGERPRINT_SEED: u64 = 0x9e37_79b9_7f4a_7c15;

/// Deterministic fingerprint of the board contents, used as tree key.
pub type Fingerprint = u64;

/// Represents a move in Connect 4
///
/// Contains the column number where a player wants to drop their piece.
/// Column numbers are 0-based indices.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Connect4Move(pub usize);

/// Three-way outcome of a game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    /// Game is still in progress
    InProgress,
    /// Game ended with four in a row for this player
    Won(i32),
    /// Board filled with no winner
    Draw,
}

impl GameStatus {
    /// Check if the game is over
    pub fn is_game_over(&self) -> bool {
        !matches!(self, GameStatus::InProgress)
    }
}

/// Bit of a cell in the packed bitboards
#[inline]
const fn bit(row: usize, col: usize) -> u64 {
    1u64 << (col * COLUMN_STRIDE + row)
}

/// Mask slot of a player id
#[inline]
fn slot(player: i32) -> usize {
    if player == PLAYER_A {
        0
    } else {
        1
    }
}

/// Finalizer of splitmix64; a bijection on `u64`.
#[inline]
fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Represents the complete state of a Connect 4 game
///
/// The board uses 1 for player A discs, -1 for player B discs and 0 for
/// empty cells, stored row-major with row 0 at the bottom. Cloning produces
/// a fully independent deep copy including the turn sequencer; nothing is
/// shared between a state and its clone.
#[derive(Debug, Clone)]
pub struct Connect4State {
    /// The game board as a flat array (row-major, bottom row first)
    board: [i32; CELLS],
    /// Next free row of every column
    heights: [usize; COLS],
    /// Every occupied cell, column-packed
    occupied: u64,
    /// Cells held by player A, column-packed
    player_a_discs: u64,
    /// Winning-possibility masks, indexed by player slot
    winning_cells: [u64; 2],
    /// Player who completed four in a row, if any
    winner: Option<i32>,
    /// Player who dropped the last disc, if any
    last_mover: Option<i32>,
    /// Number of discs played so far
    round: usize,
    /// Whose turn it is
    turns: TurnSequencer,
}

impl fmt::Display for Connect4State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in (0..ROWS).rev() {
            for c in 0..COLS {
                let symbol = match self.board[cell_index(r, c)] {
                    PLAYER_A => "X",
                    PLAYER_B => "O",
                    _ => ".",
                };
                write!(f, "{} ", symbol)?;
            }
            writeln!(f)?;
        }
        for c in 0..COLS {
            write!(f, "{} ", c)?;
        }
        writeln!(f)
    }
}

impl Default for Connect4State {
    fn default() -> Self {
        Self::new()
    }
}

impl Connect4State {
    /// Creates an empty board where player A (1) moves first
    pub fn new() -> Self {
        Self::with_players(vec![PLAYER_A, PLAYER_B])
    }

    /// Creates an empty board with the given turn order
    ///
    /// # Panics
    /// Panics unless `players` is `[1, -1]` or `[-1, 1]`.
    pub fn with_players(players: Vec<i32>) -> Self {
        assert!(
            players == [PLAYER_A, PLAYER_B] || players == [PLAYER_B, PLAYER_A],
            "connect 4 is played by players 1 and -1, got {:?}",
            players
        );
        Self {
            board: [EMPTY; CELLS],
            heights: [0; COLS],
            occupied: 0,
            player_a_discs: 0,
            winning_cells: [0; 2],
            winner: None,
            last_mover: None,
            round: 0,
            turns: TurnSequencer::new(players),
        }
    }

    /// Rebuilds a game from raw cells
    ///
    /// Heights, round counter, winner and winning-possibility masks are
    /// recomputed from the grid. The turn sequencer starts at the first entry
    /// of `players` and is advanced once per disc on the board, so the first
    /// player must hold as many discs as the second or one more.
    pub fn from_cells(cells: [i32; CELLS], players: Vec<i32>) -> Result<Self, BoardError> {
        if players != [PLAYER_A, PLAYER_B] && players != [PLAYER_B, PLAYER_A] {
            return Err(BoardError::InvalidPlayers(players));
        }
        let (first, second) = (players[0], players[1]);
        let mut state = Self::with_players(players);

        for col in 0..COLS {
            let mut gap_seen = false;
            for row in 0..ROWS {
                let value = cells[cell_index(row, col)];
                match value {
                    EMPTY => gap_seen = true,
                    PLAYER_A | PLAYER_B if gap_seen => {
                        return Err(BoardError::FloatingDisc { row, col });
                    }
                    PLAYER_A | PLAYER_B => {
                        state.board[cell_index(row, col)] = value;
                        state.heights[col] += 1;
                        state.occupied |= bit(row, col);
                        if value == PLAYER_A {
                            state.player_a_discs |= bit(row, col);
                        }
                        state.round += 1;
                    }
                    other => return Err(BoardError::InvalidCell { row, col, value: other }),
                }
            }
        }

        let first_discs = state.board.iter().filter(|&&v| v == first).count();
        let second_discs = state.board.iter().filter(|&&v| v == second).count();
        if first_discs != second_discs && first_discs != second_discs + 1 {
            return Err(BoardError::DiscCount {
                first: first_discs,
                second: second_discs,
            });
        }

        for _ in 0..state.round {
            state.turns.advance();
        }
        if state.round > 0 {
            let players = state.turns.players();
            state.last_mover = Some(players[(state.round - 1) % players.len()]);
        }

        for player in [PLAYER_A, PLAYER_B] {
            for row in 0..ROWS {
                for col in 0..COLS {
                    if state.board[cell_index(row, col)] != player
                        && completes_line(&state.board, row, col, player)
                    {
                        state.winning_cells[slot(player)] |= bit(row, col);
                    }
                }
            }
        }

        let winners: Vec<i32> = [PLAYER_A, PLAYER_B]
            .into_iter()
            .filter(|&p| check_line_win(&state.board, p))
            .collect();
        state.winner = match winners.as_slice() {
            [] => None,
            [only] => Some(*only),
            _ => return Err(BoardError::TwoWinners),
        };

        Ok(state)
    }

    /// Resets to an empty board with the same turn order
    pub fn reset(&mut self) {
        let mut turns = self.turns.clone();
        turns.reset();
        *self = Self {
            turns,
            ..Self::with_players(vec![PLAYER_A, PLAYER_B])
        };
    }

    /// Becomes a deep copy of `source`
    pub fn reset_from(&mut self, source: &Connect4State) {
        self.clone_from(source);
    }

    /// Drops a disc for the player to move into `column`
    ///
    /// Updates the column height, round counter and last mover. Returns true
    /// if this disc completes four in a row, or if the game already had a
    /// winner. Otherwise the mover's winning-possibility mask is extended
    /// with the windows through the new disc and false is returned.
    ///
    /// The turn is not advanced; call [`advance_turn`](Self::advance_turn).
    ///
    /// # Panics
    /// Panics if `column` is out of range or full. Callers must offer only
    /// columns from [`available_actions`](Self::available_actions).
    pub fn place(&mut self, column: usize) -> bool {
        let row = self.heights[column];
        assert!(row < ROWS, "column {} is full", column);

        let player = self.turns.current_player();
        self.board[cell_index(row, column)] = player;
        self.heights[column] += 1;
        self.occupied |= bit(row, column);
        if player == PLAYER_A {
            self.player_a_discs |= bit(row, column);
        }
        self.round += 1;
        self.last_mover = Some(player);

        if self.winner.is_some() {
            return true;
        }
        if self.winning_cells[slot(player)] & bit(row, column) != 0 {
            self.winner = Some(player);
            return true;
        }
        self.mark_winning_cells(row, column, player);
        false
    }

    /// Marks the open cell of every window through (`row`, `col`) in which
    /// `player` now holds three of the four cells.
    fn mark_winning_cells(&mut self, row: usize, col: usize, player: i32) {
        let span = LINE_SIZE as i32 - 1;
        for (dr, dc) in LINE_DIRECTIONS {
            for back in 0..=span {
                let start_r = row as i32 - back * dr;
                let start_c = col as i32 - back * dc;
                if !in_bounds(start_r, start_c) || !in_bounds(start_r + span * dr, start_c + span * dc) {
                    continue;
                }

                let mut owned = 0;
                let mut open = None;
                for k in 0..=span {
                    let r = (start_r + k * dr) as usize;
                    let c = (start_c + k * dc) as usize;
                    if self.board[cell_index(r, c)] == player {
                        owned += 1;
                    } else {
                        open = Some((r, c));
                    }
                }

                if owned == span {
                    if let Some((r, c)) = open {
                        self.winning_cells[slot(player)] |= bit(r, c);
                    }
                }
            }
        }
    }

    /// Hands the turn to the next player
    pub fn advance_turn(&mut self) {
        self.turns.advance();
    }

    /// Columns that still have a free row, ascending
    pub fn available_actions(&self) -> Vec<usize> {
        (0..COLS)
            .filter(|&c| self.board[cell_index(ROWS - 1, c)] == EMPTY)
            .collect()
    }

    /// Available columns narrowed by immediate tactics
    ///
    /// 1. columns that win right now for the player to move, else
    /// 2. columns the opponent would win in (forced blocks), else
    /// 3. all columns except those that let the opponent win on top of our
    ///    disc, unless that excludes everything (the game is lost anyway).
    pub fn clever_available_actions(&self) -> Vec<usize> {
        let player = self.turns.current_player();
        let opponent = self.turns.next_player();

        let winning = self.winning_columns(player, 0);
        if !winning.is_empty() {
            return winning;
        }

        let must_block = self.winning_columns(opponent, 0);
        if !must_block.is_empty() {
            return must_block;
        }

        let all_actions = self.available_actions();
        let must_avoid = self.winning_columns(opponent, 1);
        if must_avoid.is_empty() {
            return all_actions;
        }
        let filtered: Vec<usize> = all_actions
            .iter()
            .copied()
            .filter(|c| !must_avoid.contains(c))
            .collect();
        if filtered.is_empty() {
            all_actions
        } else {
            filtered
        }
    }

    /// Columns whose cell `row_offset` above the landing row is a winning
    /// cell for `player`
    fn winning_columns(&self, player: i32, row_offset: usize) -> Vec<usize> {
        let mask = self.winning_cells[slot(player)];
        (0..COLS)
            .filter(|&c| {
                let row = self.heights[c] + row_offset;
                row < ROWS && mask & bit(row, c) != 0
            })
            .collect()
    }

    /// True if a disc of `player` on (`row`, `col`) would complete four in a row
    pub fn is_winning_cell(&self, player: i32, row: usize, col: usize) -> bool {
        self.winning_cells[slot(player)] & bit(row, col) != 0
    }

    /// Raw winning-possibility mask of `player` (column-packed, 7 bits per column)
    pub fn winning_mask(&self, player: i32) -> u64 {
        self.winning_cells[slot(player)]
    }

    /// Deterministic fingerprint of the cell contents
    ///
    /// Turn and round are not included. The packed key (player A discs plus
    /// the occupancy mask, 7 bits per column) is unique for every reachable
    /// board, and the final mix is a bijection, so distinct boards never
    /// share a fingerprint.
    pub fn fingerprint(&self) -> Fingerprint {
        mix64((self.player_a_discs + self.occupied) ^ FINGERPRINT_SEED)
    }

    /// True once all cells are filled without a winner
    pub fn is_draw(&self) -> bool {
        self.round == CELLS && self.winner.is_none()
    }

    /// True if the game is won or drawn
    pub fn is_terminal(&self) -> bool {
        self.winner.is_some() || self.round == CELLS
    }

    /// Three-way game outcome
    pub fn status(&self) -> GameStatus {
        match self.winner {
            Some(player) => GameStatus::Won(player),
            None if self.is_draw() => GameStatus::Draw,
            None => GameStatus::InProgress,
        }
    }

    /// Row a disc dropped into `column` would land on
    #[inline]
    pub fn landing_row(&self, column: usize) -> usize {
        self.heights[column]
    }

    /// Next free row of every column
    pub fn heights(&self) -> &[usize; COLS] {
        &self.heights
    }

    /// Raw cells, row-major with row 0 at the bottom
    pub fn cells(&self) -> &[i32; CELLS] {
        &self.board
    }

    /// Cell value at (`row`, `col`)
    pub fn cell(&self, row: usize, col: usize) -> i32 {
        self.board[cell_index(row, col)]
    }

    pub fn winner(&self) -> Option<i32> {
        self.winner
    }

    pub fn last_mover(&self) -> Option<i32> {
        self.last_mover
    }

    /// Number of discs played
    pub fn round(&self) -> usize {
        self.round
    }

    pub fn current_player(&self) -> i32 {
        self.turns.current_player()
    }

    pub fn next_player(&self) -> i32 {
        self.turns.next_player()
    }

    pub fn turns(&self) -> &TurnSequencer {
        &self.turns
    }

    /// Checks if a move is legal in the current game state
    ///
    /// A move is legal if the column is within bounds and the top row
    /// of that column is empty.
    pub fn is_legal(&self, mv: &Connect4Move) -> bool {
        mv.0 < COLS && self.heights[mv.0] < ROWS
    }
}

impl FromStr for Connect4Move {
    type Err = ParseMoveError;

    /// Creates a Connect4Move from a string representation
    ///
    /// Expected format is just the column number as a string.
    ///
    /// # Examples
    /// ```
    /// use std::str::FromStr;
    /// use mcts::games::connect4::Connect4Move;
    /// let mv = Connect4Move::from_str("3").unwrap();
    /// assert_eq!(mv.0, 3);
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let c = s
            .trim()
            .parse::<usize>()
            .map_err(|_| ParseMoveError::NotANumber(s.trim().to_string()))?;
        if c >= COLS {
            return Err(ParseMoveError::OutOfRange(c));
        }
        Ok(Connect4Move(c))
    }
}
