//! # Turn Sequencer
//!
//! Cyclic player-order generator. The sequencer only knows who moves now and
//! who moves next; deciding when the game ends belongs to the board.

/// Cycles through an ordered list of player ids.
///
/// Cloning gives an independent sequencer that continues from the same
/// position, which is how search branches keep their own turn order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnSequencer {
    /// Player ids in turn order
    players: Vec<i32>,
    /// Index of the player to move
    current_index: usize,
    /// Index of the player moving after them
    next_index: usize,
}

impl TurnSequencer {
    /// Creates a sequencer starting at the first entry of `players`.
    ///
    /// # Panics
    /// Panics if `players` is empty.
    pub fn new(players: Vec<i32>) -> Self {
        assert!(!players.is_empty(), "turn sequencer needs at least one player");
        let next_index = 1 % players.len();
        Self {
            players,
            current_index: 0,
            next_index,
        }
    }

    /// The player whose turn it is
    #[inline]
    pub fn current_player(&self) -> i32 {
        self.players[self.current_index]
    }

    /// The player who moves after the current one
    #[inline]
    pub fn next_player(&self) -> i32 {
        self.players[self.next_index]
    }

    /// Player ids in turn order
    pub fn players(&self) -> &[i32] {
        &self.players
    }

    /// Hands the turn to the next player.
    pub fn advance(&mut self) {
        self.current_index = self.next_index;
        self.next_index = (self.next_index + 1) % self.players.len();
    }

    /// Rewinds to the first player of the list.
    pub fn reset(&mut self) {
        self.current_index = 0;
        self.next_index = 1 % self.players.len();
    }
}
