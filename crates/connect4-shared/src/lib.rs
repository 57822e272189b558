#![no_std]

//! Board geometry shared by the Connect Four engine.
//!
//! The board is a flat row-major slice of `ROWS * COLS` cells with row 0 at
//! the bottom. Cells hold `0` for empty and a player id (`1` or `-1`).

/// Number of rows on the board
pub const ROWS: usize = 6;
/// Number of columns on the board
pub const COLS: usize = 7;
/// Total number of cells
pub const CELLS: usize = ROWS * COLS;
/// Number of pieces in a row needed to win
pub const LINE_SIZE: usize = 4;

/// The four line orientations as (row step, column step): vertical,
/// horizontal and the two diagonals. Each orientation covers two of the
/// eight compass directions.
pub const LINE_DIRECTIONS: [(i32, i32); 4] = [(1, 0), (0, 1), (1, 1), (1, -1)];

/// Returns the flat index of a cell.
#[inline]
pub const fn cell_index(row: usize, col: usize) -> usize {
    row * COLS + col
}

/// Returns true if the signed coordinates fall on the board.
#[inline]
pub const fn in_bounds(row: i32, col: i32) -> bool {
    row >= 0 && col >= 0 && row < ROWS as i32 && col < COLS as i32
}

/// Checks whether `player` owning the cell at (`row`, `col`) would give them
/// four in a row through that cell.
///
/// The cell itself is treated as belonging to `player` whatever it holds,
/// so this answers both "did the disc just placed here win" and "would a
/// disc placed here win".
///
/// # Arguments
/// * `board` - The board data as a flat slice
/// * `row` - Row of the probed cell (0 is the bottom)
/// * `col` - Column of the probed cell
/// * `player` - The player ID to check for (e.g., 1 or -1)
pub fn completes_line(board: &[i32], row: usize, col: usize, player: i32) -> bool {
    let get_cell = |r: i32, c: i32| -> i32 {
        if !in_bounds(r, c) {
            return 0;
        }
        board[cell_index(r as usize, c as usize)]
    };

    for (dr, dc) in LINE_DIRECTIONS {
        let mut run = 1;
        for sign in [1, -1] {
            let mut r = row as i32 + sign * dr;
            let mut c = col as i32 + sign * dc;
            while get_cell(r, c) == player {
                run += 1;
                r += sign * dr;
                c += sign * dc;
            }
        }
        if run >= LINE_SIZE {
            return true;
        }
    }
    false
}

/// Checks the whole board for four in a row of `player`.
///
/// This is the slow reference scan; the engine tracks wins incrementally
/// and uses this only when rebuilding state from raw cells.
pub fn check_line_win(board: &[i32], player: i32) -> bool {
    let line = LINE_SIZE as i32;
    for row in 0..ROWS as i32 {
        for col in 0..COLS as i32 {
            for (dr, dc) in LINE_DIRECTIONS {
                let end_r = row + dr * (line - 1);
                let end_c = col + dc * (line - 1);
                if !in_bounds(end_r, end_c) {
                    continue;
                }
                let matched = (0..line).all(|k| {
                    board[cell_index((row + dr * k) as usize, (col + dc * k) as usize)] == player
                });
                if matched {
                    return true;
                }
            }
        }
    }
    false
}
