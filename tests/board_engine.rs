//! Whole-game checks of the board engine: wins, draws and the invariants of
//! the incremental winning-cell masks.

use connect4_shared::{cell_index, CELLS, COLS, ROWS};
use mcts::games::connect4::{Connect4State, GameStatus, PLAYER_A, PLAYER_B};
use proptest::prelude::*;

/// Plays `columns` in order and returns what each `place` reported.
fn play(game: &mut Connect4State, columns: &[usize]) -> Vec<bool> {
    columns
        .iter()
        .map(|&c| {
            let won = game.place(c);
            game.advance_turn();
            won
        })
        .collect()
}

/// A full game in which no player ever completes four in a row.
const DRAW_SEQUENCE: [usize; CELLS] = [
    1, 4, 6, 6, 6, 0, 2, 0, 3, 6, 3, 3, 5, 3, 6, 1, 0, 3, 0, 4, 3, 5, 0, 6, 5, 2, 2, 5, 1, 2, 2, 0, 2, 5, 4, 5, 4, 4,
    4, 1, 1, 1,
];

#[test]
fn horizontal_four_wins_on_the_fourth_disc() {
    let mut game = Connect4State::new();
    let reports = play(&mut game, &[0, 0, 1, 1, 2, 2]);
    assert!(reports.iter().all(|won| !won));
    assert_eq!(game.winner(), None);
    assert!(game.is_winning_cell(PLAYER_A, 0, 3));

    assert!(game.place(3));
    assert_eq!(game.winner(), Some(PLAYER_A));
    assert_eq!(game.status(), GameStatus::Won(PLAYER_A));
    assert!(game.is_terminal());
}

#[test]
fn vertical_four_wins_in_row_three() {
    let mut game = Connect4State::new();
    let reports = play(&mut game, &[3, 0, 3, 1, 3, 6]);
    assert!(reports.iter().all(|won| !won));

    assert_eq!(game.landing_row(3), 3);
    assert!(game.place(3));
    assert_eq!(game.cell(3, 3), PLAYER_A);
    assert_eq!(game.winner(), Some(PLAYER_A));
}

#[test]
fn second_player_can_win() {
    let mut game = Connect4State::new();
    play(&mut game, &[0, 3, 1, 3, 6, 3, 0]);
    assert!(game.place(3));
    assert_eq!(game.winner(), Some(PLAYER_B));
    assert_eq!(game.last_mover(), Some(PLAYER_B));
}

#[test]
fn full_board_without_four_is_a_draw() {
    let mut game = Connect4State::new();
    for (turn, &column) in DRAW_SEQUENCE.iter().enumerate() {
        assert!(!game.is_terminal(), "game ended early at turn {}", turn);
        assert!(!game.place(column), "turn {} in column {} won", turn, column);
        game.advance_turn();
    }

    assert!(game.is_draw());
    assert!(game.is_terminal());
    assert_eq!(game.winner(), None);
    assert_eq!(game.status(), GameStatus::Draw);
    assert_eq!(game.round(), CELLS);
    assert!(game.available_actions().is_empty());
}

#[test]
fn rebuilt_draw_matches_played_draw() {
    let mut played = Connect4State::new();
    play(&mut played, &DRAW_SEQUENCE);

    let rebuilt = Connect4State::from_cells(*played.cells(), vec![PLAYER_A, PLAYER_B]).unwrap();
    assert!(rebuilt.is_draw());
    assert_eq!(rebuilt.fingerprint(), played.fingerprint());
    assert_eq!(rebuilt.winning_mask(PLAYER_A), played.winning_mask(PLAYER_A));
    assert_eq!(rebuilt.winning_mask(PLAYER_B), played.winning_mask(PLAYER_B));
}

#[test]
fn placing_after_a_win_keeps_reporting_the_win() {
    let mut game = Connect4State::new();
    play(&mut game, &[3, 0, 3, 1, 3, 6, 3]);
    assert_eq!(game.winner(), Some(PLAYER_A));

    // the engine does not forbid moves after a win, it only keeps the winner
    assert!(game.place(5));
    assert_eq!(game.winner(), Some(PLAYER_A));
}

/// Plays up to `picks.len()` moves, each picking among the available
/// columns, and stops at the first terminal state.
fn play_picks(picks: &[usize]) -> (Connect4State, Vec<usize>) {
    let mut game = Connect4State::new();
    let mut moves = Vec::new();
    for &pick in picks {
        if game.is_terminal() {
            break;
        }
        let actions = game.available_actions();
        let column = actions[pick % actions.len()];
        game.place(column);
        game.advance_turn();
        moves.push(column);
    }
    (game, moves)
}

proptest! {
    #[test]
    fn winning_masks_only_grow(picks in prop::collection::vec(0usize..COLS, 0..CELLS)) {
        let mut game = Connect4State::new();
        for pick in picks {
            if game.is_terminal() {
                break;
            }
            let before = [game.winning_mask(PLAYER_A), game.winning_mask(PLAYER_B)];
            let actions = game.available_actions();
            game.place(actions[pick % actions.len()]);
            game.advance_turn();
            prop_assert_eq!(game.winning_mask(PLAYER_A) & before[0], before[0]);
            prop_assert_eq!(game.winning_mask(PLAYER_B) & before[1], before[1]);
        }
    }

    #[test]
    fn clever_actions_are_a_nonempty_subset(picks in prop::collection::vec(0usize..COLS, 0..CELLS)) {
        let (game, _) = play_picks(&picks);
        if !game.is_terminal() {
            let available = game.available_actions();
            let clever = game.clever_available_actions();
            prop_assert!(!clever.is_empty());
            prop_assert!(clever.iter().all(|c| available.contains(c)));
        }
    }

    #[test]
    fn available_actions_are_the_columns_with_room(picks in prop::collection::vec(0usize..COLS, 0..CELLS)) {
        let (game, moves) = play_picks(&picks);
        let open: Vec<usize> = (0..COLS).filter(|&c| game.heights()[c] < ROWS).collect();
        prop_assert_eq!(game.available_actions(), open);
        prop_assert_eq!(game.heights().iter().sum::<usize>(), moves.len());
    }

    #[test]
    fn rebuilding_from_cells_reproduces_the_state(picks in prop::collection::vec(0usize..COLS, 0..CELLS)) {
        let (game, _) = play_picks(&picks);
        let rebuilt = Connect4State::from_cells(*game.cells(), vec![PLAYER_A, PLAYER_B]).unwrap();

        prop_assert_eq!(rebuilt.fingerprint(), game.fingerprint());
        prop_assert_eq!(rebuilt.heights(), game.heights());
        prop_assert_eq!(rebuilt.round(), game.round());
        prop_assert_eq!(rebuilt.winner(), game.winner());
        prop_assert_eq!(rebuilt.current_player(), game.current_player());
        if game.winner().is_none() {
            prop_assert_eq!(rebuilt.winning_mask(PLAYER_A), game.winning_mask(PLAYER_A));
            prop_assert_eq!(rebuilt.winning_mask(PLAYER_B), game.winning_mask(PLAYER_B));
        }
    }

    #[test]
    fn clones_are_independent(picks in prop::collection::vec(0usize..COLS, 0..CELLS - 1)) {
        let (game, _) = play_picks(&picks);
        if !game.is_terminal() {
            let snapshot = game.clone();
            let mut branch = game.clone();
            let column = branch.available_actions()[0];
            branch.place(column);
            branch.advance_turn();

            prop_assert_eq!(game.cells(), snapshot.cells());
            prop_assert_eq!(game.fingerprint(), snapshot.fingerprint());
            prop_assert_ne!(branch.fingerprint(), game.fingerprint());
            prop_assert_eq!(game.cell(snapshot.landing_row(column), column), 0);
        }
    }

    #[test]
    fn fingerprints_ignore_move_order(picks in prop::collection::vec(0usize..COLS, 0..CELLS)) {
        let (game, _) = play_picks(&picks);
        let mut cells = *game.cells();
        let rebuilt = Connect4State::from_cells(cells, vec![PLAYER_A, PLAYER_B]).unwrap();
        prop_assert_eq!(rebuilt.fingerprint(), game.fingerprint());

        // swapping an X disc with an O disc gives a different board of the same
        // disc counts, and a different fingerprint
        let x = (0..CELLS).find(|&i| cells[i] == PLAYER_A);
        let o = (0..CELLS).find(|&i| cells[i] == PLAYER_B);
        if let (Some(x), Some(o)) = (x, o) {
            cells.swap(x, o);
            if let Ok(swapped) = Connect4State::from_cells(cells, vec![PLAYER_A, PLAYER_B]) {
                prop_assert_ne!(swapped.fingerprint(), game.fingerprint());
            }
        }
    }
}

#[test]
fn same_position_through_different_orders_shares_a_fingerprint() {
    let mut a = Connect4State::new();
    play(&mut a, &[3, 2, 4, 5]);
    let mut b = Connect4State::new();
    play(&mut b, &[4, 5, 3, 2]);
    assert_eq!(a.cells(), b.cells());
    assert_eq!(a.fingerprint(), b.fingerprint());
    assert_eq!(a.cell(0, 3), PLAYER_A);
    assert_eq!(a.cells()[cell_index(0, 5)], PLAYER_B);
}
