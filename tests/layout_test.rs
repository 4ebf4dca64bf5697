//! Integration tests for the ticket layout engine.

use bolillero::game::layout::{LayoutError, build_grid, greedy_grid, random_grid, validate_selection};
use bolillero::game::{Grid, evaluate};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::{BTreeSet, HashSet};

fn row_fills(grid: &Grid) -> [usize; 3] {
    let mut fills = [0usize; 3];
    for (ri, row) in grid.rows().iter().enumerate() {
        fills[ri] = row.iter().filter(|c| c.is_some()).count();
    }
    fills
}

#[test]
fn test_random_grids_satisfy_all_invariants() {
    let mut rng = StdRng::seed_from_u64(0xB1460);
    for _ in 0..200 {
        let grid = random_grid(&mut rng);
        grid.validate().expect("random grid must be structurally valid");
        assert_eq!(row_fills(&grid), [5, 5, 5]);
        assert_eq!(grid.numbers().len(), 15);
    }
}

#[test]
fn test_backtracking_accepts_what_greedy_accepts() {
    // Any selection the greedy strategy can place must also pass the
    // authoritative backtracking engine.
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..100 {
        let numbers = random_grid(&mut rng).numbers();
        let greedy = greedy_grid(&numbers).expect("1-or-2-per-column selections fit greedily");
        let backtracked = build_grid(&numbers).expect("backtracking must accept them too");
        greedy.validate().unwrap();
        backtracked.validate().unwrap();
        let a: BTreeSet<u8> = greedy.numbers().into_iter().collect();
        let b: BTreeSet<u8> = backtracked.numbers().into_iter().collect();
        assert_eq!(a, b);
    }
}

#[test]
fn test_strategies_diverge_on_empty_column() {
    // Column 1 (10-19) holds nothing. Backtracking lays the ticket out;
    // greedy refuses because it needs a number in every column.
    let selection = [1, 5, 23, 29, 34, 39, 41, 47, 55, 59, 62, 68, 71, 79, 80];

    let grid = build_grid(&selection).expect("backtracking accepts an empty column");
    grid.validate().unwrap();
    for row in grid.rows() {
        assert_eq!(row[1], None, "column 1 must stay empty");
    }

    assert_eq!(
        greedy_grid(&selection),
        Err(LayoutError::InvalidColumnCount { column: 1, count: 0 })
    );
}

#[test]
fn test_three_in_a_column_is_unsatisfiable_for_both() {
    // 3, 7, 9 all live in column 0; only two rows per column exist.
    let selection = [3, 7, 9, 15, 23, 34, 39, 41, 47, 55, 62, 68, 71, 80, 90];
    assert_eq!(build_grid(&selection), Err(LayoutError::Unsatisfiable));
    assert!(matches!(
        greedy_grid(&selection),
        Err(LayoutError::InvalidColumnCount { column: 0, count: 3 })
    ));
}

#[test]
fn test_incremental_validation_tracks_column_pressure() {
    let mut selection: BTreeSet<u8> = BTreeSet::new();
    for n in [2, 4, 15, 23, 29, 34, 39, 41, 47, 55, 59, 62, 71, 80] {
        selection.insert(n);
        let report = validate_selection(&selection);
        assert!(report.issues.is_empty());
        assert_eq!(report.completable, None, "incomplete selections stay undecided");
    }

    selection.insert(68);
    let report = validate_selection(&selection);
    assert_eq!(report.total, 15);
    assert_eq!(report.completable, Some(true));
    assert!(report.is_ready());
}

#[test]
fn test_incremental_validation_never_contradicts_backtracking() {
    // A complete, issue-free report answering true must mean build_grid
    // succeeds, and vice versa.
    let mut rng = StdRng::seed_from_u64(99);
    for _ in 0..50 {
        let numbers = random_grid(&mut rng).numbers();
        let selection: BTreeSet<u8> = numbers.iter().copied().collect();
        let report = validate_selection(&selection);
        assert_eq!(report.completable, Some(true));
        assert!(build_grid(&numbers).is_ok());
    }
}

#[test]
fn test_full_house_flips_on_final_number() {
    let selection = [1, 5, 12, 18, 23, 34, 39, 41, 47, 55, 62, 68, 71, 80, 90];
    let grid = build_grid(&selection).unwrap();

    let mut drawn: HashSet<u8> = selection[..14].iter().copied().collect();
    let before = evaluate(&grid, &drawn);
    assert_eq!(before.marked, 14);
    assert!(!before.full_house);

    drawn.insert(selection[14]);
    let after = evaluate(&grid, &drawn);
    assert_eq!(after.marked, 15);
    assert!(after.line);
    assert!(after.full_house);
}
