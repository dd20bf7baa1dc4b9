use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use speedword_core::{
    bag::Tile,
    board::Board,
    judge::Judge,
    scoring::{score_board, solve},
};

fn dict() -> Judge {
    Judge::new([
        "CAT", "ACT", "AT", "QI", "AS", "IS", "ME", "APT", "FAN", "PA", "TAN", "ANT", "NAP",
        "PAN", "TAP", "PAT", "SAT", "MAT", "TEA", "EAT", "ATE", "SEA", "TEN", "NET",
    ])
}

fn served(letters: &str) -> Vec<Tile> {
    letters.chars().filter(|c| c.is_ascii_uppercase()).map(Tile::new).collect()
}

fn boards(c: &mut Criterion) {
    let judge = dict();

    let clean = Board::from_string(
        "C A T _ _\n\
         _ C _ _ _\n\
         _ T E A _\n\
         _ _ _ T _\n\
         _ _ _ E _",
    );
    let clean_tiles = served("CATCTEATE");
    c.bench_function("clean_board", |b| {
        b.iter(|| score_board(black_box(&clean), black_box(&clean_tiles), &judge))
    });

    let tangled = Board::from_string(
        "A P T _ Q I\n\
         F A N _ A S\n\
         _ T _ _ _ _\n\
         _ _ M A T _",
    );
    let tangled_tiles = served("APTQIFANASTMAT");
    c.bench_function("tangled_board", |b| {
        b.iter(|| score_board(black_box(&tangled), black_box(&tangled_tiles), &judge))
    });

    let dense = Board::from_string(
        "P A T\n\
         A T E\n\
         N E T",
    );
    let dense_tiles = dense.tile_set();
    c.bench_function("dense_pruning", |b| {
        b.iter(|| solve(black_box(&dense_tiles), &judge))
    });
}

criterion_group!(benches, boards);
criterion_main!(benches);
