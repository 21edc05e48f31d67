mod board;
mod config;
mod food;
mod game;
mod grid;
mod scoreboard;
mod snake;
mod term;

use std::{fs::File, path::Path, sync::Mutex};

use anyhow::Context;
use clap::Parser;
use rand::{rngs::StdRng, SeedableRng};
use tracing::Level;

use crate::board::Board;
use crate::config::Args;
use crate::scoreboard::Scoreboard;

pub type TermInt = u16;
pub type ScreenPos = (TermInt, TermInt);

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Some(path) = &args.log_file {
        init_logging(path, args.verbose)?;
    }

    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let board = Board::new(
        args.size.grid(),
        args.category().map(str::to_string),
        Scoreboard::new(args.scoreboard.clone()),
        rng,
    );

    let term = term::TermManager::new().context("failed to read the terminal size")?;
    let mut game = game::SnakeGame::new(term, board);

    // The terminal has to be handed back even when the game failed
    let result = game.run();
    let restored = game.restore().context("failed to restore the terminal");
    result?;
    restored
}

fn init_logging(path: &Path, verbose: bool) -> anyhow::Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create log file {}", path.display()))?;
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(level)
        .init();

    Ok(())
}
