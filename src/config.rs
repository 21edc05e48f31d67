use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::grid::Grid;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum BoardSize {
    Small,
    Medium,
    Large,
}

impl BoardSize {
    /// Text stored in the scoreboard's category column.
    pub fn label(self) -> &'static str {
        match self {
            BoardSize::Small => "Small",
            BoardSize::Medium => "Medium",
            BoardSize::Large => "Large",
        }
    }

    pub fn grid(self) -> Grid {
        match self {
            BoardSize::Small => Grid::new(10, 10),
            BoardSize::Medium => Grid::new(15, 15),
            BoardSize::Large => Grid::new(20, 20),
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "gridsnake", about = "Classic snake on a fixed grid")]
pub struct Args {
    /// Board size, also used to group the scoreboard
    #[arg(long, value_enum, default_value = "medium")]
    pub size: BoardSize,

    /// Score history file
    #[arg(long, default_value = "scoreboard.txt")]
    pub scoreboard: PathBuf,

    /// Store and compare scores without the board size
    #[arg(long)]
    pub uncategorized: bool,

    /// Seed for food placement
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Log at debug level
    #[arg(long)]
    pub verbose: bool,
}

impl Args {
    pub fn category(&self) -> Option<&'static str> {
        if self.uncategorized {
            None
        } else {
            Some(self.size.label())
        }
    }
}
