use Direction::*;

/// A cell position in grid units. `x` grows to the right, `y` grows downwards.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub const fn new(x: i32, y: i32) -> Self {
        Coord { x, y }
    }

    pub fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        Coord::new(self.x + dx, self.y + dy)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Up => Down,
            Down => Up,
            Left => Right,
            Right => Left,
        }
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Up => (0, -1),
            Down => (0, 1),
            Left => (-1, 0),
            Right => (1, 0),
        }
    }
}

/// Play area of `cols` x `rows` cells, valid coordinates are `[0, cols) x [0, rows)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    cols: i32,
    rows: i32,
}

impl Grid {
    pub fn new(cols: i32, rows: i32) -> Self {
        assert!(cols > 0 && rows > 0, "grid dimensions must be positive, got {}x{}", cols, rows);
        Grid { cols, rows }
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn contains(&self, pos: Coord) -> bool {
        (0..self.cols).contains(&pos.x) && (0..self.rows).contains(&pos.y)
    }

    pub fn cell_count(&self) -> usize {
        self.cols as usize * self.rows as usize
    }
}
