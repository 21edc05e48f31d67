use rand::Rng;

use crate::grid::{Coord, Grid};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Food {
    position: Coord,
}

impl Food {
    pub fn spawn<R, F>(grid: &Grid, rng: &mut R, occupied: F) -> Self
    where
        R: Rng + ?Sized,
        F: Fn(Coord) -> bool,
    {
        Food { position: free_cell(grid, rng, occupied) }
    }

    #[cfg(test)]
    pub fn at(position: Coord) -> Self {
        Food { position }
    }

    pub fn position(&self) -> Coord {
        self.position
    }

    pub fn respawn<R, F>(&mut self, grid: &Grid, rng: &mut R, occupied: F)
    where
        R: Rng + ?Sized,
        F: Fn(Coord) -> bool,
    {
        self.position = free_cell(grid, rng, occupied);
    }
}

/// Samples cells uniformly until one is not occupied. The caller must make sure
/// at least one free cell exists, there is no retry limit.
pub fn free_cell<R, F>(grid: &Grid, rng: &mut R, occupied: F) -> Coord
where
    R: Rng + ?Sized,
    F: Fn(Coord) -> bool,
{
    loop {
        let candidate = Coord::new(rng.gen_range(0..grid.cols()), rng.gen_range(0..grid.rows()));
        if !occupied(candidate) {
            return candidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Direction;
    use crate::snake::Snake;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn never_lands_on_the_snake() {
        let grid = Grid::new(5, 5);
        let snake = Snake::new(Coord::new(4, 2), 5, Direction::Right);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..500 {
            let food = Food::spawn(&grid, &mut rng, |pos| snake.occupies(pos));
            assert!(grid.contains(food.position()));
            assert!(!snake.occupies(food.position()));
        }
    }

    #[test]
    fn finds_the_last_free_cell() {
        let grid = Grid::new(3, 3);
        let free = Coord::new(2, 0);
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..20 {
            assert_eq!(free_cell(&grid, &mut rng, |pos| pos != free), free);
        }
    }

    #[test]
    fn respawn_moves_food() {
        let grid = Grid::new(2, 1);
        let mut rng = StdRng::seed_from_u64(1);
        let mut food = Food::at(Coord::new(0, 0));

        food.respawn(&grid, &mut rng, |pos| pos == Coord::new(0, 0));
        assert_eq!(food.position(), Coord::new(1, 0));
    }
}
