use std::collections::VecDeque;

use crate::grid::{Coord, Direction};

pub struct Snake {
    // Head first
    body: VecDeque<Coord>,
    direction: Direction,
    turned_this_tick: bool,
    pending_growth: bool,
    vacated_tail: Option<Coord>,
}

impl Snake {
    /// Builds a straight snake of `size` segments whose head sits at `head`,
    /// with the rest of the body trailing behind it.
    pub fn new(head: Coord, size: usize, direction: Direction) -> Self {
        assert!(size >= 1, "a snake needs at least one segment");

        let (dx, dy) = direction.delta();
        let body = (0..size as i32)
            .map(|i| Coord::new(head.x - dx * i, head.y - dy * i))
            .collect();

        Snake { body, direction, turned_this_tick: false, pending_growth: false, vacated_tail: None }
    }

    #[cfg(test)]
    pub fn from_segments(segments: &[Coord], direction: Direction) -> Self {
        assert!(!segments.is_empty());
        Snake {
            body: segments.iter().copied().collect(),
            direction,
            turned_this_tick: false,
            pending_growth: false,
            vacated_tail: None,
        }
    }

    pub fn body(&self) -> &VecDeque<Coord> {
        &self.body
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn head(&self) -> Coord {
        self.body[0]
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Queues a turn for the next step. At most one turn is accepted between two
    /// moves, and never one that reverses the current heading. Returns whether
    /// the request was taken.
    pub fn change_direction(&mut self, requested: Direction) -> bool {
        if self.turned_this_tick || requested == self.direction || requested == self.direction.opposite() {
            return false;
        }

        self.direction = requested;
        self.turned_this_tick = true;
        true
    }

    /// Advances one cell in the current direction and returns the new head.
    pub fn move_step(&mut self) -> Coord {
        let new_head = self.head().step(self.direction);
        self.body.push_front(new_head);
        self.turned_this_tick = false;

        if self.pending_growth {
            self.pending_growth = false;
            self.vacated_tail = None;
        } else {
            self.vacated_tail = self.body.pop_back();
        }

        new_head
    }

    /// Adds one segment. When the last move left a tail cell behind, that cell is
    /// re-attached right away; otherwise the next move keeps its tail.
    pub fn grow(&mut self) {
        match self.vacated_tail.take() {
            Some(tail) => self.body.push_back(tail),
            None => self.pending_growth = true,
        }
    }

    pub fn hits_self(&self) -> bool {
        let head = self.head();
        self.body.iter().skip(1).any(|&pos| pos == head)
    }

    pub fn occupies(&self, pos: Coord) -> bool {
        self.body.contains(&pos)
    }
}
