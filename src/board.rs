use std::time::Duration;

use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::food::Food;
use crate::grid::{Coord, Direction::{self, *}, Grid};
use crate::scoreboard::{Scoreboard, ScoreboardError};
use crate::snake::Snake;

pub const BASE_INTERVAL: Duration = Duration::from_millis(200);
pub const MIN_INTERVAL: Duration = Duration::from_millis(50);
pub const SPEED_UP_PER_POINT: Duration = Duration::from_millis(5);

const INITIAL_SNAKE_LENGTH: usize = 3;
const START_HEAD: Coord = Coord::new(2, 1);

/// Time between two moves for a given score: linear speed-up, floored at `MIN_INTERVAL`.
pub fn current_interval(score: u32) -> Duration {
    BASE_INTERVAL
        .checked_sub(SPEED_UP_PER_POINT.saturating_mul(score))
        .map_or(MIN_INTERVAL, |interval| interval.max(MIN_INTERVAL))
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    Ready,
    Running,
    Paused,
    Over,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EndCause {
    HitWall,
    HitSelf,
    BoardFilled,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    Moved,
    Ate,
    Ended(EndCause),
}

/// One play session: the snake, its food, the score and the scoreboard the
/// final score goes to.
pub struct Board {
    grid: Grid,
    category: Option<String>,
    snake: Snake,
    food: Food,
    score: u32,
    high_score: u32,
    phase: Phase,
    end_cause: Option<EndCause>,
    scoreboard: Scoreboard,
    save_error: Option<ScoreboardError>,
    rng: StdRng,
}

impl Board {
    pub fn new(grid: Grid, category: Option<String>, scoreboard: Scoreboard, mut rng: StdRng) -> Self {
        let snake = initial_snake();
        assert!(
            snake.body().iter().all(|&pos| grid.contains(pos)) && grid.cell_count() > snake.len(),
            "a {}x{} grid cannot hold the starting snake",
            grid.cols(),
            grid.rows()
        );

        let food = Food::spawn(&grid, &mut rng, |pos| snake.occupies(pos));
        let high_score = scoreboard.highest_score(category.as_deref());
        debug!(path = %scoreboard.path().display(), high_score, "loaded high score");

        Board {
            grid,
            category,
            snake,
            food,
            score: 0,
            high_score,
            phase: Phase::Ready,
            end_cause: None,
            scoreboard,
            save_error: None,
            rng,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn snake(&self) -> &Snake {
        &self.snake
    }

    pub fn food(&self) -> &Food {
        &self.food
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn end_cause(&self) -> Option<EndCause> {
        self.end_cause
    }

    pub fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    /// Why the last final score could not be stored, if it could not.
    pub fn save_error(&self) -> Option<&ScoreboardError> {
        self.save_error.as_ref()
    }

    pub fn interval(&self) -> Duration {
        current_interval(self.score)
    }

    pub fn start(&mut self) {
        if self.phase == Phase::Ready {
            self.phase = Phase::Running;
            info!(
                category = self.category.as_deref().unwrap_or("-"),
                cols = self.grid.cols(),
                rows = self.grid.rows(),
                high_score = self.high_score,
                "round started"
            );
        }
    }

    pub fn toggle_pause(&mut self) {
        self.phase = match self.phase {
            Phase::Running => Phase::Paused,
            Phase::Paused => Phase::Running,
            other => other,
        };
    }

    /// Throws the current round away and starts a new one right away.
    /// The high score is kept.
    pub fn restart(&mut self) {
        self.snake = initial_snake();
        let snake = &self.snake;
        self.food.respawn(&self.grid, &mut self.rng, |pos| snake.occupies(pos));
        self.score = 0;
        self.end_cause = None;
        self.save_error = None;
        self.phase = Phase::Ready;
        self.start();
    }

    /// Forwards a turn request to the snake, returns whether it was taken.
    pub fn steer(&mut self, direction: Direction) -> bool {
        self.phase == Phase::Running && self.snake.change_direction(direction)
    }

    /// Runs one frame. `since_last_move` is the time elapsed since the last
    /// move this board made; the snake only moves once it reaches the interval
    /// for the current score.
    pub fn tick(&mut self, since_last_move: Duration, input: Option<Direction>) -> TickOutcome {
        if self.phase != Phase::Running {
            return TickOutcome::Idle;
        }

        if let Some(direction) = input {
            self.steer(direction);
        }

        if since_last_move < self.interval() {
            return TickOutcome::Idle;
        }

        self.step()
    }

    fn step(&mut self) -> TickOutcome {
        let head = self.snake.move_step();

        if !self.grid.contains(head) {
            return self.end(EndCause::HitWall);
        }

        if self.snake.hits_self() {
            return self.end(EndCause::HitSelf);
        }

        if head != self.food.position() {
            return TickOutcome::Moved;
        }

        self.snake.grow();
        self.score += 1;
        self.high_score = self.high_score.max(self.score);
        debug!(score = self.score, length = self.snake.len(), "food eaten");

        if self.snake.len() >= self.grid.cell_count() {
            return self.end(EndCause::BoardFilled);
        }

        let snake = &self.snake;
        self.food.respawn(&self.grid, &mut self.rng, |pos| snake.occupies(pos));
        TickOutcome::Ate
    }

    fn end(&mut self, cause: EndCause) -> TickOutcome {
        self.phase = Phase::Over;
        self.end_cause = Some(cause);
        info!(?cause, score = self.score, "round over");

        if self.score > 0 {
            if let Err(err) = self.scoreboard.record_score(self.score, self.category.as_deref()) {
                warn!(%err, score = self.score, "final score was not saved");
                self.save_error = Some(err);
            }
        }

        TickOutcome::Ended(cause)
    }
}

fn initial_snake() -> Snake {
    Snake::new(START_HEAD, INITIAL_SNAKE_LENGTH, Right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoreboard::testing::scratch_scoreboard;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use std::fs;

    fn c(x: i32, y: i32) -> Coord {
        Coord::new(x, y)
    }

    fn board(name: &str, cols: i32, rows: i32, category: Option<&str>) -> Board {
        Board::new(
            Grid::new(cols, rows),
            category.map(str::to_string),
            scratch_scoreboard(name),
            StdRng::seed_from_u64(0x5eed),
        )
    }

    fn running(name: &str, cols: i32, rows: i32) -> Board {
        let mut board = board(name, cols, rows, Some("Small"));
        board.start();
        board
    }

    fn segments(board: &Board) -> Vec<Coord> {
        board.snake().body().iter().copied().collect()
    }

    #[test]
    fn interval_speeds_up_then_floors() {
        assert_eq!(current_interval(0), BASE_INTERVAL);
        assert_eq!(current_interval(1), Duration::from_millis(195));
        assert_eq!(current_interval(30), MIN_INTERVAL);
        assert_eq!(current_interval(31), MIN_INTERVAL);
        assert_eq!(current_interval(u32::MAX), MIN_INTERVAL);

        let intervals: Vec<Duration> = (0..100).map(current_interval).collect();
        assert!(intervals.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn new_board_waits_for_start() {
        let mut board = board("ready", 5, 5, None);
        assert_eq!(board.phase(), Phase::Ready);
        assert_eq!(segments(&board), vec![c(2, 1), c(1, 1), c(0, 1)]);
        assert!(!board.snake().occupies(board.food().position()));

        assert_eq!(board.tick(Duration::from_secs(1), None), TickOutcome::Idle);
        assert_eq!(board.snake().head(), c(2, 1));
    }

    #[test]
    fn does_not_move_before_the_interval() {
        let mut board = running("early", 10, 10);
        board.food = Food::at(c(9, 9));

        assert_eq!(board.tick(BASE_INTERVAL - Duration::from_millis(1), None), TickOutcome::Idle);
        assert_eq!(board.snake().head(), c(2, 1));

        assert_eq!(board.tick(BASE_INTERVAL, None), TickOutcome::Moved);
        assert_eq!(segments(&board), vec![c(3, 1), c(2, 1), c(1, 1)]);
    }

    #[test]
    fn eating_grows_scores_and_moves_food() {
        let mut board = running("eat", 5, 5);
        board.food = Food::at(c(3, 1));

        assert_eq!(board.tick(BASE_INTERVAL, None), TickOutcome::Ate);
        assert_eq!(board.score(), 1);
        assert_eq!(board.high_score(), 1);
        assert_eq!(segments(&board), vec![c(3, 1), c(2, 1), c(1, 1), c(0, 1)]);

        let food = board.food().position();
        assert!(board.grid().contains(food));
        assert!(![c(3, 1), c(2, 1), c(1, 1), c(0, 1)].contains(&food));
    }

    #[test]
    fn growth_happens_once_per_meal() {
        let mut board = running("once", 10, 10);
        board.food = Food::at(c(3, 1));
        board.tick(BASE_INTERVAL, None);
        assert_eq!(board.snake().len(), 4);

        board.food = Food::at(c(9, 9));
        board.tick(BASE_INTERVAL, Some(Down));
        board.tick(BASE_INTERVAL, None);
        assert_eq!(board.snake().len(), 4);
    }

    #[test]
    fn leaving_the_grid_ends_the_round() {
        let mut board = running("wall", 5, 5);
        board.snake = Snake::from_segments(&[c(4, 1), c(3, 1), c(2, 1)], Right);
        board.food = Food::at(c(0, 4));
        board.score = 3;

        assert_eq!(board.tick(BASE_INTERVAL, None), TickOutcome::Ended(EndCause::HitWall));
        assert_eq!(board.phase(), Phase::Over);
        assert_eq!(board.scoreboard().highest_score(Some("Small")), 3);
        assert!(board.save_error().is_none());
    }

    #[test]
    fn zero_score_is_not_saved() {
        let mut board = running("nothing", 5, 5);
        board.snake = Snake::from_segments(&[c(2, 0), c(2, 1), c(2, 2)], Up);
        board.food = Food::at(c(0, 4));

        assert_eq!(board.tick(BASE_INTERVAL, None), TickOutcome::Ended(EndCause::HitWall));
        assert!(!board.scoreboard().path().exists());
    }

    #[test]
    fn biting_itself_ends_the_round() {
        let mut board = running("bite", 10, 10);
        board.snake = Snake::from_segments(&[c(4, 3), c(3, 3), c(3, 4), c(4, 4), c(5, 4)], Right);
        // Food under the bite does not save the snake
        board.food = Food::at(c(4, 4));

        assert_eq!(board.tick(BASE_INTERVAL, Some(Down)), TickOutcome::Ended(EndCause::HitSelf));
        assert_eq!(board.score(), 0);
        assert_eq!(board.end_cause(), Some(EndCause::HitSelf));
    }

    #[test]
    fn filling_the_board_is_a_win() {
        let mut board = running("full", 4, 2);
        board.snake = Snake::from_segments(
            &[c(1, 1), c(2, 1), c(3, 1), c(3, 0), c(2, 0), c(1, 0), c(0, 0)],
            Left,
        );
        board.food = Food::at(c(0, 1));

        assert_eq!(board.tick(BASE_INTERVAL, None), TickOutcome::Ended(EndCause::BoardFilled));
        assert_eq!(board.snake().len(), 8);
        assert_eq!(board.score(), 1);
        assert_eq!(board.scoreboard().highest_score(Some("Small")), 1);
    }

    #[test]
    fn nothing_happens_after_game_over() {
        let mut board = running("frozen", 5, 5);
        board.snake = Snake::from_segments(&[c(4, 1), c(3, 1), c(2, 1)], Right);
        board.tick(BASE_INTERVAL, None);
        let body = segments(&board);

        assert_eq!(board.tick(Duration::from_secs(5), Some(Down)), TickOutcome::Idle);
        assert!(!board.steer(Down));
        assert_eq!(segments(&board), body);
    }

    #[test]
    fn reversal_input_is_ignored() {
        let mut board = running("reverse", 10, 10);
        board.food = Food::at(c(9, 9));

        assert_eq!(board.tick(BASE_INTERVAL, Some(Left)), TickOutcome::Moved);
        assert_eq!(board.snake().head(), c(3, 1));
        assert_eq!(board.snake().direction(), Right);
    }

    #[test]
    fn one_turn_between_moves() {
        let mut board = running("turns", 10, 10);
        board.food = Food::at(c(9, 9));

        assert!(board.steer(Down));
        assert!(!board.steer(Left));
        assert_eq!(board.tick(Duration::ZERO, Some(Left)), TickOutcome::Idle);

        board.tick(BASE_INTERVAL, None);
        assert_eq!(board.snake().head(), c(2, 2));
    }

    #[test]
    fn pause_stops_the_clock() {
        let mut board = running("pause", 10, 10);
        board.food = Food::at(c(9, 9));
        board.toggle_pause();
        assert_eq!(board.phase(), Phase::Paused);
        assert_eq!(board.tick(Duration::from_secs(1), None), TickOutcome::Idle);

        board.toggle_pause();
        assert_eq!(board.tick(BASE_INTERVAL, None), TickOutcome::Moved);
    }

    #[test]
    fn restart_keeps_the_high_score() {
        let mut board = running("restart", 5, 5);
        board.food = Food::at(c(3, 1));
        board.tick(BASE_INTERVAL, None);
        board.snake = Snake::from_segments(&[c(4, 1), c(3, 1), c(2, 1)], Right);
        board.tick(BASE_INTERVAL, None);
        assert_eq!(board.phase(), Phase::Over);

        board.restart();
        assert_eq!(board.phase(), Phase::Running);
        assert_eq!(board.score(), 0);
        assert_eq!(board.high_score(), 1);
        assert_eq!(board.end_cause(), None);
        assert_eq!(segments(&board), vec![c(2, 1), c(1, 1), c(0, 1)]);
        assert!(!board.snake().occupies(board.food().position()));
    }

    #[test]
    fn high_score_comes_from_the_scoreboard() {
        let scoreboard = scratch_scoreboard("preloaded");
        scoreboard.record_score(12, Some("Large")).unwrap();
        scoreboard.record_score(40, Some("Small")).unwrap();

        let board = Board::new(
            Grid::new(20, 20),
            Some("Large".to_string()),
            scoreboard,
            StdRng::seed_from_u64(1),
        );
        assert_eq!(board.high_score(), 12);
    }

    #[test]
    fn failed_save_keeps_the_round_alive() {
        let scoreboard = scratch_scoreboard("broken");
        fs::create_dir_all(scoreboard.path()).unwrap();

        let mut board = Board::new(Grid::new(5, 5), None, scoreboard, StdRng::seed_from_u64(3));
        board.start();
        board.snake = Snake::from_segments(&[c(4, 1), c(3, 1), c(2, 1)], Right);
        board.score = 2;

        assert_eq!(board.tick(BASE_INTERVAL, None), TickOutcome::Ended(EndCause::HitWall));
        assert!(board.save_error().is_some());
        assert_eq!(board.score(), 2);

        board.restart();
        assert!(board.save_error().is_none());
    }

    #[test]
    fn food_never_overlaps_over_a_long_game() {
        let mut board = running("long", 6, 6);
        let turns = [Down, Down, Down, Left, Up, Up, Up, Right];
        for turn in turns.iter().cycle().take(200) {
            if board.phase() == Phase::Over {
                break;
            }
            board.tick(BASE_INTERVAL, Some(*turn));
            if board.phase() != Phase::Over {
                assert!(!board.snake().occupies(board.food().position()));
            }
        }
    }

    #[test]
    #[should_panic]
    fn tiny_grid_is_rejected() {
        board("tiny", 2, 1, None);
    }
}
