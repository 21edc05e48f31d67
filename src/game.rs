use std::{io, thread::sleep, time::{Duration, Instant}};

use anyhow::bail;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::board::{Board, EndCause, Phase, TickOutcome};
use crate::grid::{Coord, Direction::{*, self}};
use crate::term::TermManager;
use crate::{ScreenPos, TermInt};

const FRAME_INTERVAL_MS: u64 = 5;
// Terminal cells are about twice as tall as wide
const CELL_WIDTH: TermInt = 2;

const SNAKE_BODY_CHAR: char = '█';
const FOOD_CHARS: [char; 2] = ['(', ')'];
const DEAD_SNAKE_CHAR: char = 'X';

enum Flow {
    Continue,
    Quit,
}

/// Terminal front-end: feeds keys and the clock into a `Board` and draws what it holds.
pub struct SnakeGame {
    term: TermManager,
    board: Board,
    origin: ScreenPos,
}

impl SnakeGame {
    pub fn new(term: TermManager, board: Board) -> Self {
        SnakeGame { term, board, origin: (0, 0) }
    }

    /// Runs until the player quits.
    pub fn run(&mut self) -> anyhow::Result<()> {
        self.initialize()?;

        if let Flow::Quit = self.show_intro()? {
            return Ok(());
        }

        loop {
            if let Flow::Quit = self.play()? {
                return Ok(());
            }
            if let Flow::Quit = self.wait_for_restart()? {
                return Ok(());
            }
            self.board.restart();
        }
    }

    pub fn restore(&mut self) -> io::Result<()> {
        self.term.restore()
    }

    ///////////////////////////////////////////////////////////////////////////

    fn initialize(&mut self) -> anyhow::Result<()> {
        self.term.setup()?;

        let (w, h) = self.term.get_terminal_size();
        let (box_w, box_h) = self.box_size();
        // One extra line on top for the score
        if w < box_w || h < box_h + 1 {
            bail!(
                "terminal is {}x{} but a {}x{} board needs at least {}x{}",
                w, h, self.board.grid().cols(), self.board.grid().rows(), box_w, box_h + 1
            );
        }

        self.origin = ((w - box_w) / 2, (h - box_h - 1) / 2 + 1);
        Ok(())
    }

    fn show_intro(&mut self) -> io::Result<Flow> {
        self.draw_screen()?;

        let board_line = format!(
            "Board: {} ({}x{})",
            self.board.category().unwrap_or("custom"),
            self.board.grid().cols(),
            self.board.grid().rows()
        );
        let best_line = format!("Best: {}", self.board.high_score());

        self.term.show_message(&[
            "Arrow keys or WASD to move",
            "Esc to pause",
            "CTRL+C to quit",
            "",
            &board_line,
            &best_line,
            "",
            "Press any key to begin",
        ])?;

        if is_ctrl_c(&self.term.read_key_blocking()?) {
            return Ok(Flow::Quit);
        }

        self.term.hide_message()?;
        self.board.start();
        Ok(Flow::Continue)
    }

    fn play(&mut self) -> io::Result<Flow> {
        self.term.hide_message()?;
        self.draw_screen()?;

        let mut last_move = Instant::now();

        loop {
            sleep(Duration::from_millis(FRAME_INTERVAL_MS));

            let mut dir_change: Option<Direction> = None;
            for key_ev in self.term.read_key_events_queue()? {
                if is_ctrl_c(&key_ev) {
                    return Ok(Flow::Quit);
                }

                match key_ev.code {
                    KeyCode::Char('w') | KeyCode::Up => dir_change = Some(Up),
                    KeyCode::Char('a') | KeyCode::Left => dir_change = Some(Left),
                    KeyCode::Char('s') | KeyCode::Down => dir_change = Some(Down),
                    KeyCode::Char('d') | KeyCode::Right => dir_change = Some(Right),
                    KeyCode::Esc => self.toggle_pause(&mut last_move)?,
                    _ => {}
                }
            }

            match self.board.tick(last_move.elapsed(), dir_change) {
                TickOutcome::Idle => {}
                TickOutcome::Moved | TickOutcome::Ate => {
                    last_move = Instant::now();
                    self.draw_screen()?;
                }
                TickOutcome::Ended(_) => {
                    self.game_over()?;
                    return Ok(Flow::Continue);
                }
            }
        }
    }

    fn wait_for_restart(&mut self) -> io::Result<Flow> {
        loop {
            let key_ev = self.term.read_key_blocking()?;
            if is_ctrl_c(&key_ev) {
                return Ok(Flow::Quit);
            }
            if matches!(key_ev.code, KeyCode::Char(' ') | KeyCode::Enter) {
                return Ok(Flow::Continue);
            }
        }
    }

    fn toggle_pause(&mut self, last_move: &mut Instant) -> io::Result<()> {
        self.board.toggle_pause();

        if self.board.phase() == Phase::Paused {
            self.term.show_message(&["Paused", "Press Esc to resume", "or Ctrl+C to quit"])
        } else {
            // Do not count the pause towards the next move
            *last_move = Instant::now();
            self.term.hide_message()
        }
    }

    fn game_over(&mut self) -> io::Result<()> {
        let cause = self.board.end_cause();
        if cause != Some(EndCause::BoardFilled) {
            let body: Vec<Coord> = self.board.snake().body().iter().copied().collect();
            for pos in body {
                self.print_cell(pos, [DEAD_SNAKE_CHAR; 2])?;
            }
            self.term.flush()?;
        }

        let title = match cause {
            Some(EndCause::BoardFilled) => "You won!",
            _ => "Game over!",
        };

        let mut lines = vec![
            title.to_string(),
            format!("Score: {}", self.board.score()),
            format!("Best: {}", self.board.high_score()),
        ];

        if let Some(err) = self.board.save_error() {
            lines.push(String::new());
            lines.push("Score could not be saved:".to_string());
            lines.push(err.to_string());
        }

        let top = self.board.scoreboard().top_scores(self.board.category());
        if !top.is_empty() {
            lines.push(String::new());
            lines.push("Top scores".to_string());
            for (rank, record) in top.iter().enumerate() {
                lines.push(format!("{}. {:>4}  {}", rank + 1, record.score, record.timestamp));
            }
        }

        lines.push(String::new());
        lines.push("Space to play again,".to_string());
        lines.push("or CTRL+C to quit.".to_string());

        let lines: Vec<&str> = lines.iter().map(String::as_str).collect();
        self.term.show_message(&lines)
    }

    fn draw_screen(&mut self) -> io::Result<()> {
        let (box_w, box_h) = self.box_size();
        self.term.draw_box(self.origin, box_w, box_h)?;

        let status = format!(
            "Score: {:<5} Best: {:<5}",
            self.board.score(),
            self.board.high_score()
        );
        self.term.print_str_at((self.origin.0, self.origin.1 - 1), &status)?;

        let grid = *self.board.grid();
        for y in 0..grid.rows() {
            for x in 0..grid.cols() {
                self.print_cell(Coord::new(x, y), [' '; 2])?;
            }
        }

        let food = self.board.food().position();
        self.print_cell(food, FOOD_CHARS)?;

        let snake = self.board.snake();
        let head = head_char(snake.direction());
        let body: Vec<Coord> = snake.body().iter().copied().collect();
        for (i, pos) in body.into_iter().enumerate() {
            let ch = if i == 0 {head} else {SNAKE_BODY_CHAR};
            self.print_cell(pos, [ch; 2])?;
        }

        self.term.flush()
    }

    fn print_cell(&mut self, pos: Coord, chars: [char; 2]) -> io::Result<()> {
        if !self.board.grid().contains(pos) {
            return Ok(());
        }

        let x = self.origin.0 + 1 + pos.x as TermInt * CELL_WIDTH;
        let y = self.origin.1 + 1 + pos.y as TermInt;
        self.term.print_at((x, y), chars[0])?;
        self.term.print_at((x + 1, y), chars[1])
    }

    fn box_size(&self) -> (TermInt, TermInt) {
        let grid = self.board.grid();
        (grid.cols() as TermInt * CELL_WIDTH + 2, grid.rows() as TermInt + 2)
    }
}

fn head_char(direction: Direction) -> char {
    match direction {
        Up => '^',
        Down => 'v',
        Left => '<',
        Right => '>',
    }
}

fn is_ctrl_c(ev: &KeyEvent) -> bool {
    ev.code == KeyCode::Char('c') && ev.modifiers.contains(KeyModifiers::CONTROL)
}
