use crate::{ScreenPos, TermInt};
use std::{io::{self, Stdout, Write, stdout}, time::Duration};

use crossterm::{cursor, execute, queue, style, terminal};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::event::{Event, KeyEvent, KeyEventKind, read, poll};

pub struct TermManager<W: Write = Stdout> {
    width: TermInt,
    height: TermInt,
    stdout: W,
    screen: Vec<char>,
    current_msg: Option<Message>,
}

struct Message {
    top_left: ScreenPos,
    width: TermInt,
    height: TermInt,
}

impl TermManager {
    pub fn new() -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        Ok(TermManager::with_output(stdout(), width, height))
    }
}

impl<W: Write> TermManager<W> {
    fn with_output(stdout: W, width: TermInt, height: TermInt) -> Self {
        let screen = vec![' '; width as usize * height as usize];
        TermManager { width, height, stdout, screen, current_msg: None }
    }

    pub fn setup(&mut self) -> io::Result<()> {
        execute!(self.stdout, EnterAlternateScreen)?;
        terminal::enable_raw_mode()?;
        execute!(self.stdout, cursor::Hide, cursor::DisableBlinking)
    }

    pub fn restore(&mut self) -> io::Result<()> {
        terminal::disable_raw_mode()?;
        execute!(self.stdout, cursor::Show, cursor::EnableBlinking, LeaveAlternateScreen)
    }

    pub fn read_key_blocking(&self) -> io::Result<KeyEvent> {
        loop {
            if let Event::Key(ev) = read()? {
                if ev.kind == KeyEventKind::Press {
                    return Ok(ev);
                }
            }
        }
    }

    pub fn read_key_events_queue(&self) -> io::Result<Vec<KeyEvent>> {
        let mut events = vec![];

        while poll(Duration::from_millis(1))? {
            // Only presses, some platforms also report releases
            if let Event::Key(ev) = read()? {
                if ev.kind == KeyEventKind::Press {
                    events.push(ev);
                }
            }
        }

        Ok(events)
    }

    pub fn get_terminal_size(&self) -> ScreenPos {
        (self.width, self.height)
    }

    /// Draws a frame whose outer corners are `top_left` and
    /// `top_left + (width - 1, height - 1)`.
    pub fn draw_box(&mut self, top_left: ScreenPos, width: TermInt, height: TermInt) -> io::Result<()> {
        let (x0, y0) = top_left;
        let end_x = x0 + width - 1;
        let end_y = y0 + height - 1;

        for x in x0..=end_x {
            let ch = if x == x0 || x == end_x {'+'} else {'-'};
            self.print_at((x, y0), ch)?;
            self.print_at((x, end_y), ch)?;
        }

        for y in y0 + 1..end_y {
            self.print_at((x0, y), '|')?;
            self.print_at((end_x, y), '|')?;
        }

        Ok(())
    }

    pub fn show_message(&mut self, lines: &[&str]) -> io::Result<()> {
        if self.has_message() {
            self.hide_message()?;
        }

        let msg_height = (lines.len() + 2) as TermInt;
        let msg_width = (lines.iter().map(|x| x.chars().count()).max().unwrap_or(0) + 2) as TermInt;
        let center = (self.width / 2, self.height / 2);
        let top_left = (center.0.saturating_sub(msg_width / 2), center.1.saturating_sub(msg_height / 2));

        // Print the top and bottom empty lines
        for y in [top_left.1, top_left.1 + msg_height - 1].iter() {
            for x_diff in 0..msg_width {
                self.print_at_no_save((top_left.0 + x_diff, *y), ' ')?;
            }
        }

        // Print the message lines
        for (i, line) in lines.iter().enumerate() {
            let padded_line = format!("{line: ^width$}", line = line, width = msg_width as usize);
            let y = top_left.1 + i as TermInt + 1;
            for (x_diff, ch) in padded_line.chars().enumerate() {
                self.print_at_no_save((top_left.0 + x_diff as TermInt, y), ch)?;
            }
        }

        self.current_msg = Some(Message::new(msg_width, msg_height, top_left));
        self.flush()
    }

    pub fn hide_message(&mut self) -> io::Result<()> {
        let msg = match self.current_msg.take() {
            Some(msg) => msg,
            None => return Ok(()),
        };
        let top_left = msg.top_left();

        // Restore the content from the screen buffer
        for y_diff in 0..msg.height() {
            for x_diff in 0..msg.width() {
                let pos = (top_left.0 + x_diff, top_left.1 + y_diff);
                if let Some(ch) = self.buffered(pos) {
                    self.print_at_no_save(pos, ch)?;
                }
            }
        }

        self.flush()
    }

    pub fn print_at(&mut self, pos: ScreenPos, ch: char) -> io::Result<()> {
        if let Some(idx) = self.index(pos) {
            self.print_at_no_save(pos, ch)?;
            self.screen[idx] = ch;
        }
        Ok(())
    }

    pub fn print_str_at(&mut self, pos: ScreenPos, text: &str) -> io::Result<()> {
        for (i, ch) in text.chars().enumerate() {
            self.print_at((pos.0 + i as TermInt, pos.1), ch)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.stdout.flush()
    }

    pub fn has_message(&self) -> bool {
        self.current_msg.is_some()
    }

    ///////////////////////////////////////////////////////////////////////////

    fn index(&self, pos: ScreenPos) -> Option<usize> {
        if pos.0 < self.width && pos.1 < self.height {
            Some(self.width as usize * pos.1 as usize + pos.0 as usize)
        } else {
            None
        }
    }

    fn buffered(&self, pos: ScreenPos) -> Option<char> {
        self.index(pos).map(|idx| self.screen[idx])
    }

    fn print_at_no_save(&mut self, pos: ScreenPos, ch: char) -> io::Result<()> {
        // To be used for printing messages, where we don't wanna overwrite our
        // local buffer to restore it when the message is hidden
        if pos.0 < self.width && pos.1 < self.height {
            queue!(self.stdout, cursor::MoveTo(pos.0, pos.1), style::Print(ch))?;
        }
        Ok(())
    }
}

impl Message {
    pub fn new(width: TermInt, height: TermInt, top_left: ScreenPos) -> Self {
        Message { width, height, top_left }
    }

    pub fn width(&self) -> TermInt {
        self.width
    }

    pub fn height(&self) -> TermInt {
        self.height
    }

    pub fn top_left(&self) -> ScreenPos {
        self.top_left
    }
}
