use std::{
    io::{self, Stdout, Write},
    time::Duration,
};

use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, queue,
    style::{Color as TermColor, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{debug, warn};

use crate::{led::Color, pixel_buffer::PixelBuffer};

use super::{DisplayError, DisplaySurface, SurfaceEvent, Viewport};

const UPPER_HALF_BLOCK: char = '▀';

/// Draws frames into the terminal, two pixel rows per character cell.
///
/// The requested viewport is shrunk to whatever fits the terminal. The
/// terminal is put back the way it was when the surface is dropped.
pub struct TerminalSurface {
    stdout: Stdout,
    viewport: Viewport,
    columns: u16,
    rows: u16,
}

impl TerminalSurface {
    pub fn new(viewport: Viewport) -> Result<Self, DisplayError> {
        let (columns, rows) = terminal::size()?;

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(err) = execute!(stdout, EnterAlternateScreen, cursor::Hide) {
            disable_raw_mode().ok();
            return Err(err.into());
        }

        debug!("Terminal surface is {}x{} cells", columns, rows);

        Ok(TerminalSurface {
            stdout,
            viewport,
            columns,
            rows,
        })
    }

    /// Pixel size frames are scaled to before drawing.
    pub fn target_size(&self) -> (usize, usize) {
        fit_to_cells(&self.viewport, self.columns, self.rows)
    }
}

/// `(width, height)` in pixels, bounded by the cell grid. Each cell holds two
/// vertically stacked pixels.
fn fit_to_cells(viewport: &Viewport, columns: u16, rows: u16) -> (usize, usize) {
    let width = viewport.width.min(usize::from(columns));
    let height = viewport.height.min(usize::from(rows) * 2);
    (width, height)
}

fn key_requests_quit(key: &KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

fn term_color(packed: u32) -> TermColor {
    let color = Color::from_rgb(packed);
    TermColor::Rgb {
        r: color.r,
        g: color.g,
        b: color.b,
    }
}

impl DisplaySurface for TerminalSurface {
    fn poll_events(&mut self) -> Result<Vec<SurfaceEvent>, DisplayError> {
        let mut events = vec![];

        while event::poll(Duration::ZERO)? {
            match event::read()? {
                Event::Key(key) if key_requests_quit(&key) => events.push(SurfaceEvent::Quit),
                Event::Resize(columns, rows) => {
                    self.columns = columns;
                    self.rows = rows;
                    execute!(self.stdout, terminal::Clear(terminal::ClearType::All))?;
                    events.push(SurfaceEvent::Resized {
                        width: usize::from(columns),
                        height: usize::from(rows) * 2,
                    });
                }
                _ => {}
            }
        }

        Ok(events)
    }

    fn present(&mut self, frame: &PixelBuffer) -> Result<(), DisplayError> {
        let (width, height) = self.target_size();
        let scaled = Viewport::new(width, height, self.viewport.scale_mode).fit(frame);

        for cell_row in 0..height.div_ceil(2) {
            queue!(self.stdout, cursor::MoveTo(0, cell_row as u16))?;
            for column in 0..width {
                let top = scaled.get(cell_row * 2, column).unwrap_or(0);
                let bottom = scaled.get(cell_row * 2 + 1, column).unwrap_or(0);
                queue!(
                    self.stdout,
                    SetForegroundColor(term_color(top)),
                    SetBackgroundColor(term_color(bottom)),
                    Print(UPPER_HALF_BLOCK)
                )?;
            }
        }

        queue!(self.stdout, ResetColor)?;
        self.stdout.flush()?;
        Ok(())
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        if let Err(err) = execute!(self.stdout, ResetColor, cursor::Show, LeaveAlternateScreen) {
            warn!("Could not leave the alternate screen: {}", err);
        }
        if let Err(err) = disable_raw_mode() {
            warn!("Could not restore the terminal mode: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::KeyEventState;

    use super::*;
    use crate::pixel_buffer::ScaleMode;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn quit_keys() {
        assert!(key_requests_quit(&key(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert!(key_requests_quit(&key(KeyCode::Esc, KeyModifiers::NONE)));
        assert!(key_requests_quit(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(!key_requests_quit(&key(KeyCode::Char('c'), KeyModifiers::NONE)));

        let mut release = key(KeyCode::Char('q'), KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        assert!(!key_requests_quit(&release));
    }

    #[test]
    fn viewport_is_clamped_to_cells() {
        let viewport = Viewport::new(1024, 1024, ScaleMode::Nearest);
        assert_eq!(fit_to_cells(&viewport, 80, 24), (80, 48));

        let small = Viewport::new(10, 5, ScaleMode::Nearest);
        assert_eq!(fit_to_cells(&small, 80, 24), (10, 5));
    }

    #[test]
    fn packed_colors_become_rgb() {
        assert_eq!(
            term_color(0x123456),
            TermColor::Rgb {
                r: 0x12,
                g: 0x34,
                b: 0x56
            }
        );
    }
}
