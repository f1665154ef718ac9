//! Virtual character LCD.
//!
//! Simulates a 16x2 HD44780 panel: a fixed grid of ASCII cells and a cursor.
//! Printing writes cells left to right from the cursor and silently drops
//! anything past the last column, like the real controller with its display
//! window fixed.
//!
//! # Character Encoding - ASCII Only
//!
//! The panel's character ROM only covers printable ASCII (0x20-0x7E).
//! Anything else is rendered as `?`.
//!
//! # Examples
//!
//! ```
//! use cardgate_hardware::mock::VirtualLcd;
//! use cardgate_hardware::traits::CharacterDisplay;
//!
//! let mut lcd = VirtualLcd::new(16, 2);
//! lcd.set_cursor(0, 0).unwrap();
//! lcd.print(" Access Granted ").unwrap();
//! lcd.set_cursor(0, 1).unwrap();
//! lcd.print("   Welcome!     ").unwrap();
//!
//! assert_eq!(lcd.line(0), " Access Granted ");
//! assert_eq!(lcd.line(1).trim(), "Welcome!");
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use cardgate_core::constants::{LCD_COLUMNS, LCD_ROWS};

use crate::{HardwareError, Result, traits::CharacterDisplay};

#[derive(Debug)]
struct Panel {
    columns: usize,
    rows: usize,
    cells: Vec<Vec<u8>>,
    cursor: (usize, usize),
    clears: usize,
}

/// Virtual 16x2 character display.
///
/// Clones share the same panel so the content can be inspected while the
/// controller owns the display.
#[derive(Debug, Clone)]
pub struct VirtualLcd {
    panel: Arc<Mutex<Panel>>,
}

impl VirtualLcd {
    /// Blank panel of the given geometry.
    pub fn new(columns: usize, rows: usize) -> Self {
        Self {
            panel: Arc::new(Mutex::new(Panel {
                columns,
                rows,
                cells: vec![vec![b' '; columns]; rows],
                cursor: (0, 0),
                clears: 0,
            })),
        }
    }

    /// Content of one row, exactly `columns` characters long.
    /// Rows past the panel return an empty string.
    pub fn line(&self, row: usize) -> String {
        self.lock()
            .cells
            .get(row)
            .map(|cells| String::from_utf8_lossy(cells).into_owned())
            .unwrap_or_default()
    }

    /// Content of every row.
    pub fn lines(&self) -> Vec<String> {
        let rows = self.lock().rows;
        (0..rows).map(|row| self.line(row)).collect()
    }

    /// Content of every row with trailing blanks removed, joined by `|`.
    ///
    /// Convenient for single-line log output and assertions.
    pub fn render(&self) -> String {
        self.lines()
            .iter()
            .map(|line| line.trim_end().to_string())
            .collect::<Vec<_>>()
            .join("|")
    }

    /// Number of `clear` calls so far; used to assert redraw-on-change.
    pub fn clear_count(&self) -> usize {
        self.lock().clears
    }

    fn lock(&self) -> MutexGuard<'_, Panel> {
        match self.panel.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for VirtualLcd {
    fn default() -> Self {
        Self::new(LCD_COLUMNS, LCD_ROWS)
    }
}

impl CharacterDisplay for VirtualLcd {
    fn columns(&self) -> usize {
        self.lock().columns
    }

    fn rows(&self) -> usize {
        self.lock().rows
    }

    fn clear(&mut self) -> Result<()> {
        let mut panel = self.lock();
        for row in panel.cells.iter_mut() {
            row.fill(b' ');
        }
        panel.cursor = (0, 0);
        panel.clears += 1;
        Ok(())
    }

    fn set_cursor(&mut self, column: usize, row: usize) -> Result<()> {
        let mut panel = self.lock();
        if row >= panel.rows || column >= panel.columns {
            return Err(HardwareError::invalid_data(format!(
                "cursor ({column}, {row}) outside {}x{} panel",
                panel.columns, panel.rows
            )));
        }
        panel.cursor = (column, row);
        Ok(())
    }

    fn print(&mut self, text: &str) -> Result<()> {
        let mut panel = self.lock();
        let (mut column, row) = panel.cursor;
        let columns = panel.columns;

        for ch in text.chars() {
            if column >= columns {
                break;
            }
            let cell = if ch == ' ' || ch.is_ascii_graphic() {
                ch as u8
            } else {
                b'?'
            };
            panel.cells[row][column] = cell;
            column += 1;
        }

        panel.cursor = (column.min(columns), row);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_panel_is_blank() {
        let lcd = VirtualLcd::default();
        assert_eq!(lcd.line(0), " ".repeat(16));
        assert_eq!(lcd.lines().len(), 2);
    }

    #[test]
    fn test_print_truncates_at_edge() {
        let mut lcd = VirtualLcd::new(16, 2);
        lcd.set_cursor(0, 1).unwrap();
        lcd.print("Scan new card... extra").unwrap();
        assert_eq!(lcd.line(1), "Scan new card...");
    }

    #[test]
    fn test_print_continues_from_cursor() {
        let mut lcd = VirtualLcd::new(16, 2);
        lcd.set_cursor(0, 0).unwrap();
        lcd.print(">").unwrap();
        lcd.print("Register").unwrap();
        assert_eq!(lcd.line(0).trim_end(), ">Register");
    }

    #[test]
    fn test_non_ascii_rendered_as_placeholder() {
        let mut lcd = VirtualLcd::new(4, 1);
        lcd.print("a\u{e7}b").unwrap();
        assert_eq!(lcd.line(0), "a?b ");
    }

    #[test]
    fn test_cursor_bounds() {
        let mut lcd = VirtualLcd::new(16, 2);
        assert!(lcd.set_cursor(0, 2).is_err());
        assert!(lcd.set_cursor(16, 0).is_err());
    }

    #[test]
    fn test_clear_and_render() {
        let mut lcd = VirtualLcd::new(16, 2);
        lcd.print("Card Added!").unwrap();
        let observer = lcd.clone();
        assert_eq!(observer.render(), "Card Added!|");

        lcd.clear().unwrap();
        assert_eq!(observer.render(), "|");
        assert_eq!(observer.clear_count(), 1);
    }
}
