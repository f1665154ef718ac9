//! Text shown on the 16x2 operator display.
//!
//! A [`Screen`] is two fixed-width lines. The controller derives one from
//! its state on every cycle and only touches the display when the result
//! differs from what is already shown.

use std::time::Instant;

use cardgate_core::CardIdentity;
use cardgate_core::constants::{LCD_COLUMNS, LCD_ROWS};
use cardgate_hardware::traits::CharacterDisplay;
use cardgate_storage::StoredCardRecord;

use crate::menu::MenuItem;

/// Text alignment within a display line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
}

/// Why a card was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Effective identity is not in the store.
    UnknownCard,
    /// Reserved block is blank: probable clone on a magic card.
    InvalidCard,
}

/// Two display lines, each exactly [`LCD_COLUMNS`] characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    lines: [String; LCD_ROWS],
}

impl Screen {
    /// Screen with both lines left-aligned.
    ///
    /// ```
    /// use cardgate_controller::Screen;
    ///
    /// let screen = Screen::new("Card Added!", "Successfully");
    /// assert_eq!(screen.line(0), "Card Added!     ");
    /// assert_eq!(screen.line(1).trim_end(), "Successfully");
    /// ```
    pub fn new(top: &str, bottom: &str) -> Self {
        Self {
            lines: [
                align_text(top, LCD_COLUMNS, Alignment::Left),
                align_text(bottom, LCD_COLUMNS, Alignment::Left),
            ],
        }
    }

    pub fn line(&self, row: usize) -> &str {
        self.lines.get(row).map(String::as_str).unwrap_or("")
    }

    pub fn lines(&self) -> &[String; LCD_ROWS] {
        &self.lines
    }

    /// Write both lines to `display`.
    pub fn render<D: CharacterDisplay>(&self, display: &mut D) -> cardgate_hardware::Result<()> {
        display.clear()?;
        for (row, text) in self.lines.iter().enumerate() {
            display.set_cursor(0, row)?;
            display.print(text.trim_end())?;
        }
        Ok(())
    }

    pub fn boot() -> Self {
        Self::new("Access Control", "Initializing...")
    }

    pub fn nfc_error() -> Self {
        Self::new("NFC ERROR!", "Check wiring")
    }

    pub fn idle() -> Self {
        Self::new("  System Ready  ", "  Scan Card...  ")
    }

    pub fn access_granted() -> Self {
        Self::new(" Access Granted ", "   Welcome!     ")
    }

    pub fn access_denied(reason: DenyReason) -> Self {
        let detail = match reason {
            DenyReason::UnknownCard => " Unknown Card   ",
            DenyReason::InvalidCard => " Invalid Card   ",
        };
        Self::new(" Access Denied  ", detail)
    }

    /// Highlighted item on top, the following item below.
    pub fn menu(item: MenuItem) -> Self {
        Self::new(
            &format!(">{}", item.label()),
            &format!(" {}", item.next().label()),
        )
    }

    pub fn registering() -> Self {
        Self::new("Register Card", "Scan new card...")
    }

    pub fn deleting() -> Self {
        Self::new("Delete Card", "Scan to delete..")
    }

    pub fn cloning_source() -> Self {
        Self::new("Clone: Source", "Scan source card")
    }

    pub fn cloning_target() -> Self {
        Self::new("Clone: Target", "Scan magic card")
    }

    /// One stored record: position on top, identity in hex below.
    ///
    /// ```
    /// use cardgate_controller::Screen;
    /// use cardgate_core::CardIdentity;
    /// use cardgate_storage::StoredCardRecord;
    ///
    /// let id = CardIdentity::new(&[0x04, 0x12, 0x34, 0x56]).unwrap();
    /// let screen = Screen::listing(0, 3, Some(&StoredCardRecord::active(id)));
    /// assert_eq!(screen.line(0).trim_end(), "#1/3");
    /// assert_eq!(screen.line(1).trim_end(), "04123456");
    /// ```
    pub fn listing(index: usize, count: usize, record: Option<&StoredCardRecord>) -> Self {
        match record {
            Some(record) => Self::new(
                &format!("#{}/{}", index + 1, count),
                &record.identity.to_hex(),
            ),
            None => Self::new("Error reading", "card data"),
        }
    }

    /// Clone source captured; shows the first four identity bytes.
    pub fn clone_source_captured(identity: &CardIdentity) -> Self {
        let shown = &identity.as_bytes()[..identity.len().min(4)];
        let hex: String = shown.iter().map(|b| format!("{b:02X}")).collect();
        Self::new(&format!("Src: {hex}"), "Remove & scan new")
    }
}

/// A message shown over the state screen for a limited time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub screen: Screen,
    pub until: Instant,
    /// Card detection is suspended until the notice expires.
    pub hold: bool,
}

impl Notice {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.until
    }
}

/// Truncate `text` to at most `max_chars` characters.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Align text within `width` characters, padding with spaces.
///
/// ```
/// use cardgate_controller::screen::{Alignment, align_text};
///
/// assert_eq!(align_text("OK", 6, Alignment::Left), "OK    ");
/// assert_eq!(align_text("OK", 6, Alignment::Center), "  OK  ");
/// assert_eq!(align_text("OK", 6, Alignment::Right), "    OK");
/// ```
pub fn align_text(text: &str, width: usize, alignment: Alignment) -> String {
    let text = sanitize_text(text);
    let char_count = text.chars().count();
    if char_count >= width {
        return truncate_text(&text, width);
    }

    let padding = width - char_count;
    match alignment {
        Alignment::Left => format!("{}{}", text, " ".repeat(padding)),
        Alignment::Right => format!("{}{}", " ".repeat(padding), text),
        Alignment::Center => {
            let left_pad = padding / 2;
            format!(
                "{}{}{}",
                " ".repeat(left_pad),
                text,
                " ".repeat(padding - left_pad)
            )
        }
    }
}

/// The display only has an ASCII character ROM.
fn sanitize_text(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii() && !c.is_control() { c } else { '?' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardgate_hardware::mock::VirtualLcd;

    #[test]
    fn test_lines_are_fixed_width() {
        let screens = [
            Screen::idle(),
            Screen::access_granted(),
            Screen::access_denied(DenyReason::UnknownCard),
            Screen::menu(MenuItem::ClearAll),
            Screen::clone_source_captured(&CardIdentity::new(&[1, 2, 3, 4, 5, 6, 7]).unwrap()),
        ];
        for screen in screens {
            for line in screen.lines() {
                assert_eq!(line.len(), LCD_COLUMNS);
            }
        }
    }

    #[test]
    fn test_long_text_truncated() {
        let screen = Screen::new("Remove & scan new card now", "");
        assert_eq!(screen.line(0), "Remove & scan ne");
    }

    #[test]
    fn test_menu_shows_next_item() {
        let screen = Screen::menu(MenuItem::Exit);
        assert_eq!(screen.line(0).trim_end(), ">Exit Menu");
        assert_eq!(screen.line(1).trim_end(), " Register Card");
    }

    #[test]
    fn test_clone_source_uses_four_bytes() {
        let id = CardIdentity::new(&[0x04, 0xA1, 0xB2, 0xC3, 0xD4, 0xE5, 0xF6]).unwrap();
        let screen = Screen::clone_source_captured(&id);
        assert_eq!(screen.line(0).trim_end(), "Src: 04A1B2C3");
    }

    #[test]
    fn test_listing_unreadable_record() {
        let screen = Screen::listing(2, 5, None);
        assert_eq!(screen.line(0).trim_end(), "Error reading");
    }

    #[test]
    fn test_render_to_lcd() {
        let mut lcd = VirtualLcd::default();
        Screen::access_denied(DenyReason::InvalidCard)
            .render(&mut lcd)
            .unwrap();
        assert_eq!(lcd.render(), " Access Denied| Invalid Card");
        assert_eq!(lcd.clear_count(), 1);
    }

    #[test]
    fn test_non_ascii_replaced() {
        assert_eq!(align_text("Liberação", 9, Alignment::Left), "Libera??o");
    }
}
