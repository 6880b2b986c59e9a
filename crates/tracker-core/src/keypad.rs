//! # keypad
//!
//! why: model the breach console's digit buffer and the fixed quick-action events
//! relations: emits intents that the console funnels through replica.rs
//! what: BreachKeypad accumulator, QuickAction canned events

use crate::log::{EventKind, LogEntry};

/// Number of digits that make up an SCP designation.
const DESIGNATION_LEN: usize = 3;

/// Accumulating digit buffer for the breach console.
///
/// Holds 0-2 digits; the third digit completes a designation and
/// produces one breach entry, resetting the buffer. No numeric range
/// validation beyond the fixed length.
#[derive(Debug, Clone, Default)]
pub struct BreachKeypad {
    buffer: String,
}

impl BreachKeypad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Press a digit key (0-9). Returns the completed breach entry
    /// when this press fills the designation. Values above 9 are not
    /// keys and leave the buffer untouched.
    pub fn press(&mut self, digit: u8) -> Option<LogEntry> {
        if digit > 9 {
            return None;
        }
        self.buffer.push(char::from(b'0' + digit));
        if self.buffer.len() == DESIGNATION_LEN {
            let designation = std::mem::take(&mut self.buffer);
            Some(LogEntry::new(
                EventKind::Breach,
                format!("SCP-{designation} BREACH"),
            ))
        } else {
            None
        }
    }

    /// The buffer padded to designation length for display, e.g. `"04_"`.
    pub fn display(&self) -> String {
        format!("{:_<width$}", self.buffer, width = DESIGNATION_LEN)
    }

    /// Drop any partially entered digits.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

/// The fixed quick-action buttons, each producing a canned site event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuickAction {
    ClassDRiot,
    ClassDEscape,
    ChaosInsurgency,
}

impl QuickAction {
    pub const ALL: [QuickAction; 3] = [
        QuickAction::ClassDRiot,
        QuickAction::ClassDEscape,
        QuickAction::ChaosInsurgency,
    ];

    /// The log content this action emits.
    pub fn content(self) -> &'static str {
        match self {
            QuickAction::ClassDRiot => "CLASS D RIOT IN PROGRESS",
            QuickAction::ClassDEscape => "CLASS D ESCAPE ATTEMPT",
            QuickAction::ChaosInsurgency => "CHAOS INSURGENCY DETECTED",
        }
    }

    /// Build the event entry for this action.
    pub fn entry(self) -> LogEntry {
        LogEntry::new(EventKind::Event, self.content())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn third_digit_completes_designation() {
        let mut keypad = BreachKeypad::new();
        assert!(keypad.press(0).is_none());
        assert!(keypad.press(4).is_none());
        let entry = keypad.press(2).unwrap();

        assert_eq!(entry.kind, EventKind::Breach);
        assert_eq!(entry.content, "SCP-042 BREACH");
        assert_eq!(keypad.display(), "___"); // buffer reset
    }

    #[test]
    fn display_pads_with_underscores() {
        let mut keypad = BreachKeypad::new();
        keypad.press(9);
        assert_eq!(keypad.display(), "9__");
    }

    #[test]
    fn out_of_range_press_leaves_buffer_untouched() {
        let mut keypad = BreachKeypad::new();
        assert!(keypad.press(12).is_none());
        assert_eq!(keypad.display(), "___");

        keypad.press(0);
        keypad.press(4);
        assert!(keypad.press(10).is_none());
        assert_eq!(keypad.display(), "04_");

        let entry = keypad.press(2).unwrap();
        assert_eq!(entry.content, "SCP-042 BREACH");
    }

    #[test]
    fn quick_actions_are_events() {
        for action in QuickAction::ALL {
            let entry = action.entry();
            assert_eq!(entry.kind, EventKind::Event);
            assert_eq!(entry.content, action.content());
        }
    }
}
