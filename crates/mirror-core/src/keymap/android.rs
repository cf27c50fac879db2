//! Android `KeyEvent.KEYCODE_*` values.
//!
//! Reference: `android.view.KeyEvent` in the Android SDK.  Only the key codes
//! the session core produces are named here; any other value can still be
//! carried through [`KeyCode::new`].
//!
//! # Layout of the code space
//!
//! Android numbers the digit keys and the letter keys contiguously:
//!
//! | Keys    | Codes    |
//! |---------|----------|
//! | `0`–`9` | 7 – 16   |
//! | `A`–`Z` | 29 – 54  |
//!
//! The input translator relies on this to map alphanumerics with a single
//! offset instead of a table lookup.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An Android key code.
///
/// [`KeyCode::UNKNOWN`] (`KEYCODE_UNKNOWN`, value 0) is the "unmapped"
/// sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KeyCode(u16);

impl KeyCode {
    pub const UNKNOWN: KeyCode = KeyCode(0);
    pub const HOME: KeyCode = KeyCode(3);
    pub const BACK: KeyCode = KeyCode(4);
    pub const DIGIT_0: KeyCode = KeyCode(7);
    pub const DIGIT_9: KeyCode = KeyCode(16);
    pub const A: KeyCode = KeyCode(29);
    pub const Z: KeyCode = KeyCode(54);
    pub const SHIFT_LEFT: KeyCode = KeyCode(59);
    pub const TAB: KeyCode = KeyCode(61);
    pub const SPACE: KeyCode = KeyCode(62);
    pub const ENTER: KeyCode = KeyCode(66);
    /// Backspace.  Android calls it `KEYCODE_DEL`.
    pub const DEL: KeyCode = KeyCode(67);
    pub const CTRL_LEFT: KeyCode = KeyCode(113);

    pub const fn new(code: u16) -> Self {
        KeyCode(code)
    }

    pub const fn value(self) -> u16 {
        self.0
    }

    pub fn is_unknown(self) -> bool {
        self == KeyCode::UNKNOWN
    }

    /// Key code for the digit `n` (0–9).  Returns `None` for `n > 9`.
    pub fn digit(n: u8) -> Option<KeyCode> {
        (n <= 9).then(|| KeyCode(Self::DIGIT_0.0 + u16::from(n)))
    }

    /// Key code for the letter at `index` in the alphabet (0 = A, 25 = Z).
    pub fn letter(index: u8) -> Option<KeyCode> {
        (index < 26).then(|| KeyCode(Self::A.0 + u16::from(index)))
    }
}

impl Default for KeyCode {
    fn default() -> Self {
        KeyCode::UNKNOWN
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
