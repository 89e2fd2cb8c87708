//! GPIO pin assignments for the bracelet board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Buttons (active-low momentary switches, internal pull-up)
// ---------------------------------------------------------------------------

/// "+" button: increments the team score.
pub const BUTTON_INCREMENT_GPIO: i32 = 18;
/// "−" button: decrements the team score.
pub const BUTTON_DECREMENT_GPIO: i32 = 19;

// ---------------------------------------------------------------------------
// Indication
// ---------------------------------------------------------------------------

/// On-board status LED (active HIGH).
pub const STATUS_LED_GPIO: i32 = 2;
