//! LED pattern engine with priority-based pattern selection.
//!
//! Generates the on/off level of the single status LED. The main loop
//! calls `tick()` each iteration with the elapsed time and writes the
//! result to [`StatusLed::set`](super::status_led::StatusLed::set).
//!
//! ## Priority hierarchy (highest first)
//!
//! 1. **Flash**: one-shot acknowledgement (score sent, pairing requested)
//! 2. **Error**: double blink while a fault is being reported
//! 3. **Connectivity**: fast blink while the broker link is down
//! 4. **Pairing**: unpaired slow blink, paired solid
//!
//! ## Pattern types
//!
//! | Pattern      | Description                      | Rate   |
//! |--------------|----------------------------------|--------|
//! | Solid        | Constant on                      | -      |
//! | SlowBlink    | 50% square wave                  | 1 Hz   |
//! | FastBlink    | 50% square wave                  | 4 Hz   |
//! | DoubleBlink  | Two quick flashes, then pause    | 1 Hz   |
//! | Off          | Constant off                     | -      |

/// Pattern identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternId {
    Solid,
    SlowBlink,
    FastBlink,
    DoubleBlink,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PatternRequest {
    pattern: PatternId,
    priority: u8,
}

/// Remaining time of a one-shot flash.
#[derive(Debug, Clone, Copy)]
struct Flash {
    remaining_ms: u32,
}

/// Stack-allocated pattern engine.
pub struct LedPatternEngine {
    phase_ms: u32,
    active: Option<PatternRequest>,
    flash: Option<Flash>,
    error_remaining_ms: u32,
    pairing_request: Option<PatternRequest>,
    connectivity_request: Option<PatternRequest>,
}

/// How long an error indication stays visible after it was raised.
pub const ERROR_HOLD_MS: u32 = 3_000;

/// Length of a one-shot acknowledgement flash.
pub const FLASH_MS: u32 = 150;

impl LedPatternEngine {
    pub fn new() -> Self {
        Self {
            phase_ms: 0,
            active: None,
            flash: None,
            error_remaining_ms: 0,
            pairing_request: None,
            connectivity_request: None,
        }
    }

    /// Pairing-layer pattern (priority 4, lowest).
    pub fn set_paired(&mut self, paired: bool) {
        let pattern = if paired {
            PatternId::Solid
        } else {
            PatternId::SlowBlink
        };
        self.pairing_request = Some(PatternRequest {
            pattern,
            priority: 4,
        });
    }

    /// Connectivity-layer pattern (priority 3), shown only while the link is down.
    pub fn set_link_up(&mut self, up: bool) {
        self.connectivity_request = if up {
            None
        } else {
            Some(PatternRequest {
                pattern: PatternId::FastBlink,
                priority: 3,
            })
        };
    }

    /// Show the error pattern for [`ERROR_HOLD_MS`].
    pub fn raise_error(&mut self) {
        self.error_remaining_ms = ERROR_HOLD_MS;
    }

    /// Show a short solid flash on top of everything else.
    pub fn flash(&mut self) {
        self.flash = Some(Flash {
            remaining_ms: FLASH_MS,
        });
    }

    /// Advance the pattern phase and return the LED level.
    /// `delta_ms` is the time since the last call.
    pub fn tick(&mut self, delta_ms: u32) -> bool {
        self.phase_ms = self.phase_ms.wrapping_add(delta_ms);

        if let Some(flash) = self.flash.as_mut() {
            if flash.remaining_ms > 0 {
                flash.remaining_ms = flash.remaining_ms.saturating_sub(delta_ms);
                return true;
            }
            self.flash = None;
        }

        let error = (self.error_remaining_ms > 0).then_some(PatternRequest {
            pattern: PatternId::DoubleBlink,
            priority: 2,
        });
        self.error_remaining_ms = self.error_remaining_ms.saturating_sub(delta_ms);

        let selected = error
            .or(self.connectivity_request)
            .or(self.pairing_request);
        let reset_phase = match (&self.active, &selected) {
            (Some(prev), Some(next)) => {
                prev.priority != next.priority || prev.pattern != next.pattern
            }
            (None, Some(_)) => true,
            _ => false,
        };
        if reset_phase {
            self.phase_ms = 0;
        }
        self.active = selected;

        self.active
            .is_some_and(|req| Self::level(req.pattern, self.phase_ms))
    }

    fn level(pattern: PatternId, phase_ms: u32) -> bool {
        match pattern {
            PatternId::Solid => true,
            PatternId::Off => false,
            PatternId::SlowBlink => (phase_ms % 1000) < 500,
            PatternId::FastBlink => (phase_ms % 250) < 125,
            PatternId::DoubleBlink => {
                let cycle = phase_ms % 1000;
                cycle < 100 || (200..300).contains(&cycle)
            }
        }
    }
}

impl Default for LedPatternEngine {
    fn default() -> Self {
        Self::new()
    }
}
