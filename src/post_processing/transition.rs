use std::time::Duration;

use crate::tween::{Animated, Easing, Signal};

/// The two scene slots of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    A,
    B,
}

/// Crossfade between slot A and slot B.
///
/// The factor travels 0 -> 1 with an ease-out curve. At exactly 0 only A is visible, at
/// exactly 1 only B; anything in between means both scenes are rendered and blended.
#[derive(Debug)]
pub struct TransitionPass {
    factor: Animated,
    duration: Duration,
    skip: bool,
}

impl TransitionPass {
    pub fn new(duration: Duration, skip: bool) -> Self {
        Self {
            factor: Animated::new(0.0),
            duration,
            skip,
        }
    }

    /// Restart the crossfade from A to B. A crossfade still running is cancelled first.
    pub fn start(&mut self) -> Signal {
        self.factor.set(0.0);
        let duration = if self.skip {
            Duration::ZERO
        } else {
            self.duration
        };
        self.factor.animate_to(1.0, duration, Easing::QuadOut)
    }

    /// Jump to B without a crossfade.
    pub fn complete(&mut self) {
        self.factor.set(1.0);
    }

    pub fn advance(&mut self, dt: f32) {
        self.factor.advance(dt);
    }

    pub fn factor(&self) -> f32 {
        self.factor.get()
    }

    pub fn is_active(&self) -> bool {
        let factor = self.factor();
        factor > 0.0 && factor < 1.0
    }

    /// The slot shown while no crossfade is active.
    pub fn visible_slot(&self) -> Slot {
        if self.factor() == 0.0 { Slot::A } else { Slot::B }
    }

    pub fn set_skip(&mut self, skip: bool) {
        self.skip = skip;
    }
}
