//! Eased tweens and completion signals.
//!
//! Everything timed in the engine (scene fades, the transition crossfade) is a [`Tween`]
//! advanced by the frame delta. Completion is observed through a [`Signal`], a cheap
//! shared flag that the orchestrator polls once per frame. An [`Animated`] value owns at
//! most one tween: starting a new one cancels the previous writer first.

use std::{cell::Cell, rc::Rc, time::Duration};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SignalState {
    Pending,
    Completed,
    Cancelled,
}

/// Completion flag of an asynchronous, frame driven operation.
#[derive(Debug, Clone)]
pub struct Signal(Rc<Cell<SignalState>>);

impl Signal {
    pub fn pending() -> Self {
        Self(Rc::new(Cell::new(SignalState::Pending)))
    }

    /// A signal that is already complete, for operations that finish immediately.
    pub fn resolved() -> Self {
        Self(Rc::new(Cell::new(SignalState::Completed)))
    }

    pub fn resolve(&self) {
        if self.0.get() == SignalState::Pending {
            self.0.set(SignalState::Completed);
        }
    }

    pub fn cancel(&self) {
        if self.0.get() == SignalState::Pending {
            self.0.set(SignalState::Cancelled);
        }
    }

    /// Completed or cancelled.
    pub fn is_settled(&self) -> bool {
        self.0.get() != SignalState::Pending
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get() == SignalState::Cancelled
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Easing {
    Linear,
    #[default]
    QuadOut,
    CubicOut,
    QuadInOut,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::QuadOut => 1.0 - (1.0 - t) * (1.0 - t),
            Easing::CubicOut => 1.0 - (1.0 - t).powi(3),
            Easing::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
        }
    }
}

/// Interpolates a scalar from `from` to `to` over `duration`.
#[derive(Debug)]
pub struct Tween {
    from: f32,
    to: f32,
    duration: f32,
    elapsed: f32,
    easing: Easing,
    signal: Signal,
}

impl Tween {
    pub fn new(from: f32, to: f32, duration: Duration, easing: Easing) -> Self {
        Self {
            from,
            to,
            duration: duration.as_secs_f32(),
            elapsed: 0.0,
            easing,
            signal: Signal::pending(),
        }
    }

    /// Step the tween and return the new value. Resolves the signal on the last step.
    pub fn advance(&mut self, dt: f32) -> f32 {
        self.elapsed = (self.elapsed + dt.max(0.0)).min(self.duration);
        if self.is_finished() {
            self.signal.resolve();
        }
        self.value()
    }

    pub fn value(&self) -> f32 {
        if self.duration <= 0.0 {
            return self.to;
        }
        let t = self.easing.apply(self.elapsed / self.duration);
        self.from + (self.to - self.from) * t
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }

    pub fn signal(&self) -> Signal {
        self.signal.clone()
    }
}

/// A value with at most one tween writing to it.
#[derive(Debug)]
pub struct Animated {
    value: f32,
    tween: Option<Tween>,
}

impl Animated {
    pub fn new(value: f32) -> Self {
        Self { value, tween: None }
    }

    pub fn get(&self) -> f32 {
        self.value
    }

    /// Set the value directly, killing any tween in flight.
    pub fn set(&mut self, value: f32) {
        self.kill();
        self.value = value;
    }

    /// Start a tween from the current value. The previous tween, if any, is cancelled.
    /// A zero duration completes on the spot.
    pub fn animate_to(&mut self, target: f32, duration: Duration, easing: Easing) -> Signal {
        self.kill();
        let tween = Tween::new(self.value, target, duration, easing);
        let signal = tween.signal();
        if duration.is_zero() {
            self.value = target;
            signal.resolve();
        } else {
            self.tween = Some(tween);
        }
        signal
    }

    pub fn advance(&mut self, dt: f32) {
        if let Some(tween) = &mut self.tween {
            self.value = tween.advance(dt);
            if tween.is_finished() {
                self.tween = None;
            }
        }
    }

    pub fn is_animating(&self) -> bool {
        self.tween.is_some()
    }

    /// Cancel the tween in flight, leaving the value where it is.
    pub fn kill(&mut self) {
        if let Some(tween) = self.tween.take() {
            tween.signal.cancel();
        }
    }
}
