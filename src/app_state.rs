/// Application level state that gates the switch from the preloader to the first
/// content scene.
///
/// Replaced as a whole, never mutated in place; the controller compares the old and the
/// new value to detect the `ready` edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AppState {
    pub ready: bool,
}

impl AppState {
    pub fn new(ready: bool) -> Self {
        Self { ready }
    }

    /// True when `self` flips `ready` on relative to `previous`.
    pub fn became_ready(&self, previous: &AppState) -> bool {
        self.ready && !previous.ready
    }
}
