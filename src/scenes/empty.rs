use crate::scene::{Scene, SceneKit, SetupContext};

const CLEAR_COLOR: u32 = 0x1a1a1a;

/// A scene with nothing but a clear colour.
pub struct EmptyScene {
    kit: SceneKit,
}

impl EmptyScene {
    pub fn new(ctx: &SetupContext) -> Self {
        Self {
            kit: SceneKit::new(super::EMPTY, ctx).with_clear_color(CLEAR_COLOR),
        }
    }
}

impl Scene for EmptyScene {
    fn kit(&self) -> &SceneKit {
        &self.kit
    }

    fn kit_mut(&mut self) -> &mut SceneKit {
        &mut self.kit
    }
}
