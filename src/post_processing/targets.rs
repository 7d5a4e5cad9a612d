use crate::{render::RenderBackend, viewport::BufferSize};

/// The graph's three offscreen buffers: one per scene slot, and the composite that the
/// final pass reads.
pub struct RenderTargetPool<T> {
    pub a: T,
    pub b: T,
    pub composite: T,
    size: BufferSize,
}

impl<T> RenderTargetPool<T> {
    pub fn new<B: RenderBackend<Target = T>>(backend: &mut B, size: BufferSize) -> Self {
        Self {
            a: backend.create_target("render target A", size),
            b: backend.create_target("render target B", size),
            composite: backend.create_target("render target C", size),
            size,
        }
    }

    pub fn resize<B: RenderBackend<Target = T>>(&mut self, backend: &mut B, size: BufferSize) {
        if size == self.size {
            return;
        }
        backend.resize_target(&mut self.a, size);
        backend.resize_target(&mut self.b, size);
        backend.resize_target(&mut self.composite, size);
        self.size = size;
    }

    pub fn size(&self) -> BufferSize {
        self.size
    }
}
