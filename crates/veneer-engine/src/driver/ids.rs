use slotmap::new_key_type;

new_key_type! {
    /// Handle to a vertex + index buffer pair.
    pub struct GeometryId;
    /// Handle to a sampled texture.
    pub struct TextureId;
    /// Handle to a color-only render buffer (window surface or texture-backed).
    pub struct RenderBufferId;
    /// Handle to an offscreen render target (texture + render buffer pair).
    pub struct RenderTargetId;
}

/// Any driver-owned resource id, used where ids of mixed kinds are queued
/// together (deferred frees, release queue).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AnyResource {
    Geometry(GeometryId),
    Texture(TextureId),
    RenderBuffer(RenderBufferId),
    RenderTarget(RenderTargetId),
}

impl From<GeometryId> for AnyResource {
    fn from(id: GeometryId) -> Self {
        AnyResource::Geometry(id)
    }
}

impl From<TextureId> for AnyResource {
    fn from(id: TextureId) -> Self {
        AnyResource::Texture(id)
    }
}

impl From<RenderBufferId> for AnyResource {
    fn from(id: RenderBufferId) -> Self {
        AnyResource::RenderBuffer(id)
    }
}

impl From<RenderTargetId> for AnyResource {
    fn from(id: RenderTargetId) -> Self {
        AnyResource::RenderTarget(id)
    }
}
