/// An overlay vertex: position + color + normal.
///
/// Positions are always viewer-relative. The normal is only meaningful for
/// line lists, where it carries the segment direction for wide-line
/// expansion in the vertex shader; filled shapes leave it zeroed.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct OverlayVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
    pub normal: [f32; 3],
}

impl OverlayVertex {
    #[inline]
    pub fn new(position: glam::Vec3, color: [f32; 4]) -> Self {
        Self {
            position: position.to_array(),
            color,
            normal: [0.0; 3],
        }
    }

    #[inline]
    pub fn with_normal(mut self, normal: glam::Vec3) -> Self {
        self.normal = normal.to_array();
        self
    }
}
