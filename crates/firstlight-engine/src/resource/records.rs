//! Host-side position records shared by both demo variants.

use bytemuck::{Pod, Zeroable};

use super::VertexLayout;

/// Position read through a vertex attribute (`@location(0) pos: vec3f`).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Position3 {
    pub pos: [f32; 3],
}

impl Position3 {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { pos: [x, y, z] }
    }

    pub fn layout() -> VertexLayout {
        VertexLayout::new(size_of::<Self>() as u64, Self::ATTRS)
    }

    /// Homogeneous form with `w = 1`.
    pub const fn homogeneous(self) -> Position4 {
        let [x, y, z] = self.pos;
        Position4 { pos: [x, y, z, 1.0] }
    }
}

/// Position read from a storage buffer (`struct Vertex { pos: vec4f }`).
///
/// 16 bytes per record, which is also the WGSL stride of that structure.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Position4 {
    pub pos: [f32; 4],
}

/// Two counter-clockwise triangles covering `[0, 1] x [0, 1]`.
pub const UNIT_SQUARE: [Position3; 6] = [
    Position3::new(0.0, 0.0, 0.0), // triangle 1
    Position3::new(1.0, 0.0, 0.0),
    Position3::new(1.0, 1.0, 0.0),
    Position3::new(0.0, 0.0, 0.0), // triangle 2
    Position3::new(1.0, 1.0, 0.0),
    Position3::new(0.0, 1.0, 0.0),
];

pub const UNIT_SQUARE_HOMOGENEOUS: [Position4; 6] = [
    UNIT_SQUARE[0].homogeneous(),
    UNIT_SQUARE[1].homogeneous(),
    UNIT_SQUARE[2].homogeneous(),
    UNIT_SQUARE[3].homogeneous(),
    UNIT_SQUARE[4].homogeneous(),
    UNIT_SQUARE[5].homogeneous(),
];

/// Total area covered by a triangle list, ignoring `z`.
pub fn triangle_list_area(positions: impl IntoIterator<Item = [f32; 2]>) -> f32 {
    let points: Vec<[f32; 2]> = positions.into_iter().collect();
    points
        .chunks_exact(3)
        .map(|t| {
            let (a, b, c) = (t[0], t[1], t[2]);
            ((b[0] - a[0]) * (c[1] - a[1]) - (c[0] - a[0]) * (b[1] - a[1])).abs() * 0.5
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_square_sizes() {
        assert_eq!(size_of_val(&UNIT_SQUARE), 72);
        assert_eq!(size_of_val(&UNIT_SQUARE_HOMOGENEOUS), 96);
        assert_eq!(Position3::layout().stride(), 12);
    }

    #[test]
    fn unit_square_covers_unit_area() {
        let area = triangle_list_area(UNIT_SQUARE.iter().map(|p| [p.pos[0], p.pos[1]]));
        assert!((area - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn homogeneous_form_sets_w() {
        assert!(UNIT_SQUARE_HOMOGENEOUS.iter().all(|p| p.pos[3] == 1.0));
        assert_eq!(UNIT_SQUARE_HOMOGENEOUS[2].pos, [1.0, 1.0, 0.0, 1.0]);
    }
}
