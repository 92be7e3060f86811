use std::time::Duration;

use crate::state::PrimitiveType;

/// Counters for one frame. Immutable once the next frame begins.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    /// Draw calls issued.
    pub operation_count: u32,
    pub state_change_count: u32,
    pub vertex_count: u64,
    pub point_count: u64,
    pub line_count: u64,
    pub triangle_count: u64,
    pub duration: Duration,
}

impl Frame {
    /// Accounts one draw of `vertices` vertices.
    pub(crate) fn add_primitives(&mut self, primitive: PrimitiveType, vertices: u32) {
        let n = vertices as u64;
        self.operation_count += 1;
        self.vertex_count += n;

        match primitive {
            PrimitiveType::PointList => self.point_count += n,
            PrimitiveType::LineList => self.line_count += n / 2,
            PrimitiveType::LineStrip => self.line_count += n.saturating_sub(1),
            PrimitiveType::LineLoop => self.line_count += n,
            PrimitiveType::TriangleList => self.triangle_count += n / 3,
            PrimitiveType::TriangleStrip | PrimitiveType::TriangleFan => {
                self.triangle_count += n.saturating_sub(2)
            }
        }
    }

    pub fn primitive_count(&self) -> u64 {
        self.point_count + self.line_count + self.triangle_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counted(primitive: PrimitiveType, n: u32) -> Frame {
        let mut f = Frame::default();
        f.add_primitives(primitive, n);
        f
    }

    #[test]
    fn primitive_accounting_per_topology() {
        assert_eq!(counted(PrimitiveType::PointList, 7).point_count, 7);
        assert_eq!(counted(PrimitiveType::LineList, 7).line_count, 3);
        assert_eq!(counted(PrimitiveType::LineStrip, 7).line_count, 6);
        assert_eq!(counted(PrimitiveType::LineLoop, 7).line_count, 7);
        assert_eq!(counted(PrimitiveType::TriangleList, 7).triangle_count, 2);
        assert_eq!(counted(PrimitiveType::TriangleStrip, 7).triangle_count, 5);
        assert_eq!(counted(PrimitiveType::TriangleFan, 7).triangle_count, 5);
    }

    #[test]
    fn short_strips_do_not_underflow() {
        assert_eq!(counted(PrimitiveType::TriangleStrip, 1).triangle_count, 0);
        assert_eq!(counted(PrimitiveType::LineStrip, 0).line_count, 0);
    }

    #[test]
    fn every_draw_is_one_operation() {
        let mut f = Frame::default();
        f.add_primitives(PrimitiveType::TriangleList, 3);
        f.add_primitives(PrimitiveType::PointList, 1);
        assert_eq!(f.operation_count, 2);
        assert_eq!(f.vertex_count, 4);
        assert_eq!(f.primitive_count(), 2);
    }
}
