/// Axis-aligned integer rectangle in physical pixels.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Recti {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Recti {
    #[inline]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle anchored at the origin with the given size.
    #[inline]
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Exclusive right edge.
    #[inline]
    pub fn right(self) -> i64 {
        self.x as i64 + self.width as i64
    }

    /// Exclusive bottom edge.
    #[inline]
    pub fn bottom(self) -> i64 {
        self.y as i64 + self.height as i64
    }

    /// Returns `true` if every pixel of `other` lies inside `self`.
    ///
    /// An empty `other` is covered by any rectangle.
    #[inline]
    pub fn covers(self, other: Recti) -> bool {
        if other.is_empty() {
            return true;
        }

        self.x <= other.x
            && self.y <= other.y
            && self.right() >= other.right()
            && self.bottom() >= other.bottom()
    }

    #[inline]
    pub fn intersect(self, other: Recti) -> Option<Recti> {
        let x0 = (self.x as i64).max(other.x as i64);
        let y0 = (self.y as i64).max(other.y as i64);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());

        if x1 <= x0 || y1 <= y0 {
            None
        } else {
            Some(Recti::new(x0 as i32, y0 as i32, (x1 - x0) as u32, (y1 - y0) as u32))
        }
    }
}
