use glam::Vec3;

/// Axis-aligned bounding box, stored as `(vmin, vmax)` per the data model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub vmin: Vec3,
    pub vmax: Vec3,
}

impl Aabb {
    /// An "empty" box: `vmax < vmin` on every axis, so the first point
    /// expanded into it always wins. Matches the original's convention for
    /// detecting a box that was never touched.
    pub const EMPTY: Aabb = Aabb {
        vmin: Vec3::splat(f32::MAX),
        vmax: Vec3::splat(f32::MIN),
    };

    pub fn is_empty(&self) -> bool {
        self.vmax.x < self.vmin.x || self.vmax.y < self.vmin.y || self.vmax.z < self.vmin.z
    }

    pub fn expand(&mut self, p: Vec3) {
        self.vmin = self.vmin.min(p);
        self.vmax = self.vmax.max(p);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Aabb {
            vmin: self.vmin.min(other.vmin),
            vmax: self.vmax.max(other.vmax),
        }
    }

    pub fn transformed(&self, m: &glam::Mat4) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        let corners = [
            Vec3::new(self.vmin.x, self.vmin.y, self.vmin.z),
            Vec3::new(self.vmax.x, self.vmin.y, self.vmin.z),
            Vec3::new(self.vmin.x, self.vmax.y, self.vmin.z),
            Vec3::new(self.vmax.x, self.vmax.y, self.vmin.z),
            Vec3::new(self.vmin.x, self.vmin.y, self.vmax.z),
            Vec3::new(self.vmax.x, self.vmin.y, self.vmax.z),
            Vec3::new(self.vmin.x, self.vmax.y, self.vmax.z),
            Vec3::new(self.vmax.x, self.vmax.y, self.vmax.z),
        ];
        let mut out = Aabb::EMPTY;
        for c in corners {
            out.expand(m.transform_point3(c));
        }
        out
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Aabb::EMPTY
    }
}

/// Approximate equality helper used by tests instead of pulling in `approx`.
pub fn aabb_close(a: &Aabb, b: &Aabb, eps: f32) -> bool {
    a.vmin.abs_diff_eq(b.vmin, eps) && a.vmax.abs_diff_eq(b.vmax, eps)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_box_is_empty() {
        assert!(Aabb::EMPTY.is_empty());
    }

    #[test]
    fn expand_grows_bounds() {
        let mut b = Aabb::EMPTY;
        b.expand(Vec3::new(1.0, 2.0, 3.0));
        b.expand(Vec3::new(-1.0, 0.0, 5.0));
        assert!(!b.is_empty());
        assert_eq!(b.vmin, Vec3::new(-1.0, 0.0, 3.0));
        assert_eq!(b.vmax, Vec3::new(1.0, 2.0, 5.0));
    }

    #[test]
    fn union_of_empty_and_box_is_box() {
        let mut b = Aabb::EMPTY;
        b.expand(Vec3::ONE);
        let u = Aabb::EMPTY.union(&b);
        assert!(aabb_close(&u, &b, 1e-6));
    }
}
