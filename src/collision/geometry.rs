//! Collision Geometry
//!
//! The collision probe only ever asks one question of the level: "what is
//! the nearest solid along this ray?". [`CollisionWorld`] is that question.
//! [`BoxWorld`] answers it for a list of axis-aligned boxes, some of which
//! may move (platforms).

use serde::{Serialize, Deserialize};

use crate::core::fixed::Fixed;
use crate::core::hash::StateHasher;
use crate::core::vec2::FixedVec2;

/// Bit set of collision layers. A query hits a collider when the masks overlap.
pub type LayerMask = u32;

/// Stable handle of a collider in a world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColliderId(pub u32);

impl ColliderId {
    /// Handle reported for hits against solid world bounds.
    pub const BOUNDS: ColliderId = ColliderId(u32::MAX);
}

/// Result of a single raycast.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RayHit {
    /// Distance from the ray origin to the surface (0 if the origin is inside).
    pub distance: Fixed,
    /// World-space hit point.
    pub point: FixedVec2,
    /// Collider that was hit.
    pub collider: ColliderId,
    /// Layer bits of the collider that was hit.
    pub layer: LayerMask,
}

/// Read-only ray query over level geometry.
///
/// `direction` must be unit length. Implementations must be deterministic:
/// identical geometry and arguments always give the identical hit.
pub trait CollisionWorld {
    /// Nearest hit within `max_distance` on any layer in `mask`.
    fn raycast(
        &self,
        origin: FixedVec2,
        direction: FixedVec2,
        max_distance: Fixed,
        mask: LayerMask,
    ) -> Option<RayHit>;
}

/// Velocity of mobile surfaces a character may stand on.
pub trait PlatformVelocitySource {
    /// Velocity (units/second) of `collider`, or `None` if it is static or unknown.
    fn platform_velocity(&self, collider: ColliderId) -> Option<FixedVec2>;
}

// =============================================================================
// AABB
// =============================================================================

/// Axis-aligned box given by its min and max corners.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aabb {
    /// Lower-left corner
    pub min: FixedVec2,
    /// Upper-right corner
    pub max: FixedVec2,
}

impl Aabb {
    /// Create from two corners (normalized so min <= max).
    pub fn new(a: FixedVec2, b: FixedVec2) -> Self {
        Self {
            min: FixedVec2::new(a.x.min(b.x), a.y.min(b.y)),
            max: FixedVec2::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Create from a center and half extents.
    pub fn from_center(center: FixedVec2, half_extents: FixedVec2) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    /// Create from designer (float) corner coordinates.
    pub fn from_floats(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self::new(
            FixedVec2::from_floats(min_x, min_y),
            FixedVec2::from_floats(max_x, max_y),
        )
    }

    /// Whether the point lies inside or on the boundary.
    pub fn contains(&self, p: FixedVec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    /// Move the box by `offset`.
    pub fn translate(&mut self, offset: FixedVec2) {
        self.min = self.min + offset;
        self.max = self.max + offset;
    }

    /// Slab test. Returns the entry distance along a unit ray, 0 when the
    /// origin is inside, `None` on a miss or when the box is beyond `max_distance`.
    ///
    /// Boundaries are inclusive: a ray grazing an edge counts as a hit.
    pub fn raycast(&self, origin: FixedVec2, direction: FixedVec2, max_distance: Fixed) -> Option<Fixed> {
        let mut t_near = i64::MIN;
        let mut t_far = i64::MAX;

        for (o, d, lo, hi) in [
            (origin.x, direction.x, self.min.x, self.max.x),
            (origin.y, direction.y, self.min.y, self.max.y),
        ] {
            if d == 0 {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }

            let t1 = slab_distance(lo, o, d);
            let t2 = slab_distance(hi, o, d);
            let (near, far) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };

            t_near = t_near.max(near);
            t_far = t_far.min(far);
            if t_near > t_far {
                return None;
            }
        }

        if t_far < 0 {
            return None;
        }

        let t = t_near.max(0);
        if t > max_distance as i64 {
            return None;
        }
        Some(t as Fixed)
    }

    /// Distance along a unit ray, starting inside the box, to where it leaves.
    fn exit_distance(&self, origin: FixedVec2, direction: FixedVec2) -> i64 {
        let mut t_exit = i64::MAX;
        for (o, d, lo, hi) in [
            (origin.x, direction.x, self.min.x, self.max.x),
            (origin.y, direction.y, self.min.y, self.max.y),
        ] {
            if d > 0 {
                t_exit = t_exit.min(slab_distance(hi, o, d));
            } else if d < 0 {
                t_exit = t_exit.min(slab_distance(lo, o, d));
            }
        }
        t_exit
    }
}

/// `(plane - origin) / direction` in widened Q16.16 so tiny direction
/// components cannot wrap.
#[inline]
fn slab_distance(plane: Fixed, origin: Fixed, direction: Fixed) -> i64 {
    let num = (plane as i64 - origin as i64) << 16;
    num / direction as i64
}

// =============================================================================
// BOX WORLD
// =============================================================================

/// What a query reports outside the world bounds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutOfBoundsPolicy {
    /// Nothing exists outside the bounds; rays pass through.
    #[default]
    Empty,
    /// Everything outside the bounds is solid; the bounds act as walls.
    Solid,
}

/// A solid box in a [`BoxWorld`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolidBox {
    /// Handle of this box
    pub id: ColliderId,
    /// Current extent
    pub bounds: Aabb,
    /// Layer bits
    pub layer: LayerMask,
    /// Constant velocity (zero for static geometry)
    pub velocity: FixedVec2,
}

/// Level made of axis-aligned boxes.
///
/// Boxes are kept in insertion (= id) order so equal-distance hits always
/// resolve to the lowest id.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BoxWorld {
    boxes: Vec<SolidBox>,
    bounds: Option<Aabb>,
    out_of_bounds: OutOfBoundsPolicy,
    next_id: u32,
}

impl BoxWorld {
    /// Empty, unbounded world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set world bounds and the policy for queries that leave them.
    pub fn with_bounds(mut self, bounds: Aabb, policy: OutOfBoundsPolicy) -> Self {
        self.bounds = Some(bounds);
        self.out_of_bounds = policy;
        self
    }

    /// Add static geometry.
    pub fn add_box(&mut self, bounds: Aabb, layer: LayerMask) -> ColliderId {
        self.add_platform(bounds, layer, FixedVec2::ZERO)
    }

    /// Add geometry that moves with a constant velocity.
    pub fn add_platform(&mut self, bounds: Aabb, layer: LayerMask, velocity: FixedVec2) -> ColliderId {
        let id = ColliderId(self.next_id);
        self.next_id += 1;
        self.boxes.push(SolidBox {
            id,
            bounds,
            layer,
            velocity,
        });
        id
    }

    /// Remove a box (destructible terrain). Returns whether it existed.
    pub fn remove(&mut self, id: ColliderId) -> bool {
        let before = self.boxes.len();
        self.boxes.retain(|b| b.id != id);
        self.boxes.len() != before
    }

    /// Look up a box.
    pub fn get(&self, id: ColliderId) -> Option<&SolidBox> {
        self.boxes.iter().find(|b| b.id == id)
    }

    /// Change a platform's velocity.
    pub fn set_velocity(&mut self, id: ColliderId, velocity: FixedVec2) {
        if let Some(b) = self.boxes.iter_mut().find(|b| b.id == id) {
            b.velocity = velocity;
        }
    }

    /// All boxes in id order.
    pub fn boxes(&self) -> &[SolidBox] {
        &self.boxes
    }

    /// World bounds, if any.
    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }

    /// Out-of-bounds policy.
    pub fn out_of_bounds_policy(&self) -> OutOfBoundsPolicy {
        self.out_of_bounds
    }

    /// Move every mobile box by `velocity * dt`.
    pub fn advance_platforms(&mut self, dt: Fixed) {
        for b in &mut self.boxes {
            if !b.velocity.is_zero() {
                b.bounds.translate(b.velocity.scale(dt));
            }
        }
    }

    /// Hash geometry in id order.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u32(self.boxes.len() as u32);
        for b in &self.boxes {
            hasher.update_u32(b.id.0);
            hasher.update_vec2(b.bounds.min);
            hasher.update_vec2(b.bounds.max);
            hasher.update_u32(b.layer);
            hasher.update_vec2(b.velocity);
        }
    }

    fn bounds_hit(&self, origin: FixedVec2, direction: FixedVec2) -> Option<i64> {
        if self.out_of_bounds != OutOfBoundsPolicy::Solid {
            return None;
        }
        let bounds = self.bounds?;
        if !bounds.contains(origin) {
            return Some(0);
        }
        Some(bounds.exit_distance(origin, direction))
    }
}

impl CollisionWorld for BoxWorld {
    fn raycast(
        &self,
        origin: FixedVec2,
        direction: FixedVec2,
        max_distance: Fixed,
        mask: LayerMask,
    ) -> Option<RayHit> {
        if mask == 0 {
            return None;
        }

        let mut best: Option<(Fixed, ColliderId, LayerMask)> = None;
        for b in &self.boxes {
            if b.layer & mask == 0 {
                continue;
            }
            if let Some(t) = b.bounds.raycast(origin, direction, max_distance) {
                if best.map_or(true, |(bt, _, _)| t < bt) {
                    best = Some((t, b.id, b.layer));
                }
            }
        }

        if let Some(t) = self.bounds_hit(origin, direction) {
            if t <= max_distance as i64 && best.map_or(true, |(bt, _, _)| t < bt as i64) {
                best = Some((t as Fixed, ColliderId::BOUNDS, mask));
            }
        }

        best.map(|(distance, collider, layer)| RayHit {
            distance,
            point: origin + direction.scale(distance),
            collider,
            layer,
        })
    }
}

impl PlatformVelocitySource for BoxWorld {
    fn platform_velocity(&self, collider: ColliderId) -> Option<FixedVec2> {
        self.get(collider)
            .map(|b| b.velocity)
            .filter(|v| !v.is_zero())
    }
}
