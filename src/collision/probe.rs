//! Raycast Collision Probe
//!
//! Casts fans of parallel rays from a character's bounding box:
//!
//! ```text
//!            up rays
//!          ↑   ↑   ↑
//!        ┌───────────┐
//!   ← 2  │           │  2 →      horizontal fans: index 0 at the bottom
//!   ← 1  │     +     │  1 →
//!   ← 0  │           │  0 →
//!        └───────────┘
//!          ↓   ↓   ↓
//!           down rays              vertical fans: index 0 on the left
//! ```
//!
//! Every ray starts `skin` inside the box so a character resting exactly on a
//! surface still registers it. All distances reported to callers are measured
//! from the box face (hit distance minus skin), never negative.

use serde::{Serialize, Deserialize};
use tracing::warn;

use crate::core::fixed::{Fixed, CONTACT_EPSILON, fixed_abs, fixed_mul};
use crate::core::vec2::FixedVec2;
use super::geometry::{CollisionWorld, ColliderId, LayerMask, RayHit};

// =============================================================================
// SIDES & RESULTS
// =============================================================================

/// Face of the bounding box a fan is cast from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// -Y, feet
    Down,
    /// +Y, head
    Up,
    /// -X
    Left,
    /// +X
    Right,
}

impl Side {
    /// Unit direction the fan is cast in.
    pub fn direction(self) -> FixedVec2 {
        match self {
            Side::Down => FixedVec2::DOWN,
            Side::Up => FixedVec2::UP,
            Side::Left => FixedVec2::LEFT,
            Side::Right => FixedVec2::RIGHT,
        }
    }

    /// Horizontal side for a sign (-1 left, otherwise right).
    pub fn horizontal(sign: i32) -> Side {
        if sign < 0 { Side::Left } else { Side::Right }
    }

    /// Vertical side for a sign (-1 down, otherwise up).
    pub fn vertical(sign: i32) -> Side {
        if sign < 0 { Side::Down } else { Side::Up }
    }

    /// -1 for left/down, 1 for right/up.
    pub fn sign(self) -> i32 {
        match self {
            Side::Down | Side::Left => -1,
            Side::Up | Side::Right => 1,
        }
    }

    fn is_horizontal(self) -> bool {
        matches!(self, Side::Left | Side::Right)
    }
}

/// Contact summary for one side. Recomputed every step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollisionInfo {
    /// Touching a surface (face distance within contact epsilon).
    pub colliding: bool,
    /// Distance from the box face to the nearest surface (0 when touching).
    pub distance: Fixed,
    /// Any ray in the fan connected within probe range.
    pub ray_hit: bool,
    /// Ray index 0 connected.
    pub first_hit: bool,
    /// Last ray in the fan connected.
    pub last_hit: bool,
    /// Number of rays that connected.
    pub hit_count: u32,
    /// Direction the fan was cast in.
    pub direction: FixedVec2,
    /// Nearest collider, if any.
    pub collider: Option<ColliderId>,
    /// Layer bits of the nearest collider (0 when nothing was hit).
    pub layer: LayerMask,
}

impl CollisionInfo {
    fn empty(side: Side) -> Self {
        Self {
            direction: side.direction(),
            ..Self::default()
        }
    }

    /// Only the lowest ray of a multi-ray fan connected: the wall ends
    /// below the character's upper body.
    pub fn is_ledge(&self) -> bool {
        self.hit_count == 1 && self.first_hit && !self.last_hit
    }
}

/// Contact summary for all four sides.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollisionReport {
    /// Ground
    pub down: CollisionInfo,
    /// Ceiling
    pub up: CollisionInfo,
    /// Wall on the left
    pub left: CollisionInfo,
    /// Wall on the right
    pub right: CollisionInfo,
}

impl CollisionReport {
    /// Info for one side.
    pub fn side(&self, side: Side) -> &CollisionInfo {
        match side {
            Side::Down => &self.down,
            Side::Up => &self.up,
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// Standing on something.
    pub fn grounded(&self) -> bool {
        self.down.colliding
    }

    /// Touching a wall on either side.
    pub fn on_wall(&self) -> bool {
        self.left.colliding || self.right.colliding
    }

    /// Nearest wall that any ray reached. Equal distances go to `facing`.
    pub fn closest_horizontal(&self, facing: i32) -> Option<(Side, CollisionInfo)> {
        match (self.left.ray_hit, self.right.ray_hit) {
            (false, false) => None,
            (true, false) => Some((Side::Left, self.left)),
            (false, true) => Some((Side::Right, self.right)),
            (true, true) => {
                if self.left.distance < self.right.distance {
                    Some((Side::Left, self.left))
                } else if self.right.distance < self.left.distance {
                    Some((Side::Right, self.right))
                } else {
                    let side = Side::horizontal(facing);
                    Some((side, *self.side(side)))
                }
            }
        }
    }
}

/// Displacement after `handle_collisions`, with the sides that blocked it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolution {
    /// Displacement that can be applied without penetrating
    pub displacement: FixedVec2,
    /// Side the horizontal move was cut short on
    pub blocked_horizontal: Option<Side>,
    /// Side the vertical move was cut short on
    pub blocked_vertical: Option<Side>,
}

/// A ray cast during the last probe, kept for a debug renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DebugRay {
    /// Ray start
    pub origin: FixedVec2,
    /// Unit direction
    pub direction: FixedVec2,
    /// Cast length
    pub length: Fixed,
    /// Hit distance, if any
    pub hit: Option<Fixed>,
}

// =============================================================================
// SETTINGS
// =============================================================================

/// Probe configuration (fixed-point).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionSettings {
    /// Half width and half height of the bounding box.
    pub half_extents: FixedVec2,
    /// Inset of every ray origin.
    pub skin_width: Fixed,
    /// Rays per side.
    pub ray_count: i32,
    /// Solid geometry layers.
    pub collision_mask: LayerMask,
    /// Moving platform layers (also solid).
    pub platform_mask: LayerMask,
    /// How far past the face vertical probes look.
    pub vertical_probe: Fixed,
    /// How far past the face horizontal probes look.
    pub horizontal_probe: Fixed,
    /// Keep every cast ray for a debug renderer.
    pub record_debug_rays: bool,
}

// =============================================================================
// COLLISION SYSTEM
// =============================================================================

/// Per-character raycast probe.
#[derive(Clone, Debug)]
pub struct CollisionSystem {
    half_extents: FixedVec2,
    skin: Fixed,
    ray_count: u32,
    mask: LayerMask,
    platform_mask: LayerMask,
    vertical_probe: Fixed,
    horizontal_probe: Fixed,
    record_rays: bool,
    debug_rays: Vec<DebugRay>,
}

impl CollisionSystem {
    /// Build a probe, degrading invalid settings once (logged) instead of failing.
    pub fn new(settings: CollisionSettings) -> Self {
        let ray_count = if settings.ray_count <= 0 {
            warn!(ray_count = settings.ray_count, "Ray count must be positive, using one centered ray");
            1
        } else {
            settings.ray_count as u32
        };

        let skin = if settings.skin_width <= 0 {
            if settings.skin_width < 0 {
                warn!(skin_width = settings.skin_width, "Negative skin width, using zero");
            }
            0
        } else {
            settings.skin_width
        };

        let mask = settings.collision_mask | settings.platform_mask;
        if mask == 0 {
            warn!("No collision layer assigned, probe treats the world as empty");
        }

        Self {
            half_extents: settings.half_extents.abs(),
            skin,
            ray_count,
            mask,
            platform_mask: settings.platform_mask,
            vertical_probe: settings.vertical_probe.max(0),
            horizontal_probe: settings.horizontal_probe.max(0),
            record_rays: settings.record_debug_rays,
            debug_rays: Vec::new(),
        }
    }

    /// Rays per side after degradation.
    pub fn ray_count(&self) -> u32 {
        self.ray_count
    }

    /// Skin width after degradation.
    pub fn skin_width(&self) -> Fixed {
        self.skin
    }

    /// Bounding box half extents.
    pub fn half_extents(&self) -> FixedVec2 {
        self.half_extents
    }

    /// Layers every query is filtered with.
    pub fn query_mask(&self) -> LayerMask {
        self.mask
    }

    /// Whether a hit layer belongs to a moving platform.
    pub fn is_platform_layer(&self, layer: LayerMask) -> bool {
        layer & self.platform_mask != 0
    }

    /// Rays cast since the last clear (empty unless recording is enabled).
    pub fn debug_rays(&self) -> &[DebugRay] {
        &self.debug_rays
    }

    /// Drop recorded rays. Called at the start of every step.
    pub fn clear_debug_rays(&mut self) {
        self.debug_rays.clear();
    }

    /// Toggle debug ray recording.
    pub fn set_record_debug_rays(&mut self, enabled: bool) {
        self.record_rays = enabled;
        if !enabled {
            self.debug_rays.clear();
        }
    }

    fn cast<W: CollisionWorld + ?Sized>(
        &mut self,
        world: &W,
        origin: FixedVec2,
        direction: FixedVec2,
        length: Fixed,
    ) -> Option<RayHit> {
        let hit = if self.mask == 0 {
            None
        } else {
            world.raycast(origin, direction, length, self.mask)
        };
        if self.record_rays {
            self.debug_rays.push(DebugRay {
                origin,
                direction,
                length,
                hit: hit.map(|h| h.distance),
            });
        }
        hit
    }

    /// Origin of ray `index` on `side` for a box centered at `position`.
    pub fn fan_origin(&self, position: FixedVec2, side: Side, index: u32) -> FixedVec2 {
        let h = self.half_extents;
        let s = self.skin;

        let (center, half) = if side.is_horizontal() {
            (position.y, h.y - s)
        } else {
            (position.x, h.x - s)
        };

        let along = if self.ray_count == 1 {
            center
        } else {
            let start = center as i64 - half as i64;
            let span = 2 * half as i64;
            (start + span * index as i64 / (self.ray_count - 1) as i64) as Fixed
        };

        match side {
            Side::Down => FixedVec2::new(along, position.y - h.y + s),
            Side::Up => FixedVec2::new(along, position.y + h.y - s),
            Side::Left => FixedVec2::new(position.x - h.x + s, along),
            Side::Right => FixedVec2::new(position.x + h.x - s, along),
        }
    }

    /// Cast one fan and summarize it.
    pub fn probe_side<W: CollisionWorld + ?Sized>(
        &mut self,
        world: &W,
        position: FixedVec2,
        side: Side,
        range: Fixed,
    ) -> CollisionInfo {
        let mut info = CollisionInfo::empty(side);
        let direction = side.direction();
        let length = self.skin + range;
        let last = self.ray_count - 1;
        let mut nearest: Option<RayHit> = None;

        for i in 0..self.ray_count {
            let origin = self.fan_origin(position, side, i);
            let Some(hit) = self.cast(world, origin, direction, length) else {
                continue;
            };

            info.hit_count += 1;
            if i == 0 {
                info.first_hit = true;
            }
            if i == last {
                info.last_hit = true;
            }
            if nearest.map_or(true, |n| hit.distance < n.distance) {
                nearest = Some(hit);
            }
        }

        if let Some(hit) = nearest {
            info.ray_hit = true;
            info.distance = (hit.distance - self.skin).max(0);
            info.colliding = info.distance <= CONTACT_EPSILON;
            info.collider = Some(hit.collider);
            info.layer = hit.layer;
        }
        info
    }

    /// Probe all four sides at `position`.
    pub fn probe<W: CollisionWorld + ?Sized>(&mut self, world: &W, position: FixedVec2) -> CollisionReport {
        let vertical = self.vertical_probe;
        let horizontal = self.horizontal_probe;
        CollisionReport {
            down: self.probe_side(world, position, Side::Down, vertical),
            up: self.probe_side(world, position, Side::Up, vertical),
            left: self.probe_side(world, position, Side::Left, horizontal),
            right: self.probe_side(world, position, Side::Right, horizontal),
        }
    }

    /// Clamp an intended displacement against obstructions.
    ///
    /// The horizontal component is resolved first at the current height, the
    /// vertical one from the horizontally shifted box, so corners cannot be
    /// cut through.
    pub fn handle_collisions<W: CollisionWorld + ?Sized>(
        &mut self,
        world: &W,
        position: FixedVec2,
        displacement: FixedVec2,
    ) -> Resolution {
        let mut resolved = displacement;
        let mut blocked_horizontal = None;
        let mut blocked_vertical = None;

        if resolved.x != 0 {
            let side = Side::horizontal(resolved.x.signum());
            let (dx, blocked) = self.clamp_axis(world, position, side, fixed_abs(resolved.x));
            resolved.x = dx * side.sign();
            if blocked {
                blocked_horizontal = Some(side);
            }
        }

        if resolved.y != 0 {
            let side = Side::vertical(resolved.y.signum());
            let shifted = position + FixedVec2::new(resolved.x, 0);
            let (dy, blocked) = self.clamp_axis(world, shifted, side, fixed_abs(resolved.y));
            resolved.y = dy * side.sign();
            if blocked {
                blocked_vertical = Some(side);
            }
        }

        Resolution {
            displacement: resolved,
            blocked_horizontal,
            blocked_vertical,
        }
    }

    /// Shrink a non-negative travel distance to the nearest hit on `side`.
    fn clamp_axis<W: CollisionWorld + ?Sized>(
        &mut self,
        world: &W,
        position: FixedVec2,
        side: Side,
        travel: Fixed,
    ) -> (Fixed, bool) {
        let direction = side.direction();
        let mut length = travel.saturating_add(self.skin);
        let mut allowed = travel;
        let mut blocked = false;

        for i in 0..self.ray_count {
            let origin = self.fan_origin(position, side, i);
            if let Some(hit) = self.cast(world, origin, direction, length) {
                allowed = allowed.min((hit.distance - self.skin).max(0));
                length = hit.distance;
                blocked = true;
            }
        }
        (allowed, blocked)
    }

    /// Furthest point toward `far_point` the box can reach along `direction`.
    ///
    /// Casts from the center, the four skin-inset corners and the side fans
    /// of every face the dash moves toward. Each cast is offset by how far
    /// that origin sits behind the leading face, so the minimum over all of
    /// them is the travel of the whole box.
    pub fn dash_hit_pos<W: CollisionWorld + ?Sized>(
        &mut self,
        world: &W,
        position: FixedVec2,
        direction: FixedVec2,
        far_point: FixedVec2,
    ) -> FixedVec2 {
        let far = position.distance(far_point);
        if far == 0 || direction.is_zero() {
            return position;
        }

        let h = self.half_extents;
        let cx = h.x - self.skin;
        let cy = h.y - self.skin;
        let extent = fixed_mul(fixed_abs(direction.x), h.x) + fixed_mul(fixed_abs(direction.y), h.y);

        let mut offsets = vec![
            FixedVec2::ZERO,
            FixedVec2::new(cx, cy),
            FixedVec2::new(-cx, cy),
            FixedVec2::new(cx, -cy),
            FixedVec2::new(-cx, -cy),
        ];
        let mut leading = Vec::with_capacity(2);
        if direction.x != 0 {
            leading.push(Side::horizontal(direction.x.signum()));
        }
        if direction.y != 0 {
            leading.push(Side::vertical(direction.y.signum()));
        }
        for side in leading {
            for i in 0..self.ray_count {
                offsets.push(self.fan_origin(FixedVec2::ZERO, side, i));
            }
        }

        let mut travel = far;
        for offset in offsets {
            let lead = extent - offset.dot(direction);
            let length = far.saturating_add(lead);
            if let Some(hit) = self.cast(world, position + offset, direction, length) {
                travel = travel.min((hit.distance - lead).max(0));
            }
        }

        if travel == far {
            far_point
        } else {
            position + direction.scale(travel)
        }
    }
}
