//! Minimum-translation push-out between two overlapping rectangles.
//!
//! Only the target moves. The resolver looks at one pair at a time and does
//! not iterate to a fixed point: after pushing a target away from several
//! movers, callers that need every pair separated must re-check.

use tilestep_core::geometry::Rect;

/// Axis a push is applied along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// Signed correction for the target rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Push {
    pub axis: Axis,
    /// Signed distance along `axis`; positive pushes right or down.
    pub distance: f64,
    /// Where the target's `x` (or `y`) ends up: flush against the mover's
    /// edge.
    pub to: f32,
}

impl Push {
    /// Move `rect` to the pushed coordinate. The other axis is left
    /// untouched.
    pub fn apply(self, rect: &mut Rect) {
        match self.axis {
            Axis::X => rect.x = self.to,
            Axis::Y => rect.y = self.to,
        }
    }
}

/// Compute the push that separates `target` from `mover`, or `None` when the
/// rectangles do not overlap.
///
/// Overlap depths are `half-widths sum - |centre distance|` per axis. When
/// the y depth is strictly greater the target is pushed along x, otherwise
/// along y (equal depths push along y). The sign follows which side of the
/// mover's centre the target's centre lies on; coincident centres push left
/// or up.
///
/// The pushed coordinate is snapped to the mover's edge in `f32`, so
/// [`Rect::overlaps`] is false for the result.
pub fn resolve_overlap(mover: &Rect, target: &Rect) -> Option<Push> {
    if !mover.overlaps(target) {
        return None;
    }
    let (mx, my) = centre(mover);
    let (tx, ty) = centre(target);

    let depth_x = (f64::from(mover.width) + f64::from(target.width)) / 2.0 - (tx - mx).abs();
    let depth_y = (f64::from(mover.height) + f64::from(target.height)) / 2.0 - (ty - my).abs();

    let push = if depth_y > depth_x {
        let forward = tx > mx;
        Push {
            axis: Axis::X,
            distance: if forward { depth_x } else { -depth_x },
            to: flush(mover.x, mover.right(), target.width, forward),
        }
    } else {
        let forward = ty > my;
        Push {
            axis: Axis::Y,
            distance: if forward { depth_y } else { -depth_y },
            to: flush(mover.y, mover.bottom(), target.height, forward),
        }
    };
    Some(push)
}

/// Target origin that just clears the mover span `[near, far)`.
///
/// Going forward the target starts at `far`, which never overlaps. Going
/// back, `near - extent` can round so that the target's far edge still
/// lands past `near`; nudge it down until it does not. A nudge is at least
/// one ulp of `to` and one epsilon of the larger operand.
fn flush(near: f32, far: f32, extent: f32, forward: bool) -> f32 {
    if forward {
        return far;
    }
    let mut to = near - extent;
    let step = f32::EPSILON * near.abs().max(extent.abs());
    for _ in 0..8 {
        if to + extent <= near || !to.is_finite() {
            break;
        }
        to = next_down(to).min(to - step);
    }
    to
}

/// Largest `f32` strictly below `v` (finite, non-NaN input).
fn next_down(v: f32) -> f32 {
    if v == 0.0 {
        return -f32::from_bits(1);
    }
    let bits = v.to_bits();
    if v > 0.0 {
        f32::from_bits(bits - 1)
    } else {
        f32::from_bits(bits + 1)
    }
}

fn centre(rect: &Rect) -> (f64, f64) {
    (
        f64::from(rect.x) + f64::from(rect.width) / 2.0,
        f64::from(rect.y) + f64::from(rect.height) / 2.0,
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disjoint_rectangles_need_no_push() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert_eq!(resolve_overlap(&a, &b), None);
    }

    #[test]
    fn shallow_horizontal_overlap_pushes_sideways() {
        let mover = Rect::new(0.0, 0.0, 10.0, 10.0);
        let mut target = Rect::new(8.0, 1.0, 10.0, 10.0);
        let push = resolve_overlap(&mover, &target).unwrap();
        assert_eq!(push, Push { axis: Axis::X, distance: 2.0, to: 10.0 });

        push.apply(&mut target);
        assert_eq!(target, Rect::new(10.0, 1.0, 10.0, 10.0));
        assert!(!mover.overlaps(&target));
    }

    #[test]
    fn shallow_vertical_overlap_pushes_up() {
        let mover = Rect::new(0.0, 10.0, 20.0, 10.0);
        let mut target = Rect::new(5.0, 3.0, 6.0, 8.0);
        let push = resolve_overlap(&mover, &target).unwrap();
        assert_eq!(push.axis, Axis::Y);
        assert_eq!(push.distance, -1.0);

        push.apply(&mut target);
        assert_eq!(target.y, 2.0);
        assert_eq!(target.x, 5.0);
    }

    #[test]
    fn equal_depths_push_along_y() {
        let mover = Rect::new(0.0, 0.0, 10.0, 10.0);
        let target = Rect::new(7.0, 7.0, 10.0, 10.0);
        let push = resolve_overlap(&mover, &target).unwrap();
        assert_eq!(push, Push { axis: Axis::Y, distance: 3.0, to: 10.0 });
    }

    #[test]
    fn direction_follows_target_centre() {
        // Target's left edge is left of the mover's centre but its centre
        // is to the right, so it goes right.
        let mover = Rect::new(0.0, 0.0, 10.0, 40.0);
        let target = Rect::new(4.0, 10.0, 10.0, 10.0);
        let push = resolve_overlap(&mover, &target).unwrap();
        assert_eq!(push, Push { axis: Axis::X, distance: 6.0, to: 10.0 });
    }

    #[test]
    fn coincident_centres_push_up() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        let push = resolve_overlap(&r, &r).unwrap();
        assert_eq!(push, Push { axis: Axis::Y, distance: -10.0, to: -10.0 });
    }

    #[test]
    fn fractional_push_left_clears_the_mover() {
        let mover = Rect::new(0.1, 0.0, 1.0, 10.0);
        let mut target = Rect::new(-0.5, 2.0, 1.0, 3.0);
        let push = resolve_overlap(&mover, &target).unwrap();
        assert_eq!(push.axis, Axis::X);
        assert!(push.distance < 0.0);

        push.apply(&mut target);
        assert!(target.right() <= mover.x);
        assert!(!mover.overlaps(&target));
        assert!(mover.overlap_x(&target) <= 0.0);
    }

    #[test]
    fn fractional_push_up_clears_the_mover() {
        let mover = Rect::new(31.606535, 30.97036, 20.285948, 20.493317);
        let mut target = Rect::new(28.893272, 38.873, 7.29309, 7.9667015);
        let push = resolve_overlap(&mover, &target).unwrap();
        push.apply(&mut target);
        assert!(!mover.overlaps(&target));
    }

    #[test]
    fn next_down_steps_one_ulp() {
        assert_eq!(next_down(1.0), f32::from_bits(1.0f32.to_bits() - 1));
        assert!(next_down(-1.0) < -1.0);
        assert!(next_down(0.0) < 0.0);
    }
}
