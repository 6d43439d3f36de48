//! Axis-aligned rectangles and the two hitbox shapes bodies can use.
//!
//! Coordinates follow the tile grid: `x` grows rightwards, `y` grows
//! downwards, and one unit is one grid cell.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Rect
// ---------------------------------------------------------------------------

/// An axis-aligned rectangle anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The same rectangle moved so its top-left corner sits at `(x, y)`.
    #[inline]
    pub fn at(self, x: f32, y: f32) -> Self {
        Self { x, y, ..self }
    }

    #[inline]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Strict overlap: rectangles that only share an edge do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Penetration depth along x; zero or negative when the projections are
    /// disjoint.
    pub fn overlap_x(&self, other: &Rect) -> f32 {
        self.right().min(other.right()) - self.x.max(other.x)
    }

    /// Penetration depth along y; zero or negative when the projections are
    /// disjoint.
    pub fn overlap_y(&self, other: &Rect) -> f32 {
        self.bottom().min(other.bottom()) - self.y.max(other.y)
    }
}

// ---------------------------------------------------------------------------
// Hitbox
// ---------------------------------------------------------------------------

/// Shape used when testing a body against other bodies.
///
/// Terrain sampling always uses the bounding rectangle; the hitbox only
/// matters for body-versus-body checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Hitbox {
    /// The bounding rectangle itself.
    #[default]
    Rectangle,
    /// The circle inscribed in the bounding rectangle (radius is half the
    /// shorter side).
    Circle,
}

fn radius(rect: &Rect) -> f32 {
    rect.width.min(rect.height) / 2.0
}

/// Whether two shaped bodies touch with positive area.
pub fn hitboxes_collide(a: &Rect, a_shape: Hitbox, b: &Rect, b_shape: Hitbox) -> bool {
    match (a_shape, b_shape) {
        (Hitbox::Rectangle, Hitbox::Rectangle) => a.overlaps(b),
        (Hitbox::Circle, Hitbox::Circle) => {
            let (ax, ay) = a.center();
            let (bx, by) = b.center();
            let reach = radius(a) + radius(b);
            let (dx, dy) = (ax - bx, ay - by);
            dx * dx + dy * dy < reach * reach
        }
        (Hitbox::Rectangle, Hitbox::Circle) => rect_touches_circle(a, b),
        (Hitbox::Circle, Hitbox::Rectangle) => rect_touches_circle(b, a),
    }
}

fn rect_touches_circle(rect: &Rect, circle_bounds: &Rect) -> bool {
    let (cx, cy) = circle_bounds.center();
    let r = radius(circle_bounds);
    let nearest_x = cx.clamp(rect.x, rect.right());
    let nearest_y = cy.clamp(rect.y, rect.bottom());
    let (dx, dy) = (cx - nearest_x, cy - nearest_y);
    dx * dx + dy * dy < r * r
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_edge_is_not_an_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
        assert_eq!(a.overlap_x(&b), 0.0);
    }

    #[test]
    fn partial_overlap_reports_depths() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(7.0, 4.0, 10.0, 10.0);
        assert!(a.overlaps(&b));
        assert_eq!(a.overlap_x(&b), 3.0);
        assert_eq!(a.overlap_y(&b), 6.0);
    }

    #[test]
    fn at_keeps_size() {
        let r = Rect::new(1.0, 2.0, 3.0, 4.0).at(10.0, 20.0);
        assert_eq!(r, Rect::new(10.0, 20.0, 3.0, 4.0));
        assert_eq!(r.center(), (11.5, 22.0));
    }

    #[test]
    fn circles_use_the_inscribed_radius() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        // Bounding boxes overlap at the corner but the circles do not.
        let b = Rect::new(8.0, 8.0, 10.0, 10.0);
        assert!(a.overlaps(&b));
        assert!(!hitboxes_collide(&a, Hitbox::Circle, &b, Hitbox::Circle));

        let c = Rect::new(6.0, 0.0, 10.0, 10.0);
        assert!(hitboxes_collide(&a, Hitbox::Circle, &c, Hitbox::Circle));
    }

    #[test]
    fn rectangle_against_circle_is_symmetric() {
        let square = Rect::new(0.0, 0.0, 10.0, 10.0);
        let ball = Rect::new(9.0, 9.0, 4.0, 4.0);
        // Ball centre (11, 11) is sqrt(2) from the square's corner, radius 2.
        assert!(hitboxes_collide(&square, Hitbox::Rectangle, &ball, Hitbox::Circle));
        assert!(hitboxes_collide(&ball, Hitbox::Circle, &square, Hitbox::Rectangle));

        let far_ball = Rect::new(11.0, 11.0, 4.0, 4.0);
        assert!(!hitboxes_collide(&square, Hitbox::Rectangle, &far_ball, Hitbox::Circle));
    }
}
