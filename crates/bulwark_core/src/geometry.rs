//! Segment/circle geometry and grid walks used by interception and scoring.
//!
//! All routines are pure and total: degenerate input (zero-length segments,
//! paths that miss a circle) yields an empty result or the input position,
//! never a panic.

use fixed::types::I64F64;
use serde::{Deserialize, Serialize};

use crate::math::{inverse_lerp, wide_sqrt, Cell, Fixed, Vec3Fixed};

/// A straight shot from an origin to a destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotLine {
    /// Where the shot starts.
    pub origin: Vec3Fixed,
    /// Where the shot is aimed.
    pub destination: Vec3Fixed,
}

impl ShotLine {
    /// Create a new shot line.
    #[must_use]
    pub const fn new(origin: Vec3Fixed, destination: Vec3Fixed) -> Self {
        Self {
            origin,
            destination,
        }
    }

    /// Shot line between two cell centers.
    #[must_use]
    pub fn between_cells(source: Cell, dest: Cell) -> Self {
        Self::new(source.center(), dest.center())
    }

    /// Unit direction of travel, or zero for a degenerate line.
    #[must_use]
    pub fn direction(&self) -> Vec3Fixed {
        (self.destination - self.origin).normalize()
    }

    /// Length ignoring height.
    #[must_use]
    pub fn length_horizontal(&self) -> Fixed {
        self.origin.horizontal_distance(self.destination)
    }

    /// Cell containing the origin.
    #[must_use]
    pub fn source_cell(&self) -> Cell {
        Cell::containing(self.origin)
    }

    /// Cell containing the destination.
    #[must_use]
    pub fn dest_cell(&self) -> Cell {
        Cell::containing(self.destination)
    }

    /// Cells traversed from the source cell to the destination cell, inclusive.
    ///
    /// The walk is lazy; calling this again starts a fresh walk.
    #[must_use]
    pub fn cells(&self) -> ShotLineCells {
        ShotLineCells::new(self.source_cell(), self.dest_cell())
    }
}

/// Lazy Bresenham walk over the cells of a [`ShotLine`].
#[derive(Debug, Clone)]
pub struct ShotLineCells {
    current: Cell,
    end: Cell,
    dx: i32,
    dz: i32,
    sx: i32,
    sz: i32,
    err: i32,
    done: bool,
}

impl ShotLineCells {
    /// Walk from `start` to `end`, both inclusive.
    #[must_use]
    pub fn new(start: Cell, end: Cell) -> Self {
        let dx = (end.x - start.x).abs();
        let dz = (end.z - start.z).abs();
        Self {
            current: start,
            end,
            dx,
            dz,
            sx: if start.x < end.x { 1 } else { -1 },
            sz: if start.z < end.z { 1 } else { -1 },
            err: dx - dz,
            done: false,
        }
    }
}

impl Iterator for ShotLineCells {
    type Item = Cell;

    fn next(&mut self) -> Option<Cell> {
        if self.done {
            return None;
        }

        let cell = self.current;
        if cell == self.end {
            self.done = true;
            return Some(cell);
        }

        let e2 = 2 * self.err;
        if e2 > -self.dz {
            self.err -= self.dz;
            self.current.x += self.sx;
        }
        if e2 < self.dx {
            self.err += self.dx;
            self.current.z += self.sz;
        }

        Some(cell)
    }
}

/// Lazy row-major walk over every cell within `radius` of a center cell.
///
/// A cell is included when its integer offset satisfies `dx² + dz² ≤ r²`.
#[derive(Debug, Clone)]
pub struct RadialCells {
    center: Cell,
    radius_sq: Fixed,
    extent: i32,
    dx: i32,
    dz: i32,
}

impl RadialCells {
    /// Cells around `center` within `radius`. A negative radius yields nothing.
    #[must_use]
    pub fn new(center: Cell, radius: Fixed) -> Self {
        let radius = radius.max(Fixed::ZERO);
        let extent = radius.ceil().to_num::<i32>();
        Self {
            center,
            radius_sq: radius * radius,
            extent,
            dx: -extent,
            dz: -extent,
        }
    }
}

impl Iterator for RadialCells {
    type Item = Cell;

    fn next(&mut self) -> Option<Cell> {
        while self.dz <= self.extent {
            let (dx, dz) = (self.dx, self.dz);
            if self.dx < self.extent {
                self.dx += 1;
            } else {
                self.dx = -self.extent;
                self.dz += 1;
            }

            if Fixed::from_num(dx * dx + dz * dz) <= self.radius_sq {
                return Some(self.center.offset(dx, dz));
            }
        }
        None
    }
}

/// Parameters of the line/circle solve along `from + t·(to - from)`.
struct Crossing {
    entry: Fixed,
    exit: Fixed,
}

/// Wide intermediate for the crossing quadratic. Squares of arena-scale
/// coordinates do not fit the integer part of [`Fixed`].
type Wide = I64F64;

fn widen(v: Vec3Fixed) -> [Wide; 3] {
    [Wide::from_num(v.x), Wide::from_num(v.y), Wide::from_num(v.z)]
}

fn wide_dot(a: [Wide; 3], b: [Wide; 3]) -> Option<Wide> {
    a.into_iter()
        .zip(b)
        .try_fold(Wide::ZERO, |acc, (x, y)| acc.checked_add(x.checked_mul(y)?))
}

/// Solve `|from + t·d - center|² = r²` for `t`.
///
/// Uses the closest-approach form of the quadratic, evaluated in [`Wide`].
/// Returns `None` for a zero-length segment, a negative discriminant, or
/// crossings whose parameter does not fit a [`Fixed`].
fn solve_crossing(
    from: Vec3Fixed,
    to: Vec3Fixed,
    center: Vec3Fixed,
    radius: Fixed,
    spherical: bool,
) -> Option<Crossing> {
    let project = |v: Vec3Fixed| if spherical { v } else { v.horizontal() };
    let d = widen(project(to - from));
    let f = widen(project(from - center));

    let a = wide_dot(d, d)?;
    if a == Wide::ZERO {
        return None;
    }

    let t0 = wide_dot(f, d)?.checked_neg()?.checked_div(a)?;
    let mut h = [Wide::ZERO; 3];
    for ((h, f), d) in h.iter_mut().zip(f).zip(d) {
        *h = f.checked_add(d.checked_mul(t0)?)?;
    }
    let h_sq = wide_dot(h, h)?;
    let r = Wide::from_num(radius);
    let r_sq = r.checked_mul(r)?;
    if h_sq > r_sq {
        return None;
    }

    // Half chord over segment length keeps the quotient small.
    let dt = wide_sqrt(r_sq - h_sq).checked_div(wide_sqrt(a))?;
    Some(Crossing {
        entry: Fixed::checked_from_num(t0.checked_sub(dt)?)?,
        exit: Fixed::checked_from_num(t0.checked_add(dt)?)?,
    })
}

/// Points where the segment `from → to` crosses a circle.
///
/// Returns 0, 1 or 2 points ordered by ascending parameter `t`.
///
/// * `catch_outbound` - also accept the exit crossing beyond `to`, catching
///   a projectile leaving the circle from inside.
/// * `spherical` - solve in 3D; otherwise heights are ignored (vertical
///   cylinder).
#[must_use]
pub fn intersection_points(
    from: Vec3Fixed,
    to: Vec3Fixed,
    center: Vec3Fixed,
    radius: Fixed,
    catch_outbound: bool,
    spherical: bool,
) -> Vec<Vec3Fixed> {
    let Some(crossing) = solve_crossing(from, to, center, radius, spherical) else {
        return Vec::new();
    };

    let mut points = Vec::with_capacity(2);
    if crossing.entry >= Fixed::ZERO && crossing.entry <= Fixed::ONE {
        points.push(from.lerp(to, crossing.entry));
    }
    if crossing.exit > crossing.entry
        && crossing.exit >= Fixed::ZERO
        && (crossing.exit <= Fixed::ONE || catch_outbound)
    {
        points.push(from.lerp(to, crossing.exit));
    }
    points
}

/// The crossing closest to `from`, if any.
#[must_use]
pub fn closest_intersection(
    from: Vec3Fixed,
    to: Vec3Fixed,
    center: Vec3Fixed,
    radius: Fixed,
    catch_outbound: bool,
    spherical: bool,
) -> Option<Vec3Fixed> {
    // Points come back in ascending t, all at t >= 0.
    intersection_points(from, to, center, radius, catch_outbound, spherical)
        .into_iter()
        .next()
}

/// Precise point where `origin → cur_position` crosses a shield's edge.
///
/// Prefers the entry crossing and falls back to the exit crossing. Returns
/// `cur_position` unchanged when the path never touches the circle.
#[must_use]
pub fn exact_position(
    origin: Vec3Fixed,
    cur_position: Vec3Fixed,
    shield_center: Vec3Fixed,
    radius: Fixed,
) -> Vec3Fixed {
    let Some(crossing) = solve_crossing(origin, cur_position, shield_center, radius, false) else {
        return cur_position;
    };

    let t = if crossing.entry >= Fixed::ZERO {
        crossing.entry
    } else if crossing.exit >= Fixed::ZERO {
        crossing.exit
    } else {
        return cur_position;
    };
    origin.lerp(cur_position, t)
}

/// Chance factor that something in `cell` intercepts a shot fired from `source`.
///
/// Zero within 5 cells of the shooter, one beyond 12 cells, linear in the
/// squared distance in between.
#[must_use]
pub fn intercept_chance_factor(source: Vec3Fixed, cell: Cell) -> Fixed {
    let dist_sq = source.horizontal_distance_squared(cell.center());
    let near = Fixed::const_from_int(25);
    let far = Fixed::const_from_int(144);
    if dist_sq <= near {
        return Fixed::ZERO;
    }
    if dist_sq >= far {
        return Fixed::ONE;
    }
    inverse_lerp(near, far, dist_sq)
}

/// Forced miss radius scaled down for short shots.
#[must_use]
pub fn adjusted_forced_miss(forced_miss: Fixed, shot: Vec3Fixed) -> Fixed {
    let len_sq = shot.horizontal().length_squared();
    if len_sq < Fixed::const_from_int(9) {
        Fixed::ZERO
    } else if len_sq < Fixed::const_from_int(25) {
        forced_miss / Fixed::const_from_int(2)
    } else if len_sq < Fixed::const_from_int(49) {
        forced_miss * Fixed::const_from_int(4) / Fixed::const_from_int(5)
    } else {
        forced_miss
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(n: i32) -> Fixed {
        Fixed::from_num(n)
    }

    fn epsilon() -> Fixed {
        Fixed::ONE / fixed(1000)
    }

    fn assert_near(a: Vec3Fixed, b: Vec3Fixed) {
        assert!(
            a.distance_squared(b) < epsilon(),
            "expected {b:?}, got {a:?}"
        );
    }

    #[test]
    fn test_two_crossings_through_circle() {
        let points = intersection_points(
            Vec3Fixed::ground(0, 0),
            Vec3Fixed::ground(10, 0),
            Vec3Fixed::ground(5, 0),
            fixed(2),
            false,
            false,
        );

        assert_eq!(points.len(), 2);
        assert_near(points[0], Vec3Fixed::ground(3, 0));
        assert_near(points[1], Vec3Fixed::ground(7, 0));
    }

    #[test]
    fn test_closest_crossing_is_entry() {
        let point = closest_intersection(
            Vec3Fixed::ground(0, 0),
            Vec3Fixed::ground(10, 0),
            Vec3Fixed::ground(5, 0),
            fixed(2),
            false,
            false,
        )
        .unwrap();
        assert_near(point, Vec3Fixed::ground(3, 0));
    }

    #[test]
    fn test_far_circle_misses() {
        let points = intersection_points(
            Vec3Fixed::ground(0, 0),
            Vec3Fixed::ground(10, 0),
            Vec3Fixed::ground(20, 0),
            fixed(2),
            false,
            false,
        );
        assert!(points.is_empty());
    }

    #[test]
    fn test_zero_length_segment_is_empty() {
        let p = Vec3Fixed::ground(5, 0);
        assert!(intersection_points(p, p, p, fixed(3), true, false).is_empty());
    }

    #[test]
    fn test_catch_outbound_extends_exit() {
        // Starts inside, ends inside: the exit crossing lies beyond `to`.
        let from = Vec3Fixed::ground(5, 0);
        let to = Vec3Fixed::ground(6, 0);
        let center = Vec3Fixed::ground(5, 0);

        assert!(intersection_points(from, to, center, fixed(2), false, false).is_empty());

        let caught = intersection_points(from, to, center, fixed(2), true, false);
        assert_eq!(caught.len(), 1);
        assert_near(caught[0], Vec3Fixed::ground(7, 0));
    }

    #[test]
    fn test_spherical_respects_height() {
        let from = Vec3Fixed::new(fixed(0), fixed(5), fixed(0));
        let to = Vec3Fixed::new(fixed(10), fixed(5), fixed(0));
        let center = Vec3Fixed::ground(5, 0);

        // A cylinder ignores the shot flying 5 units up, a sphere does not.
        assert_eq!(
            intersection_points(from, to, center, fixed(2), false, false).len(),
            2
        );
        assert!(intersection_points(from, to, center, fixed(2), false, true).is_empty());
    }

    #[test]
    fn test_exact_position_entry() {
        let point = exact_position(
            Vec3Fixed::ground(0, 0),
            Vec3Fixed::ground(6, 0),
            Vec3Fixed::ground(10, 0),
            fixed(5),
        );
        assert_near(point, Vec3Fixed::ground(5, 0));
    }

    #[test]
    fn test_exact_position_falls_back_to_current() {
        let cur = Vec3Fixed::ground(10, 0);
        let point = exact_position(Vec3Fixed::ground(0, 0), cur, Vec3Fixed::ground(5, 20), fixed(2));
        assert_eq!(point, cur);
    }

    #[test]
    fn test_shot_line_cells_walk() {
        let line = ShotLine::between_cells(Cell::new(0, 0), Cell::new(4, 2));
        let cells: Vec<Cell> = line.cells().collect();

        assert_eq!(cells.first(), Some(&Cell::new(0, 0)));
        assert_eq!(cells.last(), Some(&Cell::new(4, 2)));
        assert_eq!(cells.len(), 5);

        // Restartable
        assert_eq!(line.cells().collect::<Vec<_>>(), cells);
    }

    #[test]
    fn test_shot_line_single_cell() {
        let line = ShotLine::between_cells(Cell::new(3, 3), Cell::new(3, 3));
        assert_eq!(line.cells().collect::<Vec<_>>(), vec![Cell::new(3, 3)]);
    }

    #[test]
    fn test_radial_cells() {
        let cells: Vec<Cell> = RadialCells::new(Cell::new(0, 0), fixed(1)).collect();
        assert_eq!(cells.len(), 5);
        assert!(cells.contains(&Cell::new(0, 0)));
        assert!(!cells.contains(&Cell::new(1, 1)));

        let wider = RadialCells::new(Cell::new(10, 10), Fixed::from_num(1.5)).count();
        assert_eq!(wider, 9);

        assert_eq!(RadialCells::new(Cell::new(0, 0), fixed(-1)).count(), 1);
    }

    #[test]
    fn test_intercept_chance_factor_falloff() {
        let source = Cell::new(0, 0).center();
        assert_eq!(intercept_chance_factor(source, Cell::new(3, 0)), Fixed::ZERO);
        assert_eq!(intercept_chance_factor(source, Cell::new(20, 0)), Fixed::ONE);

        let mid = intercept_chance_factor(source, Cell::new(8, 0));
        assert!(mid > Fixed::ZERO && mid < Fixed::ONE);
    }

    #[test]
    fn test_adjusted_forced_miss() {
        let miss = fixed(10);
        assert_eq!(adjusted_forced_miss(miss, Vec3Fixed::ground(2, 0)), Fixed::ZERO);
        assert_eq!(adjusted_forced_miss(miss, Vec3Fixed::ground(4, 0)), fixed(5));
        assert_eq!(adjusted_forced_miss(miss, Vec3Fixed::ground(6, 0)), fixed(8));
        assert_eq!(adjusted_forced_miss(miss, Vec3Fixed::ground(30, 0)), miss);
    }
}
