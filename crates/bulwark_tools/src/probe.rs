//! Segment against circle probe.

use bulwark_core::geometry::{closest_intersection, intercept_chance_factor, intersection_points};
use bulwark_core::math::{Cell, Fixed, Vec3Fixed};
use serde::Serialize;

use crate::Point;

/// One segment and one circle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeRequest {
    /// Segment start.
    pub from: Vec3Fixed,
    /// Segment end.
    pub to: Vec3Fixed,
    /// Circle center.
    pub center: Vec3Fixed,
    /// Circle radius.
    pub radius: Fixed,
    /// Accept the exit crossing beyond `to`.
    pub catch_outbound: bool,
    /// Solve in 3D.
    pub spherical: bool,
}

/// What the probe found.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeReport {
    /// Crossings in ascending parameter order.
    pub points: Vec<Point>,
    /// Crossing closest to the segment start.
    pub closest: Option<Point>,
    /// Intercept chance factor of the cell containing `to`, seen from `from`.
    pub intercept_chance: f64,
}

/// Run the probe.
#[must_use]
pub fn probe(request: &ProbeRequest) -> ProbeReport {
    let ProbeRequest {
        from,
        to,
        center,
        radius,
        catch_outbound,
        spherical,
    } = *request;

    let points = intersection_points(from, to, center, radius, catch_outbound, spherical);
    let closest = closest_intersection(from, to, center, radius, catch_outbound, spherical);
    ProbeReport {
        points: points.into_iter().map(Point::from).collect(),
        closest: closest.map(Point::from),
        intercept_chance: intercept_chance_factor(from, Cell::containing(to)).to_num(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(center_x: i32) -> ProbeRequest {
        ProbeRequest {
            from: Vec3Fixed::ZERO,
            to: Vec3Fixed::ground(10, 0),
            center: Vec3Fixed::ground(center_x, 0),
            radius: Fixed::from_num(2),
            catch_outbound: false,
            spherical: false,
        }
    }

    #[test]
    fn test_probe_two_crossings() {
        let report = probe(&request(5));
        assert_eq!(report.points.len(), 2);
        assert!((report.points[0].x - 3.0).abs() < 1e-6);
        assert!((report.points[1].x - 7.0).abs() < 1e-6);
        assert_eq!(report.closest, Some(report.points[0]));
    }

    #[test]
    fn test_probe_miss() {
        let report = probe(&request(20));
        assert!(report.points.is_empty());
        assert_eq!(report.closest, None);
    }
}
