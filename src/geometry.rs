use nalgebra as na;
use num_traits::{Float, FloatConst};

/// Oriented bounding box: `angle` is the direction of the `width` axis,
/// measured from the image x axis.
#[derive(Debug, Clone, Copy)]
pub struct RotatedRect {
    pub center: na::Point2<f32>,
    pub width: f32,
    pub height: f32,
    pub angle: f32,
}

impl RotatedRect {
    pub fn new(center: na::Point2<f32>, width: f32, height: f32, angle: f32) -> Self {
        assert!(
            width >= 0.0 && height >= 0.0,
            "negative rect dimension: {}x{}",
            width,
            height
        );

        Self {
            center,
            width,
            height,
            angle,
        }
    }
}

/// Wraps an angle into (-pi, pi].
pub fn wrap_rad<F: Float + FloatConst>(mut a: F) -> F {
    let two_pi = F::PI() + F::PI();

    while a > F::PI() {
        a = a - two_pi;
    }
    while a <= -F::PI() {
        a = a + two_pi;
    }

    a
}

/// Andrew monotone chain, without the repeated first point.
pub fn convex_hull(points: &[na::Point2<f32>]) -> Vec<na::Point2<f32>> {
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| (a.x, a.y).partial_cmp(&(b.x, b.y)).unwrap());
    pts.dedup();

    if pts.len() < 3 {
        return pts;
    }

    let cross = |o: &na::Point2<f32>, a: &na::Point2<f32>, b: &na::Point2<f32>| {
        (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
    };

    let mut lower: Vec<na::Point2<f32>> = Vec::with_capacity(pts.len());
    for p in &pts {
        while lower.len() >= 2 && cross(&lower[lower.len() - 2], &lower[lower.len() - 1], p) <= 0.0
        {
            lower.pop();
        }
        lower.push(*p);
    }

    let mut upper: Vec<na::Point2<f32>> = Vec::with_capacity(pts.len());
    for p in pts.iter().rev() {
        while upper.len() >= 2 && cross(&upper[upper.len() - 2], &upper[upper.len() - 1], p) <= 0.0
        {
            upper.pop();
        }
        upper.push(*p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Minimum-area oriented bounding box of a point set, via rotating
/// calipers over the convex hull edges.
pub fn min_area_rect(points: &[na::Point2<f32>]) -> Option<RotatedRect> {
    let hull = convex_hull(points);

    if hull.is_empty() {
        return None;
    }

    if hull.len() == 1 {
        return Some(RotatedRect::new(hull[0], 0.0, 0.0, 0.0));
    }

    let mut best: Option<(f32, RotatedRect)> = None;

    for i in 0..hull.len() {
        let a = hull[i];
        let b = hull[(i + 1) % hull.len()];

        let edge = b - a;
        let len = edge.norm();
        if len <= f32::EPSILON {
            continue;
        }

        let u = edge / len;
        let v = na::Vector2::new(-u.y, u.x);

        let mut min_u = f32::INFINITY;
        let mut max_u = f32::NEG_INFINITY;
        let mut min_v = f32::INFINITY;
        let mut max_v = f32::NEG_INFINITY;

        for p in &hull {
            let du = u.dot(&p.coords);
            let dv = v.dot(&p.coords);

            min_u = min_u.min(du);
            max_u = max_u.max(du);
            min_v = min_v.min(dv);
            max_v = max_v.max(dv);
        }

        let w = max_u - min_u;
        let h = max_v - min_v;
        let area = w * h;

        if best.as_ref().map_or(true, |(best_area, _)| area < *best_area) {
            let center = u * (min_u + max_u) * 0.5 + v * (min_v + max_v) * 0.5;
            let rect = RotatedRect::new(center.into(), w, h, u.y.atan2(u.x));
            best = Some((area, rect));
        }
    }

    best.map(|(_, rect)| rect)
}
