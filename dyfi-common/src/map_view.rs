//! Map zoom heuristic
//!
//! Picks a map zoom level and centre for a set of event coordinates. The zoom
//! is a piecewise-linear function of the bounding-box area (square degrees):
//! tiny areas zoom in to 20, anything of one square degree or more stays at 5.

/// Area knots (square degrees), increasing
const AREA_KNOTS: [f64; 7] = [
    0.0,
    1.024e-7,                   // 5^-10
    9.536_743_164_062_5e-7,     // 4^-10
    1.693_508_780_843_028_5e-5, // 3^-10
    9.765_625e-4,               // 2^-10
    1.0,
    1.0,
];

/// Zoom level at each knot
const ZOOM_LEVELS: [f64; 7] = [20.0, 15.0, 14.0, 13.0, 12.0, 7.0, 5.0];

/// Zoom level and (longitude, latitude) centre for a set of points
///
/// Mismatched or empty inputs give zoom 0 centred on the origin.
pub fn determine_zoom_level(longitudes: &[f64], latitudes: &[f64]) -> (f64, (f64, f64)) {
    if longitudes.is_empty() || longitudes.len() != latitudes.len() {
        return (0.0, (0.0, 0.0));
    }

    let (min_lon, max_lon) = min_max(longitudes);
    let (min_lat, max_lat) = min_max(latitudes);
    let area = (max_lat - min_lat) * (max_lon - min_lon);
    let center = (mean(longitudes), mean(latitudes));

    let zoom = interpolate(area, &AREA_KNOTS, &ZOOM_LEVELS);
    tracing::debug!(area, zoom, ?center, "Computed map zoom level");
    (zoom, center)
}

/// One-dimensional linear interpolation, clamped at both ends
fn interpolate(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    let last = xp.len() - 1;
    if x <= xp[0] {
        return fp[0];
    }
    if x >= xp[last] {
        return fp[last];
    }
    for i in 0..last {
        let (x0, x1) = (xp[i], xp[i + 1]);
        if x >= x0 && x < x1 {
            let t = (x - x0) / (x1 - x0);
            return fp[i] + t * (fp[i + 1] - fp[i]);
        }
    }
    fp[last]
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_mismatched_inputs_default() {
        assert_eq!(determine_zoom_level(&[1.0], &[]), (0.0, (0.0, 0.0)));
        assert_eq!(determine_zoom_level(&[], &[]), (0.0, (0.0, 0.0)));
    }

    #[test]
    fn test_single_point_zooms_fully_in() {
        let (zoom, center) = determine_zoom_level(&[-80.7], &[34.2]);
        assert_eq!(zoom, 20.0);
        assert_eq!(center, (-80.7, 34.2));
    }

    #[test]
    fn test_large_area_clamps_to_five() {
        let (zoom, center) = determine_zoom_level(&[-83.0, -78.0], &[32.0, 35.0]);
        assert_eq!(zoom, 5.0);
        assert!(approx(center.0, -80.5));
        assert!(approx(center.1, 33.5));
    }

    #[test]
    fn test_interpolates_between_knots() {
        // area 0.5 sits halfway between 2^-10 and 1.0 on a linear scale
        let x = 0.5;
        let expected = 12.0 + (x - 9.765_625e-4) / (1.0 - 9.765_625e-4) * (7.0 - 12.0);
        let (zoom, _) = determine_zoom_level(&[0.0, 1.0], &[0.0, 0.5]);
        assert!(approx(zoom, expected));
    }

    #[test]
    fn test_knot_values_are_exact() {
        assert!(approx(interpolate(9.765_625e-4, &AREA_KNOTS, &ZOOM_LEVELS), 12.0));
        assert!(approx(interpolate(1.024e-7, &AREA_KNOTS, &ZOOM_LEVELS), 15.0));
    }
}
