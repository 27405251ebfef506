//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Convert an angle in degrees into radians.
pub fn deg_to_rad<T>(value: T) -> T
where
    T: Float,
{
    value.to_radians()
}

/// Convert an angle in radians into degrees.
pub fn rad_to_deg<T>(value: T) -> T
where
    T: Float,
{
    value.to_degrees()
}

/// Convert every element of a slice from degrees into radians.
pub fn deg_to_rad_vec<T>(values: &[T]) -> Vec<T>
where
    T: Float,
{
    values.iter().map(|v| v.to_radians()).collect()
}

/// Apply polynomial coefficients to a value.
///
/// Coefficients are ordered from the highest power down to the constant term.
pub fn poly_val<T>(value: T, coeffs: &[T]) -> T
where
    T: Float,
{
    // Horner's method
    coeffs.iter().fold(T::zero(), |acc, c| acc * value + *c)
}

/// Get the coefficients of the derivative of a polynomial.
///
/// Uses the same ordering as [`poly_val`].
pub fn poly_der<T>(coeffs: &[T]) -> Vec<T>
where
    T: Float,
{
    let order = coeffs.len().saturating_sub(1);

    coeffs
        .iter()
        .take(order)
        .enumerate()
        .map(|(i, c)| *c * T::from(order - i).unwrap_or_else(T::zero))
        .collect()
}

/// Limit a value to the range `[min, max]`.
///
/// NaN values are passed through unchanged.
pub fn clamp<T>(value: T, min: T, max: T) -> T
where
    T: Float,
{
    let mut ret = value;

    if ret > max {
        ret = max
    }
    if ret < min {
        ret = min
    }

    ret
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_deg_rad() {
        assert!((deg_to_rad(180f64) - std::f64::consts::PI).abs() < 1e-12);
        assert!((rad_to_deg(std::f64::consts::FRAC_PI_2) - 90f64).abs() < 1e-12);
        assert_eq!(
            deg_to_rad_vec(&[-15f64, 0.0]),
            vec![-15f64.to_radians(), 0.0]
        );
    }

    #[test]
    fn test_poly_val() {
        // 2x^2 + 3x + 4
        let coeffs = [2f64, 3.0, 4.0];
        assert_eq!(poly_val(0.0, &coeffs), 4.0);
        assert_eq!(poly_val(2.0, &coeffs), 18.0);
        assert_eq!(poly_val(0.0, &[] as &[f64]), 0.0);
    }

    #[test]
    fn test_poly_der() {
        // d/dx (2x^2 + 3x + 4) = 4x + 3
        assert_eq!(poly_der(&[2f64, 3.0, 4.0]), vec![4.0, 3.0]);
        assert_eq!(poly_der(&[5f64]), Vec::<f64>::new());
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(1.5f64, -1.0, 1.0), 1.0);
        assert_eq!(clamp(-1.5f64, -1.0, 1.0), -1.0);
        assert_eq!(clamp(0.25f64, -1.0, 1.0), 0.25);

        // Clamping is idempotent
        let mut x = -3.0f64;
        while x <= 3.0 {
            let once = clamp(x, -1.0, 1.0);
            assert_eq!(clamp(once, -1.0, 1.0), once);
            x += 0.125;
        }
    }
}
