use crate::{CoreError, CoreResult};

/// Floating point type used throughout the engine
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> CoreResult<Real> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

/// Reject values that are not strictly positive (or not finite).
pub fn ensure_positive(v: Real, what: &'static str) -> CoreResult<Real> {
    let v = ensure_finite(v, what)?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err(CoreError::InvalidArg { what })
    }
}

/// Reject values outside `[min, max]`. Either bound may be infinite.
pub fn ensure_in_range(v: Real, min: Real, max: Real, what: &'static str) -> CoreResult<Real> {
    let v = ensure_finite(v, what)?;
    if v < min || v > max {
        return Err(CoreError::OutOfRange {
            what,
            value: v,
            min,
            max,
        });
    }
    Ok(v)
}

/// Linear interpolation on a monotone table of `(x, y)` points.
///
/// Inputs outside the table clamp to the end values.
pub fn interp_clamped(table: &[(Real, Real)], x: Real) -> Real {
    match table {
        [] => 0.0,
        [(_, y)] => *y,
        _ => {
            let (x0, y0) = table[0];
            if x <= x0 {
                return y0;
            }
            for pair in table.windows(2) {
                let (xa, ya) = pair[0];
                let (xb, yb) = pair[1];
                if x <= xb {
                    let w = (x - xa) / (xb - xa);
                    return ya + w * (yb - ya);
                }
            }
            table[table.len() - 1].1
        }
    }
}

/// Exact discrete gain of a first-order lag over one step: `1 - exp(-dt/tau)`.
///
/// A non-positive `tau` means "no lag" and yields 1.
pub fn first_order_gain(dt: Real, tau: Real) -> Real {
    if tau <= 0.0 {
        1.0
    } else {
        1.0 - (-dt / tau).exp()
    }
}
