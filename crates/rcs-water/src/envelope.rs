//! Operating envelope and input clamping.

/// Lowest tabulated temperature [°F].
pub const T_MIN_F: f64 = 50.0;
/// Highest tabulated temperature [°F].
pub const T_MAX_F: f64 = 700.0;
/// Lowest pressure accepted by lookups [psia].
pub const P_MIN_PSIA: f64 = 1.0;
/// Highest pressure accepted by lookups [psia].
pub const P_MAX_PSIA: f64 = 2700.0;

/// Clamp a temperature into the envelope. NaN maps to the lower bound.
#[inline]
pub fn clamp_temperature(t_f: f64) -> f64 {
    if t_f.is_nan() {
        return T_MIN_F;
    }
    t_f.clamp(T_MIN_F, T_MAX_F)
}

/// Clamp a pressure into the envelope. NaN maps to the lower bound.
#[inline]
pub fn clamp_pressure(p_psia: f64) -> f64 {
    if p_psia.is_nan() {
        return P_MIN_PSIA;
    }
    p_psia.clamp(P_MIN_PSIA, P_MAX_PSIA)
}
