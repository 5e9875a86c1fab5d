/// Drops NaN and infinite entries, preserving the order of the rest.
pub fn to_finite_array(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| v.is_finite()).collect()
}
