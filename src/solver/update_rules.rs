use ndarray::{Array2, Zip};

/// Elementwise multiplicative update: base * numer / (denom + eps)
pub fn multiplicative_update(
    base: &Array2<f64>,
    numer: &Array2<f64>,
    denom: &Array2<f64>,
    eps: f64,
) -> Array2<f64> {
    let mut result = base.clone();
    Zip::from(&mut result)
        .and(numer)
        .and(denom)
        .for_each(|r, &n, &d| {
            *r *= n / (d + eps);
        });
    nan_to_num(&mut result);
    result
}

/// Elementwise sqrt multiplicative update: base * (numer / (denom + eps))^0.5
pub fn sqrt_multiplicative_update(
    base: &Array2<f64>,
    numer: &Array2<f64>,
    denom: &Array2<f64>,
    eps: f64,
) -> Array2<f64> {
    let mut result = base.clone();
    Zip::from(&mut result)
        .and(numer)
        .and(denom)
        .for_each(|r, &n, &d| {
            *r *= (n / (d + eps)).sqrt();
        });
    nan_to_num(&mut result);
    result
}

/// Replace NaN and Inf with 0.0 in-place
pub fn nan_to_num(a: &mut Array2<f64>) {
    a.mapv_inplace(|v| if v.is_finite() { v } else { 0.0 });
}

/// Split into (max(a, 0), max(-a, 0)) so that a = pos - neg
pub fn split_signs(a: &Array2<f64>) -> (Array2<f64>, Array2<f64>) {
    (a.mapv(|v| v.max(0.0)), a.mapv(|v| (-v).max(0.0)))
}

/// ||A - B||_F^2
pub fn squared_distance(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    let mut acc = 0.0;
    Zip::from(a).and(b).for_each(|&x, &y| {
        acc += (x - y) * (x - y);
    });
    acc
}

/// Symmetric factorization error ||M - F*F^T||_F^2
pub fn symmetric_error(m: &Array2<f64>, f: &Array2<f64>) -> f64 {
    squared_distance(m, &f.dot(&f.t()))
}
