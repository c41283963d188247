/// Generate a logistic-map chaotic sequence
///
/// Seeds the recurrence `x_{n+1} = r * x_n * (1 - x_n)` with `x0` and
/// returns the first `length` values, `seq[0] == x0`. The sequence is
/// purely deterministic: identical `(length, x0, r)` always produce an
/// identical sequence, which is what makes the scrambling permutation
/// reproducible at embedding time.
///
/// `x0` outside (0, 1) is not rejected; the trajectory may collapse to a
/// fixed point or diverge, which only degrades scrambling quality.
pub fn logistic_sequence(length: usize, x0: f64, r: f64) -> Vec<f64> {
    let mut seq = Vec::with_capacity(length);
    if length == 0 {
        return seq;
    }
    let mut x = x0;
    seq.push(x);
    for _ in 1..length {
        x = r * x * (1.0 - x);
        seq.push(x);
    }
    seq
}
