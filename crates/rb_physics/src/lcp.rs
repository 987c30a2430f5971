//! The projected Gauss-Seidel solver used to resolve the box-
//! constrained linear complementarity problem `A x = b`, `lo <= x <=
//! hi` that the assembled constraint system reduces to each step
//! (§4.10). There is no `.cpp` source for this in the retrieved
//! original; the header only declares the entry point, so the
//! iteration below follows the specification text directly:
//! `x_i <- x_i + (b_i - sum_j A_ij x_j) / A_ii`, projected into
//! `[lo_i, hi_i]` after every row update.

use rb_math::{Fph, MatMN, VecN};

/// Runs `iterations` sweeps of projected Gauss-Seidel over `a*x = b`
/// starting from `x0`, clamping each component of `x` to `[lo, hi]`
/// after every row update. Rows with a (near-)zero diagonal are
/// skipped, leaving that component unchanged for the sweep.
pub fn solve(a: &MatMN, b: &VecN, lo: &VecN, hi: &VecN, x0: &VecN, iterations: usize) -> VecN {
    let n = b.len();
    let mut x = x0.clone();
    for _ in 0..iterations {
        for i in 0..n {
            let diagonal = a[(i, i)];
            if diagonal.abs() < 1e-12 {
                continue;
            }
            // Sum runs over every column including `i`, against the
            // in-progress `x`, matching the spec's literal update rule.
            let full_sum: Fph = (0..n).map(|j| a[(i, j)] * x[j]).sum();
            let updated = x[i] + (b[i] - full_sum) / diagonal;
            x[i] = updated.clamp(lo[i], hi[i]);
        }
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_a_diagonal_system_exactly() {
        let a = MatMN::from_diagonal(&VecN::from_vec(vec![2.0, 4.0]));
        let b = VecN::from_vec(vec![4.0, 8.0]);
        let lo = VecN::from_vec(vec![-100.0, -100.0]);
        let hi = VecN::from_vec(vec![100.0, 100.0]);
        let x0 = VecN::zeros(2);
        let x = solve(&a, &b, &lo, &hi, &x0, 5);
        approx::assert_abs_diff_eq!(x[0], 2.0, epsilon = 1e-9);
        approx::assert_abs_diff_eq!(x[1], 2.0, epsilon = 1e-9);
    }

    #[test]
    fn respects_box_bounds() {
        let a = MatMN::from_diagonal(&VecN::from_vec(vec![1.0]));
        let b = VecN::from_vec(vec![10.0]);
        let lo = VecN::from_vec(vec![0.0]);
        let hi = VecN::from_vec(vec![3.0]);
        let x0 = VecN::zeros(1);
        let x = solve(&a, &b, &lo, &hi, &x0, 10);
        assert_eq!(x[0], 3.0);
    }
}
