use crate::{MatN, Real, VecN};

/// Tolerance on pivots treated as zero by [`psd_factor`], relative to the largest
/// diagonal entry.
pub const PSD_PIVOT_TOL: Real = 1e-12;
/// Tolerance on the residual coupling of a column whose pivot vanished, relative to
/// `sqrt(p_ii p_jj)`.
pub const PSD_RESIDUAL_TOL: Real = 1e-6;
/// Relative tolerance on `‖P - Pᵀ‖∞` accepted as symmetric.
pub const SYMMETRY_TOL: Real = 1e-9;

/// `½ (P + Pᵀ)`.
pub fn symmetrize<const N: usize>(p: &MatN<N, N>) -> MatN<N, N> {
    (p + p.transpose()) * 0.5
}

/// Largest absolute entry of `P - Pᵀ`.
pub fn asymmetry<const N: usize>(p: &MatN<N, N>) -> Real {
    (p - p.transpose()).abs().max()
}

pub fn all_finite<const R: usize, const C: usize>(m: &MatN<R, C>) -> bool {
    m.iter().all(|v| v.is_finite())
}

fn scale_of<const N: usize>(p: &MatN<N, N>) -> Real {
    (0..N).map(|i| p[(i, i)].abs()).fold(0.0, Real::max)
}

/// Lower-triangular `L` with `L Lᵀ = P` for a symmetric positive semi-definite `P`.
///
/// Unlike a plain Cholesky decomposition this accepts singular matrices. A pivot
/// below `PSD_PIVOT_TOL` times the largest diagonal entry zeroes its column, provided
/// every remaining coupling `r_ij` in that column is negligible: either below
/// `PSD_RESIDUAL_TOL * sqrt(p_ii p_jj)` or small enough that `r_ij²` does not exceed
/// the pivot tolerance times the remaining diagonal `d_i`. Anything larger would hide
/// a negative eigenvalue of order `-r_ij² / d_i`. Returns `None` for non-finite,
/// asymmetric or indefinite input.
pub fn psd_factor<const N: usize>(p: &MatN<N, N>) -> Option<MatN<N, N>> {
    if !all_finite(p) {
        return None;
    }
    let scale = scale_of(p);
    if scale == 0.0 {
        return p.iter().all(|v| *v == 0.0).then(MatN::<N, N>::zeros);
    }
    if asymmetry(p) > SYMMETRY_TOL * scale {
        return None;
    }
    let pivot_tol = PSD_PIVOT_TOL * scale;

    let mut l = MatN::<N, N>::zeros();
    for j in 0..N {
        let mut d = p[(j, j)];
        for k in 0..j {
            d -= l[(j, k)] * l[(j, k)];
        }
        if d < -pivot_tol {
            return None;
        }
        if d <= pivot_tol {
            let pjj = p[(j, j)].max(0.0);
            for i in (j + 1)..N {
                let mut r = p[(i, j)];
                let mut di = p[(i, i)];
                for k in 0..j {
                    r -= l[(i, k)] * l[(j, k)];
                    di -= l[(i, k)] * l[(i, k)];
                }
                let relative = PSD_RESIDUAL_TOL * (p[(i, i)].max(0.0) * pjj).sqrt();
                if r.abs() > relative && r * r > pivot_tol * di.max(0.0) {
                    return None;
                }
            }
            continue;
        }
        let djj = d.sqrt();
        l[(j, j)] = djj;
        for i in (j + 1)..N {
            let mut r = p[(i, j)];
            for k in 0..j {
                r -= l[(i, k)] * l[(j, k)];
            }
            l[(i, j)] = r / djj;
        }
    }
    Some(l)
}

/// Whether `P` is a finite, symmetric, positive semi-definite matrix.
pub fn is_psd<const N: usize>(p: &MatN<N, N>) -> bool {
    psd_factor(p).is_some()
}

/// Rotate `row` into the upper-triangular factor `r` so that the new factor
/// satisfies `R'ᵀR' = RᵀR + rowᵀrow`. `row` is consumed (zeroed) in the process.
pub fn givens_fold_row<const N: usize>(r: &mut MatN<N, N>, row: &mut VecN<N>) {
    for k in 0..N {
        let b = row[k];
        if b == 0.0 {
            continue;
        }
        let a = r[(k, k)];
        let h = a.hypot(b);
        let c = a / h;
        let s = b / h;
        r[(k, k)] = h;
        row[k] = 0.0;
        for j in (k + 1)..N {
            let rkj = r[(k, j)];
            let bj = row[j];
            r[(k, j)] = c * rkj + s * bj;
            row[j] = -s * rkj + c * bj;
        }
    }
}

/// Upper-triangular factor of `Σ rowsᵢᵀ rowsᵢ`, i.e. the `R` of a QR decomposition of
/// the stacked rows.
pub fn triangularize_rows<const N: usize, const K: usize>(rows: &MatN<K, N>) -> MatN<N, N> {
    let mut r = MatN::<N, N>::zeros();
    for i in 0..K {
        let mut row: VecN<N> = rows.row(i).transpose();
        givens_fold_row(&mut r, &mut row);
    }
    r
}

/// Upper-triangular factor of a two-block-column array, kept as its blocks.
///
/// Represents the `(M + N) x (M + N)` upper-triangular matrix `[X Y; 0 Z]` with `X`
/// (`M x M`) and `Z` (`N x N`) upper triangular. Square-root filters fold the rows of
/// their pre-array into it and read the posterior factors off the blocks.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockTriangular<const M: usize, const N: usize> {
    pub x: MatN<M, M>,
    pub y: MatN<M, N>,
    pub z: MatN<N, N>,
}

impl<const M: usize, const N: usize> BlockTriangular<M, N> {
    pub fn zeros() -> Self {
        Self {
            x: MatN::zeros(),
            y: MatN::zeros(),
            z: MatN::zeros(),
        }
    }

    /// Fold the row `[a b]` into the factor.
    pub fn fold_row(&mut self, a: &mut VecN<M>, b: &mut VecN<N>) {
        for k in 0..M {
            let bk = a[k];
            if bk == 0.0 {
                continue;
            }
            let ak = self.x[(k, k)];
            let h = ak.hypot(bk);
            let c = ak / h;
            let s = bk / h;
            self.x[(k, k)] = h;
            a[k] = 0.0;
            for j in (k + 1)..M {
                let xkj = self.x[(k, j)];
                let aj = a[j];
                self.x[(k, j)] = c * xkj + s * aj;
                a[j] = -s * xkj + c * aj;
            }
            for j in 0..N {
                let ykj = self.y[(k, j)];
                let bj = b[j];
                self.y[(k, j)] = c * ykj + s * bj;
                b[j] = -s * ykj + c * bj;
            }
        }
        givens_fold_row(&mut self.z, b);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_mat_close<const R: usize, const C: usize>(
        a: &MatN<R, C>,
        b: &MatN<R, C>,
        tol: Real,
    ) {
        let diff = (a - b).abs().max();
        assert!(diff <= tol, "max abs diff {diff:e} > {tol:e}\n{a}\n{b}");
    }

    fn spd3() -> MatN<3, 3> {
        MatN::<3, 3>::new(4.0, 1.0, 0.5, 1.0, 3.0, -0.2, 0.5, -0.2, 2.0)
    }

    #[test]
    fn psd_factor_matches_cholesky_on_definite_input() {
        let p = spd3();
        let l = psd_factor(&p).expect("definite");
        assert_mat_close(&(l * l.transpose()), &p, 1e-12);
        let chol = p.cholesky().expect("cholesky").l();
        assert_mat_close(&l, &chol, 1e-12);
    }

    #[test]
    fn psd_factor_accepts_singular_input() {
        let mut p = MatN::<4, 4>::zeros();
        p[(0, 0)] = 0.1;
        p[(1, 1)] = 0.1;
        p[(0, 1)] = 0.05;
        p[(1, 0)] = 0.05;
        let l = psd_factor(&p).expect("psd");
        assert_mat_close(&(l * l.transpose()), &p, 1e-14);
        assert_eq!(l[(2, 2)], 0.0);
        assert_eq!(l[(3, 3)], 0.0);
    }

    #[test]
    fn psd_factor_rejects_indefinite_and_asymmetric() {
        let indefinite = MatN::<2, 2>::new(1.0, 2.0, 2.0, 1.0);
        assert!(psd_factor(&indefinite).is_none());
        let negative = MatN::<2, 2>::new(1e-4, 0.0, 0.0, -1e-4);
        assert!(psd_factor(&negative).is_none());
        let asymmetric = MatN::<2, 2>::new(1.0, 0.5, 0.0, 1.0);
        assert!(psd_factor(&asymmetric).is_none());
        let nan = MatN::<2, 2>::new(Real::NAN, 0.0, 0.0, 1.0);
        assert!(psd_factor(&nan).is_none());
        // zero pivot with a non-zero coupling
        let coupled = MatN::<2, 2>::new(0.0, 0.1, 0.1, 1.0);
        assert!(psd_factor(&coupled).is_none());
    }

    #[test]
    fn psd_factor_tolerances_follow_matrix_scale() {
        // eigenvalues 1.00002e-4 and -2.5e-9
        let hidden_negative = MatN::<2, 2>::new(0.0, 5e-7, 5e-7, 1e-4);
        assert!(psd_factor(&hidden_negative).is_none());
        let small_indefinite = MatN::<2, 2>::new(1e-6, 0.0, 0.0, -1e-12);
        assert!(psd_factor(&small_indefinite).is_none());

        assert_eq!(psd_factor(&MatN::<3, 3>::zeros()), Some(MatN::<3, 3>::zeros()));
        let mut lone = MatN::<2, 2>::zeros();
        lone[(0, 1)] = 1e-20;
        lone[(1, 0)] = 1e-20;
        assert!(psd_factor(&lone).is_none());
    }

    #[test]
    fn psd_factor_keeps_tiny_rank_one_blocks() {
        // slip-sized rank-one block next to a larger independent diagonal
        let v = VecN::<3>::new(2.8e-4, 1.0, 0.0) * (6.4e-9 as Real).sqrt();
        let mut p = MatN::<4, 4>::zeros();
        p.fixed_view_mut::<3, 3>(0, 0).copy_from(&(v * v.transpose()));
        p[(3, 3)] = 1e-7;
        let l = psd_factor(&p).expect("rank-one block is semi-definite");
        let back = l * l.transpose();
        let rel = (back - p).abs().max() / p.abs().max();
        assert!(rel < 1e-12, "relative reconstruction error {rel:e}");
        assert!(l[(0, 0)] > 0.0, "leading pivot dropped");

        let dependent = MatN::<3, 3>::from_element(1.0);
        let l = psd_factor(&dependent).expect("rank-one ones matrix");
        assert_mat_close(&(l * l.transpose()), &dependent, 1e-14);
    }

    #[test]
    fn folding_rows_reproduces_gram_matrix() {
        let rows = MatN::<5, 3>::from_row_slice(&[
            1.0, 2.0, 0.0, //
            -1.0, 0.5, 3.0, //
            0.0, 0.0, 1.0, //
            2.0, -1.0, 0.5, //
            0.3, 0.3, 0.3,
        ]);
        let r = triangularize_rows(&rows);
        for i in 0..3 {
            for j in 0..i {
                assert_eq!(r[(i, j)], 0.0);
            }
            assert!(r[(i, i)] >= 0.0);
        }
        assert_mat_close(&(r.transpose() * r), &(rows.transpose() * rows), 1e-12);
    }

    #[test]
    fn block_fold_matches_dense_fold() {
        let rows = MatN::<4, 5>::from_row_slice(&[
            1.0, 0.2, 0.0, 2.0, -1.0, //
            0.0, 1.5, 0.3, -0.4, 0.2, //
            0.7, -0.1, 1.0, 0.0, 0.9, //
            0.0, 0.0, 0.2, 0.4, 1.1,
        ]);
        let mut blocks = BlockTriangular::<2, 3>::zeros();
        for i in 0..4 {
            let mut a = VecN::<2>::new(rows[(i, 0)], rows[(i, 1)]);
            let mut b = VecN::<3>::new(rows[(i, 2)], rows[(i, 3)], rows[(i, 4)]);
            blocks.fold_row(&mut a, &mut b);
        }
        let dense = triangularize_rows(&rows);
        assert_mat_close(&blocks.x, &dense.fixed_view::<2, 2>(0, 0).into_owned(), 1e-12);
        assert_mat_close(&blocks.y, &dense.fixed_view::<2, 3>(0, 2).into_owned(), 1e-12);
        assert_mat_close(&blocks.z, &dense.fixed_view::<3, 3>(2, 2).into_owned(), 1e-12);
    }

    #[test]
    fn symmetrize_removes_skew_part() {
        let p = MatN::<2, 2>::new(1.0, 0.3, 0.1, 2.0);
        let s = symmetrize(&p);
        assert_eq!(asymmetry(&s), 0.0);
        assert_eq!(s[(0, 1)], 0.2);
    }
}
