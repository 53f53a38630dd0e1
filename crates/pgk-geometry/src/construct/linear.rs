//! Linear solvers for collocation systems.

use nalgebra::DMatrix;
use pgk_core::{KernelError, Result};
use pgk_math::Vector3;

/// Pivots below this are treated as a singular system.
const PIVOT_EPSILON: f64 = 1e-14;

/// Square matrix stored by diagonals, with `lower` sub- and `upper`
/// super-diagonals.
#[derive(Debug, Clone)]
pub(crate) struct BandedMatrix {
    n: usize,
    lower: usize,
    upper: usize,
    data: Vec<f64>,
}

impl BandedMatrix {
    pub fn zeros(n: usize, lower: usize, upper: usize) -> Self {
        Self {
            n,
            lower,
            upper,
            data: vec![0.0; n * (lower + upper + 1)],
        }
    }

    fn index(&self, i: usize, j: usize) -> Option<usize> {
        if j + self.lower < i || j > i + self.upper || i >= self.n || j >= self.n {
            return None;
        }
        Some(i * (self.lower + self.upper + 1) + (j + self.lower - i))
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.index(i, j).map_or(0.0, |k| self.data[k])
    }

    /// Set an entry inside the band. Entries outside the band must be zero.
    pub fn set(&mut self, i: usize, j: usize, value: f64) -> Result<()> {
        match self.index(i, j) {
            Some(k) => {
                self.data[k] = value;
                Ok(())
            }
            None if value == 0.0 => Ok(()),
            None => Err(KernelError::InvalidInput(format!(
                "entry ({i}, {j}) lies outside the band"
            ))),
        }
    }

    /// Solve `A x = rhs` in place by LU factorization without pivoting.
    ///
    /// Sound for B-spline collocation matrices, which are totally positive.
    pub fn solve(mut self, rhs: &mut [Vector3]) -> Result<()> {
        let n = self.n;
        if rhs.len() != n {
            return Err(KernelError::InvalidInput(format!(
                "right-hand side has {} rows, matrix has {n}",
                rhs.len()
            )));
        }
        for k in 0..n {
            let pivot = self.get(k, k);
            if pivot.abs() < PIVOT_EPSILON {
                return Err(KernelError::Geometry(format!("singular collocation matrix at row {k}")));
            }
            let row_end = (k + self.lower).min(n - 1);
            let col_end = (k + self.upper).min(n - 1);
            for i in k + 1..=row_end {
                let factor = self.get(i, k) / pivot;
                if factor == 0.0 {
                    continue;
                }
                self.set(i, k, factor)?;
                for j in k + 1..=col_end {
                    let value = self.get(i, j) - factor * self.get(k, j);
                    self.set(i, j, value)?;
                }
            }
        }
        for i in 0..n {
            let start = i.saturating_sub(self.lower);
            let mut sum = rhs[i];
            for (j, &x) in rhs.iter().enumerate().take(i).skip(start) {
                sum -= self.get(i, j) * x;
            }
            rhs[i] = sum;
        }
        for i in (0..n).rev() {
            let end = (i + self.upper).min(n - 1);
            let mut sum = rhs[i];
            for j in i + 1..=end {
                sum -= self.get(i, j) * rhs[j];
            }
            rhs[i] = sum / self.get(i, i);
        }
        Ok(())
    }
}

/// Solve `A X = B` for a 3-column right-hand side with nalgebra's LU.
pub(crate) fn solve_dense(matrix: DMatrix<f64>, rhs: &[Vector3]) -> Result<Vec<Vector3>> {
    let n = matrix.nrows();
    if matrix.ncols() != n || rhs.len() != n {
        return Err(KernelError::InvalidInput(format!(
            "{}x{} system with {} right-hand rows",
            n,
            matrix.ncols(),
            rhs.len()
        )));
    }
    let b = DMatrix::from_fn(n, 3, |i, j| rhs[i][j]);
    let x = matrix
        .lu()
        .solve(&b)
        .ok_or_else(|| KernelError::Geometry("singular linear system".into()))?;
    Ok((0..n).map(|i| Vector3::new(x[(i, 0)], x[(i, 1)], x[(i, 2)])).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banded_solve_tridiagonal() {
        // [2 1 0; 1 3 1; 0 1 2] x = b with x = (1, 2, 3)
        let mut m = BandedMatrix::zeros(3, 1, 1);
        let rows = [[2.0, 1.0, 0.0], [1.0, 3.0, 1.0], [0.0, 1.0, 2.0]];
        for (i, row) in rows.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                m.set(i, j, v).unwrap();
            }
        }
        let mut rhs = vec![
            Vector3::splat(4.0),
            Vector3::splat(10.0),
            Vector3::splat(8.0),
        ];
        m.solve(&mut rhs).unwrap();
        for (x, expected) in rhs.iter().zip([1.0, 2.0, 3.0]) {
            assert!((*x - Vector3::splat(expected)).length() < 1e-12);
        }
    }

    #[test]
    fn test_banded_rejects_out_of_band() {
        let mut m = BandedMatrix::zeros(4, 1, 1);
        assert!(m.set(0, 3, 1.0).is_err());
        assert!(m.set(0, 3, 0.0).is_ok());
        assert_eq!(m.get(3, 0), 0.0);
    }

    #[test]
    fn test_singular_is_error() {
        let m = BandedMatrix::zeros(2, 1, 1);
        let mut rhs = vec![Vector3::ONE; 2];
        assert!(matches!(m.solve(&mut rhs), Err(KernelError::Geometry(_))));
        let dense = DMatrix::<f64>::zeros(2, 2);
        assert!(solve_dense(dense, &rhs).is_err());
    }

    #[test]
    fn test_dense_solve() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let rhs = [Vector3::new(5.0, 0.0, 1.0), Vector3::new(11.0, 0.0, 3.0)];
        let x = solve_dense(m, &rhs).unwrap();
        assert!((x[0] - Vector3::new(1.0, 0.0, 1.0)).length() < 1e-12);
        assert!((x[1] - Vector3::new(2.0, 0.0, 0.0)).length() < 1e-12);
    }
}
