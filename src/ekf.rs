use nalgebra as na;
use tracing::warn;

/// Dense extended Kalman filter. The motion model here is linear, so
/// prediction takes the transition matrix directly; updates are
/// nonlinear and take the expected measurement plus its Jacobian.
#[derive(Debug, Clone)]
pub struct Ekf {
    pub x: na::DVector<f64>,
    pub p: na::DMatrix<f64>,
}

impl Ekf {
    pub fn new(x0: na::DVector<f64>, p0_diag: &[f64]) -> Self {
        let p = na::DMatrix::from_diagonal(&na::DVector::from_row_slice(p0_diag));

        Self { x: x0, p }
    }

    pub fn predict(&mut self, f: &na::DMatrix<f64>, q: &na::DMatrix<f64>) {
        self.x = f * &self.x;
        self.p = f * &self.p * f.transpose() + q;
    }

    /// `hx` is the expected measurement at the current state, `h` its
    /// Jacobian. `residual` computes z - hx with any angle wrapping the
    /// measurement needs. Returns false when the innovation covariance
    /// is singular; the state is left untouched in that case.
    pub fn update<R>(
        &mut self,
        z: &na::DVector<f64>,
        hx: &na::DVector<f64>,
        h: &na::DMatrix<f64>,
        r: &na::DMatrix<f64>,
        residual: R,
    ) -> bool
    where
        R: FnOnce(&na::DVector<f64>, &na::DVector<f64>) -> na::DVector<f64>,
    {
        let s = h * &self.p * h.transpose() + r;

        let s_inv = match s.try_inverse() {
            Some(inv) => inv,
            None => {
                warn!("singular innovation covariance, skipping update");
                return false;
            }
        };

        let k = &self.p * h.transpose() * s_inv;
        let y = residual(z, hx);

        self.x += &k * y;

        let n = self.x.len();
        self.p = (na::DMatrix::identity(n, n) - k * h) * &self.p;

        true
    }
}
