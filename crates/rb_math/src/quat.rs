use crate::{Mat4, Quat};

/// The 4x4 left-multiplication matrix of a quaternion: for any
/// quaternion `p`, `quat_left_matrix(q) * p == q * p`.
///
/// Used by the angular constraints to turn quaternion products into
/// linear maps so their derivative can be folded into a Jacobian row.
pub fn quat_left_matrix(q: &Quat) -> Mat4 {
    let (w, x, y, z) = (q.w, q.i, q.j, q.k);
    #[rustfmt::skip]
    let m = Mat4::new(
        w, -x, -y, -z,
        x,  w, -z,  y,
        y,  z,  w, -x,
        z, -y,  x,  w,
    );
    m
}

/// The 4x4 right-multiplication matrix of a quaternion: for any
/// quaternion `p`, `quat_right_matrix(q) * p == p * q`.
pub fn quat_right_matrix(q: &Quat) -> Mat4 {
    let (w, x, y, z) = (q.w, q.i, q.j, q.k);
    #[rustfmt::skip]
    let m = Mat4::new(
        w, -x, -y, -z,
        x,  w,  z, -y,
        y, -z,  w,  x,
        z,  y, -x,  w,
    );
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{UnitQuat, Vec4};
    use approx::assert_abs_diff_eq;
    use nalgebra::Vector3;

    fn wxyz(q: &Quat) -> Vec4 {
        Vec4::new(q.w, q.i, q.j, q.k)
    }

    #[test]
    fn left_matrix_matches_quaternion_product() {
        let q = UnitQuat::from_axis_angle(&Vector3::y_axis(), 0.7).into_inner();
        let p = UnitQuat::from_axis_angle(&Vector3::x_axis(), 0.3).into_inner();
        let via_matrix = quat_left_matrix(&q) * wxyz(&p);
        let via_product = wxyz(&(q * p));
        assert_abs_diff_eq!(via_matrix, via_product, epsilon = 1e-9);
    }

    #[test]
    fn right_matrix_matches_quaternion_product() {
        let q = UnitQuat::from_axis_angle(&Vector3::y_axis(), 0.7).into_inner();
        let p = UnitQuat::from_axis_angle(&Vector3::x_axis(), 0.3).into_inner();
        let via_matrix = quat_right_matrix(&q) * wxyz(&p);
        let via_product = wxyz(&(p * q));
        assert_abs_diff_eq!(via_matrix, via_product, epsilon = 1e-9);
    }
}
