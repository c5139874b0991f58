//! Math utilities and types
//!
//! Right-handed world space. Projection targets Vulkan clip space
//! (Y down, depth in [0, 1]).

pub use nalgebra::{Vector3, Vector4, Matrix4};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Matrix constructors used by the camera and model transforms
pub trait Mat4Ext {
    /// Rotation matrix around the Z axis
    fn rotation_z(angle: f32) -> Mat4;

    /// Perspective projection from view space (camera looking down -Z) to Vulkan clip space
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Right-handed look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;

    /// Flips Y and Z so view space lines up with Vulkan's Y-down, Z-forward clip space
    fn vulkan_coordinate_transform() -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn rotation_z(angle: f32) -> Mat4 {
        Mat4::from_axis_angle(&Vec3::z_axis(), angle)
    }

    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        let tan_half_fovy = (fov_y * 0.5).tan();

        let mut projection = Mat4::zeros();
        projection[(0, 0)] = 1.0 / (aspect * tan_half_fovy);
        projection[(1, 1)] = 1.0 / tan_half_fovy;
        projection[(2, 2)] = far / (far - near);
        projection[(2, 3)] = -(near * far) / (far - near);
        projection[(3, 2)] = 1.0;

        projection * Self::vulkan_coordinate_transform()
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        let forward = (target - eye).normalize();
        let right = forward.cross(&up).normalize();
        let camera_up = right.cross(&forward);

        let translation = Mat4::new(
            1.0, 0.0, 0.0, -eye.x,
            0.0, 1.0, 0.0, -eye.y,
            0.0, 0.0, 1.0, -eye.z,
            0.0, 0.0, 0.0, 1.0,
        );

        let rotation = Mat4::new(
            right.x, right.y, right.z, 0.0,
            camera_up.x, camera_up.y, camera_up.z, 0.0,
            -forward.x, -forward.y, -forward.z, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );

        rotation * translation
    }

    fn vulkan_coordinate_transform() -> Mat4 {
        Mat4::new(
            1.0,  0.0,  0.0, 0.0,
            0.0, -1.0,  0.0, 0.0,
            0.0,  0.0, -1.0, 0.0,
            0.0,  0.0,  0.0, 1.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_rotation_z_quarter_turn() {
        let rotated = Mat4::rotation_z(std::f32::consts::FRAC_PI_2) * Vec4::new(1.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(rotated, Vec4::new(0.0, 1.0, 0.0, 1.0), epsilon = EPSILON);
    }

    #[test]
    fn test_look_at_moves_target_onto_negative_z() {
        let view = Mat4::look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::zeros(), Vec3::y());
        let target = view * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(target, Vec4::new(0.0, 0.0, -5.0, 1.0), epsilon = EPSILON);
    }

    #[test]
    fn test_perspective_depth_range() {
        let proj = Mat4::perspective(std::f32::consts::FRAC_PI_4, 1.0, 0.1, 10.0);

        let near = proj * Vec4::new(0.0, 0.0, -0.1, 1.0);
        let far = proj * Vec4::new(0.0, 0.0, -10.0, 1.0);

        assert_relative_eq!(near.z / near.w, 0.0, epsilon = EPSILON);
        assert_relative_eq!(far.z / far.w, 1.0, epsilon = EPSILON);
    }

    #[test]
    fn test_perspective_points_up_map_to_negative_y() {
        let proj = Mat4::perspective(std::f32::consts::FRAC_PI_4, 1.0, 0.1, 10.0);
        let clip = proj * Vec4::new(0.0, 1.0, -5.0, 1.0);
        assert!(clip.w > 0.0);
        assert!(clip.y / clip.w < 0.0);
    }
}
