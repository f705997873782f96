use nalgebra::Vector2;

use crate::physics::atmosphere::AirData;

/// Dynamic pressure q = 0.5 * rho * v^2 (Pa).
pub fn dynamic_pressure(air: &AirData, speed: f64) -> f64 {
    0.5 * air.density * speed * speed
}

/// Drag force opposing the air-relative velocity (N, flight frame).
pub fn drag_force(rel_vel: &Vector2<f64>, air: &AirData, cd: f64, area: f64) -> Vector2<f64> {
    let speed = rel_vel.norm();
    if speed > 1e-6 {
        let drag_mag = dynamic_pressure(air, speed) * cd * area;
        -rel_vel / speed * drag_mag
    } else {
        Vector2::zeros()
    }
}

/// Aerodynamic damping of the body rotation rate (rad/s^2).
pub fn damping_accel(angular_rate: f64, q_dyn: f64, area: f64, inertia: f64) -> f64 {
    if inertia <= 0.0 {
        return 0.0;
    }
    -angular_rate * q_dyn * area * 0.5 / inertia
}
