//! Deterministic local pose integration

use shared::{
    normalize_yaw, InputSample, Pose, GRAVITY, GROUND_Y, JUMP_SPEED, MOVE_SPEED, TURN_SPEED,
};

/// The local participant's simulated pose: planar movement along the facing
/// direction, yaw turning, and a capped single-axis vertical integrator.
/// Advancing is a pure function of the current state, the input sample, and
/// the elapsed time, so identical tick sequences produce identical poses.
#[derive(Debug, Clone, Copy)]
pub struct LocalPose {
    pub pose: Pose,
    vertical_velocity: f32,
    on_ground: bool,
}

impl LocalPose {
    pub fn new(pose: Pose) -> Self {
        let on_ground = pose.y <= GROUND_Y;
        Self {
            pose,
            vertical_velocity: 0.0,
            on_ground,
        }
    }

    pub fn on_ground(&self) -> bool {
        self.on_ground
    }

    /// Advances the pose by one tick of `dt` seconds.
    pub fn step(&mut self, input: &InputSample, dt: f32) {
        if input.turn_left {
            self.pose.yaw += TURN_SPEED * dt;
        }
        if input.turn_right {
            self.pose.yaw -= TURN_SPEED * dt;
        }
        self.pose.yaw = normalize_yaw(self.pose.yaw);

        let mut heading = 0.0;
        if input.forward {
            heading -= 1.0;
        }
        if input.backward {
            heading += 1.0;
        }
        self.pose.x += heading * MOVE_SPEED * dt * self.pose.yaw.sin();
        self.pose.z += heading * MOVE_SPEED * dt * self.pose.yaw.cos();

        // Jump only from the ground; gravity accumulates while airborne.
        if input.jump && self.on_ground {
            self.vertical_velocity = JUMP_SPEED;
            self.on_ground = false;
        }
        if !self.on_ground {
            self.vertical_velocity -= GRAVITY * dt;
        }
        self.pose.y += self.vertical_velocity * dt;

        if self.pose.y <= GROUND_Y {
            self.pose.y = GROUND_Y;
            self.vertical_velocity = 0.0;
            self.on_ground = true;
        }
    }
}
