use serde::{Deserialize, Serialize};

/// Raw tri-axial accelerometer reading as delivered by the sensor stream (m/s²).
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct DataPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub timestamp: i64,
}

impl DataPoint {
    pub fn new(x: f64, y: f64, z: f64, timestamp: i64) -> Self {
        Self { x, y, z, timestamp }
    }

    /// Euclidean norm of the three axes, gravity included.
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}
