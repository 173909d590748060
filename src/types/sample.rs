use super::DataPoint;

/// A reading held inside the sliding window, with its magnitude precomputed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub magnitude: f64,
    pub timestamp: i64,
}

impl Sample {
    pub fn new(x: f64, y: f64, z: f64, timestamp: i64) -> Self {
        Self::from(DataPoint::new(x, y, z, timestamp))
    }
}

impl From<DataPoint> for Sample {
    fn from(point: DataPoint) -> Self {
        Self {
            x: point.x,
            y: point.y,
            z: point.z,
            magnitude: point.magnitude(),
            timestamp: point.timestamp,
        }
    }
}
