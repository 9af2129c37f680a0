use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FusionError {
    #[error("cannot read calibration file {path}: {source}")]
    CalibrationIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed calibration file {path}: {source}")]
    CalibrationParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid calibration: {0}")]
    InvalidCalibration(String),

    #[error("image buffer holds {actual} values, expected {expected}")]
    ImageSize { expected: usize, actual: usize },

    #[error("datagram of {0} bytes is neither a heartbeat nor a gesture payload")]
    PayloadLength(usize),

    #[error("heartbeat datagram carries index {0}, expected the -1 sentinel")]
    HeartbeatSentinel(f64),
}
