//! Wire records and datagram decoding
//!
//! Two encodings are accepted:
//! - JSON: `{ sourceTime, sequenceId, position: [3], orientation: [x, y, z, w], confidence? }`
//!   plus the older field names (`timestamp`, `id`, `positionDif`/`translation`,
//!   `rotationDif`/`quaternion`, `rotation_matrix_flat`)
//! - bincode: fixed-layout `BinaryPoseRecord`

use chrono::{DateTime, NaiveDateTime};
use contracts::{PoseSample, WireFormat};
use nalgebra::{Matrix3, Rotation3, UnitQuaternion};
use serde::{Deserialize, Serialize};

use crate::error::{IngestionError, Result};

/// Timestamp as sent: a number, or a string holding a number or an RFC 3339 date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireTimestamp {
    Number(f64),
    Text(String),
}

impl WireTimestamp {
    /// Raw seconds (or milliseconds) before normalization
    pub fn to_raw_seconds(&self) -> Result<f64> {
        match self {
            WireTimestamp::Number(value) => Ok(*value),
            WireTimestamp::Text(text) => parse_timestamp_text(text),
        }
    }
}

fn parse_timestamp_text(text: &str) -> Result<f64> {
    let trimmed = text.trim();
    if let Ok(value) = trimmed.parse::<f64>() {
        return Ok(value);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.timestamp_micros() as f64 / 1e6);
    }
    // ISO 8601 without a zone designator, read as UTC
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc().timestamp_micros() as f64 / 1e6);
    }
    Err(IngestionError::BadTimestamp {
        value: text.to_string(),
    })
}

/// Self-describing JSON record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRecord {
    #[serde(alias = "timestamp", alias = "source_time")]
    pub source_time: WireTimestamp,

    #[serde(default, alias = "id", alias = "sequence_id")]
    pub sequence_id: u64,

    #[serde(default, alias = "positionDif", alias = "translation")]
    pub position: Option<Vec<f64>>,

    /// `[x, y, z, w]`
    #[serde(default, alias = "rotationDif", alias = "quaternion")]
    pub orientation: Option<Vec<f64>>,

    /// Row-major 3x3, used only when no quaternion is present
    #[serde(
        default,
        rename = "rotation_matrix_flat",
        alias = "rotationMatrixFlat",
        skip_serializing_if = "Option::is_none"
    )]
    pub rotation_matrix_flat: Option<Vec<f64>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl WireRecord {
    pub fn from_sample(sample: &PoseSample) -> Self {
        let q = sample.orientation.into_inner().coords;
        Self {
            source_time: WireTimestamp::Number(sample.source_time),
            sequence_id: sample.sequence_id,
            position: Some(sample.position.iter().copied().collect()),
            orientation: Some(vec![q[0], q[1], q[2], q[3]]),
            rotation_matrix_flat: None,
            confidence: sample.confidence,
        }
    }

    /// Validate and convert into a `PoseSample`
    pub fn into_sample(self) -> Result<PoseSample> {
        let source_time = self.source_time.to_raw_seconds()?;

        let position = self.position.ok_or(IngestionError::MissingField {
            field: "position",
        })?;
        let position = fixed::<3>("position", &position)?;

        let orientation = match (self.orientation, self.rotation_matrix_flat) {
            (Some(q), _) => fixed::<4>("orientation", &q)?,
            (None, Some(m)) => matrix_to_xyzw(&fixed::<9>("rotation_matrix_flat", &m)?),
            (None, None) => {
                return Err(IngestionError::MissingField {
                    field: "orientation",
                })
            }
        };

        Ok(PoseSample::from_components(
            source_time,
            self.sequence_id,
            position,
            orientation,
            self.confidence,
        )?)
    }
}

/// Fixed-layout binary record
///
/// `confidence < 0` means unknown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinaryPoseRecord {
    pub source_time: f64,
    pub sequence_id: u64,
    pub position: [f64; 3],
    /// `[x, y, z, w]`
    pub orientation: [f64; 4],
    pub confidence: f64,
}

impl BinaryPoseRecord {
    pub fn from_sample(sample: &PoseSample) -> Self {
        let q = sample.orientation.into_inner().coords;
        Self {
            source_time: sample.source_time,
            sequence_id: sample.sequence_id,
            position: [sample.position.x, sample.position.y, sample.position.z],
            orientation: [q[0], q[1], q[2], q[3]],
            confidence: sample.confidence.unwrap_or(-1.0),
        }
    }

    pub fn into_sample(self) -> Result<PoseSample> {
        Ok(PoseSample::from_components(
            self.source_time,
            self.sequence_id,
            self.position,
            self.orientation,
            Some(self.confidence),
        )?)
    }
}

/// Decode one datagram into a validated sample
pub fn decode_datagram(bytes: &[u8], format: WireFormat) -> Result<PoseSample> {
    match format {
        WireFormat::Json => {
            let record: WireRecord =
                serde_json::from_slice(bytes).map_err(|e| IngestionError::MalformedJson {
                    message: e.to_string(),
                })?;
            record.into_sample()
        }
        WireFormat::Bincode => {
            let record: BinaryPoseRecord =
                bincode::deserialize(bytes).map_err(|e| IngestionError::MalformedBinary {
                    message: e.to_string(),
                })?;
            record.into_sample()
        }
    }
}

/// Encode a sample the way a sender would
pub fn encode_sample(sample: &PoseSample, format: WireFormat) -> Result<Vec<u8>> {
    match format {
        WireFormat::Json => serde_json::to_vec(&WireRecord::from_sample(sample)).map_err(|e| {
            IngestionError::MalformedJson {
                message: e.to_string(),
            }
        }),
        WireFormat::Bincode => bincode::serialize(&BinaryPoseRecord::from_sample(sample))
            .map_err(|e| IngestionError::MalformedBinary {
                message: e.to_string(),
            }),
    }
}

fn fixed<const N: usize>(field: &'static str, values: &[f64]) -> Result<[f64; N]> {
    values.try_into().map_err(|_| IngestionError::WrongArity {
        field,
        expected: N,
        got: values.len(),
    })
}

fn matrix_to_xyzw(flat: &[f64; 9]) -> [f64; 4] {
    let m = Matrix3::from_row_slice(flat);
    let rotation = Rotation3::from_matrix_eps(&m, 1.0e-9, 100, Rotation3::identity());
    let q = UnitQuaternion::from_rotation_matrix(&rotation).into_inner().coords;
    [q[0], q[1], q[2], q[3]]
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SampleDefect;

    #[test]
    fn test_decode_canonical_json() {
        let json = br#"{"sourceTime": 12.5, "sequenceId": 3, "position": [0.1, 0.2, 0.3],
            "orientation": [0.0, 0.0, 0.0, 1.0], "confidence": 0.8}"#;
        let sample = decode_datagram(json, WireFormat::Json).unwrap();
        assert_eq!(sample.source_time, 12.5);
        assert_eq!(sample.sequence_id, 3);
        assert!((sample.position.z - 0.3).abs() < 1e-12);
        assert_eq!(sample.confidence, Some(0.8));
    }

    #[test]
    fn test_decode_millisecond_timestamp() {
        let json = br#"{"sourceTime": 1700000000500, "sequenceId": 1, "position": [0, 0, 0],
            "orientation": [0, 0, 0, 1]}"#;
        let sample = decode_datagram(json, WireFormat::Json).unwrap();
        assert!((sample.source_time - 1_700_000_000.5).abs() < 1e-6);
    }

    #[test]
    fn test_decode_legacy_fields() {
        let json = br#"{"timestamp": "2025-08-11T01:23:45.678Z", "id": 9,
            "positionDif": [1, 2, 3], "rotationDif": [0, 0, 0, 1], "confidence": -1}"#;
        let sample = decode_datagram(json, WireFormat::Json).unwrap();
        assert_eq!(sample.sequence_id, 9);
        assert_eq!(sample.confidence, None);
        let expected = DateTime::parse_from_rfc3339("2025-08-11T01:23:45.678Z")
            .unwrap()
            .timestamp_micros() as f64
            / 1e6;
        assert!((sample.source_time - expected).abs() < 1e-6);
    }

    #[test]
    fn test_decode_numeric_string_timestamp() {
        let json = br#"{"timestamp": "42.25", "translation": [0, 0, 0], "quaternion": [0, 0, 0, 1]}"#;
        let sample = decode_datagram(json, WireFormat::Json).unwrap();
        assert_eq!(sample.source_time, 42.25);
    }

    #[test]
    fn test_decode_rotation_matrix() {
        // 90 degrees about z, row-major
        let json = br#"{"timestamp": 1.0, "translation": [0, 0, 0],
            "rotation_matrix_flat": [0, -1, 0, 1, 0, 0, 0, 0, 1]}"#;
        let sample = decode_datagram(json, WireFormat::Json).unwrap();
        let expected =
            UnitQuaternion::from_axis_angle(&nalgebra::Vector3::z_axis(), std::f64::consts::FRAC_PI_2);
        assert!(sample.orientation.angle_to(&expected) < 1e-6);
    }

    #[test]
    fn test_wrong_arity() {
        let json = br#"{"sourceTime": 1.0, "position": [0, 0], "orientation": [0, 0, 0, 1]}"#;
        let err = decode_datagram(json, WireFormat::Json).unwrap_err();
        assert!(matches!(
            err,
            IngestionError::WrongArity {
                field: "position",
                expected: 3,
                got: 2
            }
        ));
    }

    #[test]
    fn test_missing_orientation() {
        let json = br#"{"sourceTime": 1.0, "position": [0, 0, 0]}"#;
        let err = decode_datagram(json, WireFormat::Json).unwrap_err();
        assert_eq!(err.kind(), "missing_field");
    }

    #[test]
    fn test_zero_quaternion_rejected() {
        let json = br#"{"sourceTime": 1.0, "position": [0, 0, 0], "orientation": [0, 0, 0, 0]}"#;
        let err = decode_datagram(json, WireFormat::Json).unwrap_err();
        assert!(matches!(
            err,
            IngestionError::InvalidSample(SampleDefect::ZeroNormOrientation)
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        let err = decode_datagram(b"not json", WireFormat::Json).unwrap_err();
        assert_eq!(err.kind(), "malformed_json");
        let err = decode_datagram(&[1, 2, 3], WireFormat::Bincode).unwrap_err();
        assert_eq!(err.kind(), "malformed_binary");
    }

    #[test]
    fn test_bad_timestamp_text() {
        let json = br#"{"timestamp": "yesterday", "position": [0, 0, 0], "orientation": [0, 0, 0, 1]}"#;
        let err = decode_datagram(json, WireFormat::Json).unwrap_err();
        assert_eq!(err.kind(), "bad_timestamp");
    }

    #[test]
    fn test_binary_record_decodes() {
        let sample =
            PoseSample::from_components(5.0, 11, [0.5, -0.5, 1.0], [0.0, 0.6, 0.0, 0.8], Some(0.4))
                .unwrap();
        let bytes = encode_sample(&sample, WireFormat::Bincode).unwrap();
        let decoded = decode_datagram(&bytes, WireFormat::Bincode).unwrap();
        assert_eq!(decoded.sequence_id, 11);
        assert_eq!(decoded.confidence, Some(0.4));
        assert!(decoded.orientation.angle_to(&sample.orientation) < 1e-12);
    }
}
