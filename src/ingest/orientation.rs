//! Orientation decision table.
//!
//! Waveform arrays are meant to be `[time_steps, points]` but some files store
//! them `[points, time_steps]`. The layout is inferred from the load array's
//! shape alone and the same decision is applied to the output array, so load
//! and output rows stay paired.
//!
//! | `rows == points` | `cols == points` | decision      |
//! |------------------|------------------|---------------|
//! | yes              | no               | `PointsMajor` |
//! | yes              | yes              | `Ambiguous`   |
//! | no               | any              | `TimeMajor`   |
//!
//! `Ambiguous` is handled as time-major, but callers are expected to flag it:
//! a square array cannot be told apart from its transpose by shape.

use ndarray::Array2;
use serde::Serialize;

/// Storage layout of a waveform array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// `[time_steps, points]`; used as stored.
    TimeMajor,
    /// `[points, time_steps]`; transposed before use.
    PointsMajor,
    /// Both dimensions equal the point count; treated as time-major.
    Ambiguous,
}

impl Orientation {
    /// Classifies a 2-D `shape` against the expected per-sample point count.
    pub fn classify(shape: (usize, usize), points: usize) -> Self {
        match (shape.0 == points, shape.1 == points) {
            (true, false) => Orientation::PointsMajor,
            (true, true) => Orientation::Ambiguous,
            (false, _) => Orientation::TimeMajor,
        }
    }

    pub fn needs_transpose(self) -> bool {
        matches!(self, Orientation::PointsMajor)
    }

    /// Brings `array` into time-major layout according to this decision.
    ///
    /// The result is always an owned, standard-layout array.
    pub fn normalize(self, array: Array2<f64>) -> Array2<f64> {
        if self.needs_transpose() {
            array.reversed_axes().as_standard_layout().into_owned()
        } else {
            array
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    const P: usize = 400;

    #[test]
    fn decision_table() {
        let cases = [
            ((400, 1000), Orientation::PointsMajor),
            ((400, 1), Orientation::PointsMajor),
            ((400, 0), Orientation::PointsMajor),
            ((400, 400), Orientation::Ambiguous),
            ((1000, 400), Orientation::TimeMajor),
            ((1000, 399), Orientation::TimeMajor),
            ((0, 400), Orientation::TimeMajor),
            ((0, 0), Orientation::TimeMajor),
        ];

        for (shape, expected) in cases {
            assert_eq!(Orientation::classify(shape, P), expected, "shape {shape:?}");
        }
    }

    #[test]
    fn only_points_major_transposes() {
        assert!(Orientation::PointsMajor.needs_transpose());
        assert!(!Orientation::Ambiguous.needs_transpose());
        assert!(!Orientation::TimeMajor.needs_transpose());
    }

    #[test]
    fn normalize_transposes_points_major() {
        let stored = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let normalized = Orientation::PointsMajor.normalize(stored);

        assert_eq!(normalized, array![[1.0, 4.0], [2.0, 5.0], [3.0, 6.0]]);
        assert!(normalized.is_standard_layout());
    }

    #[test]
    fn normalize_keeps_ambiguous_as_stored() {
        let stored = array![[1.0, 2.0], [3.0, 4.0]];
        assert_eq!(Orientation::Ambiguous.normalize(stored.clone()), stored);
    }
}
