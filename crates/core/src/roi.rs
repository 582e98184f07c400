//! Region-of-interest definitions
//!
//! ROI rectangles live in the coordinate space of the original, unscaled
//! frame. A set is defined once, persisted as JSON, and only mutated by an
//! explicit re-selection step; trackers work on their own per-run copy of
//! the positions.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// A named rectangular region in original-frame pixel coordinates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roi {
    pub name: String,
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

impl Roi {
    pub fn new(name: impl Into<String>, x: usize, y: usize, w: usize, h: usize) -> Self {
        Self {
            name: name.into(),
            x,
            y,
            w,
            h,
        }
    }

    /// Check this rectangle against frame bounds
    pub fn validate_bounds(&self, rows: usize, cols: usize) -> Result<()> {
        if self.w == 0 || self.h == 0 || self.x + self.w > cols || self.y + self.h > rows {
            return Err(Error::RoiOutOfBounds {
                name: self.name.clone(),
                x: self.x,
                y: self.y,
                w: self.w,
                h: self.h,
                rows,
                cols,
            });
        }
        Ok(())
    }
}

/// An ordered set of ROIs with unique names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoiSet {
    rois: Vec<Roi>,
}

impl RoiSet {
    /// Build a set, rejecting duplicate names
    pub fn new(rois: Vec<Roi>) -> Result<Self> {
        let mut seen = HashSet::new();
        for roi in &rois {
            if !seen.insert(roi.name.as_str()) {
                return Err(Error::DuplicateRoiName(roi.name.clone()));
            }
        }
        Ok(Self { rois })
    }

    /// Load a set from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let rois: Vec<Roi> = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| Error::Other(format!("Cannot parse ROI set: {}", e)))?;
        Self::new(rois)
    }

    /// Save the set to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        serde_json::to_writer_pretty(BufWriter::new(file), &self.rois)
            .map_err(|e| Error::Other(format!("Cannot write ROI set: {}", e)))?;
        Ok(())
    }

    /// Validate every rectangle against frame bounds.
    ///
    /// Runs once per set/frame-size pair before any per-frame work; the
    /// first offending rectangle aborts.
    pub fn validate_bounds(&self, rows: usize, cols: usize) -> Result<()> {
        for roi in &self.rois {
            roi.validate_bounds(rows, cols)?;
        }
        Ok(())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Roi> {
        self.rois.iter()
    }

    pub fn len(&self) -> usize {
        self.rois.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rois.is_empty()
    }

    pub fn rois(&self) -> &[Roi] {
        &self.rois
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_names_enforced() {
        let rois = vec![Roi::new("a", 0, 0, 5, 5), Roi::new("a", 10, 10, 5, 5)];
        let err = RoiSet::new(rois).unwrap_err();
        assert!(matches!(err, Error::DuplicateRoiName(_)));
    }

    #[test]
    fn test_bounds_validation() {
        let set = RoiSet::new(vec![
            Roi::new("inside", 10, 20, 30, 40),
            Roi::new("edge", 70, 60, 30, 40),
        ])
        .unwrap();

        assert!(set.validate_bounds(100, 100).is_ok());
        assert!(set.validate_bounds(99, 100).is_err());
    }

    #[test]
    fn test_zero_size_rejected() {
        let roi = Roi::new("empty", 0, 0, 0, 10);
        assert!(roi.validate_bounds(100, 100).is_err());
    }

    #[test]
    fn test_json_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roi.json");

        let set = RoiSet::new(vec![
            Roi::new("tissue", 50, 100, 100, 100),
            Roi::new("control", 200, 100, 80, 80),
        ])
        .unwrap();

        set.save(&path).unwrap();
        let back = RoiSet::load(&path).unwrap();
        assert_eq!(set, back);
    }
}
