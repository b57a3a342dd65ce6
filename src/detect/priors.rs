use anyhow::{anyhow, bail, Result};
use std::path::Path;

/// Anchor box priors shared by both detector models.
///
/// Rows are stored as parallel columns: y-center, x-center, height, width.
/// The set is immutable once constructed.
#[derive(Clone, Debug, PartialEq)]
pub struct BoxPriorSet {
    y: Vec<f32>,
    x: Vec<f32>,
    h: Vec<f32>,
    w: Vec<f32>,
}

impl BoxPriorSet {
    /// Build a prior set from four rows. Every row must hold exactly `detection_max` values.
    pub fn new(y: Vec<f32>, x: Vec<f32>, h: Vec<f32>, w: Vec<f32>, detection_max: usize) -> Result<Self> {
        if detection_max == 0 {
            bail!("contract: prior table needs at least one anchor");
        }
        for (name, row) in [("y", &y), ("x", &x), ("h", &h), ("w", &w)] {
            if row.len() != detection_max {
                bail!(
                    "contract: prior row {} has {} anchors, expected {}",
                    name,
                    row.len(),
                    detection_max
                );
            }
        }
        Ok(Self { y, x, h, w })
    }

    /// Parse the whitespace-separated prior table format.
    ///
    /// The first four non-empty lines are the y, x, h and w rows. Columns past
    /// `detection_max` are ignored.
    pub fn parse(text: &str, detection_max: usize) -> Result<Self> {
        let mut rows: Vec<Vec<f32>> = Vec::with_capacity(4);
        for (line_no, line) in text.lines().enumerate() {
            if rows.len() == 4 {
                break;
            }
            if line.trim().is_empty() {
                continue;
            }
            let row = line
                .split_whitespace()
                .take(detection_max)
                .map(|field| {
                    field.parse::<f32>().map_err(|e| {
                        anyhow!("prior table line {}: invalid value {:?}: {}", line_no + 1, field, e)
                    })
                })
                .collect::<Result<Vec<f32>>>()?;
            rows.push(row);
        }
        if rows.len() != 4 {
            bail!("contract: prior table has {} rows, expected 4", rows.len());
        }
        let w = rows.pop().unwrap_or_default();
        let h = rows.pop().unwrap_or_default();
        let x = rows.pop().unwrap_or_default();
        let y = rows.pop().unwrap_or_default();
        Self::new(y, x, h, w, detection_max)
    }

    pub fn load(path: &Path, detection_max: usize) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("cannot read box priors {}: {}", path.display(), e))?;
        let priors = Self::parse(&raw, detection_max)
            .map_err(|e| anyhow!("invalid box priors {}: {}", path.display(), e))?;
        log::info!(
            "loaded box priors from {}, total [{}]",
            path.display(),
            priors.len()
        );
        Ok(priors)
    }

    /// Number of anchors.
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Returns `(y_center, x_center, height, width)` for anchor `d`.
    pub fn anchor(&self, d: usize) -> (f32, f32, f32, f32) {
        (self.y[d], self.x[d], self.h[d], self.w[d])
    }

    /// Index of the anchor whose center is closest to the normalized point `(x, y)`.
    pub fn nearest_anchor(&self, x: f32, y: f32) -> usize {
        let mut best = 0;
        let mut best_dist = f32::INFINITY;
        for d in 0..self.len() {
            let dx = self.x[d] - x;
            let dy = self.y[d] - y;
            let dist = dx * dx + dy * dy;
            if dist < best_dist {
                best = d;
                best_dist = dist;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_four_rows_and_ignores_extra_columns() {
        let text = "0.1 0.2 0.3 9.9\n0.4 0.5 0.6\n\n0.7 0.8 0.9\n1.0 1.1 1.2\n";
        let priors = BoxPriorSet::parse(text, 3).unwrap();
        assert_eq!(priors.len(), 3);
        assert_eq!(priors.anchor(0), (0.1, 0.4, 0.7, 1.0));
        assert_eq!(priors.anchor(2), (0.3, 0.6, 0.9, 1.2));
    }

    #[test]
    fn rejects_short_rows() {
        let text = "0.1 0.2\n0.4 0.5 0.6\n0.7 0.8 0.9\n1.0 1.1 1.2\n";
        let err = BoxPriorSet::parse(text, 3).unwrap_err();
        assert!(err.to_string().contains("prior row y"));
    }

    #[test]
    fn rejects_missing_rows() {
        assert!(BoxPriorSet::parse("0.1 0.2\n0.3 0.4\n", 2).is_err());
        assert!(BoxPriorSet::parse("", 2).is_err());
    }

    #[test]
    fn rejects_non_numeric_values() {
        let err = BoxPriorSet::parse("0.1 abc\n1 1\n1 1\n1 1\n", 2).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn nearest_anchor_picks_closest_center() {
        let priors = BoxPriorSet::new(
            vec![0.1, 0.5, 0.9],
            vec![0.1, 0.5, 0.9],
            vec![0.1; 3],
            vec![0.1; 3],
            3,
        )
        .unwrap();
        assert_eq!(priors.nearest_anchor(0.55, 0.45), 1);
        assert_eq!(priors.nearest_anchor(1.0, 1.0), 2);
    }
}
