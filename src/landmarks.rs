//! Named display locations.
//!
//! Landmarks are presentation data for layers drawing the grid; the planner
//! itself never consults them.

use fxhash::FxBuildHasher;
use grid_util::point::Point;
use indexmap::IndexMap;

/// A fixed name-to-cell table, built once and then only read.
#[derive(Clone, Debug, Default)]
pub struct Landmarks {
    entries: IndexMap<String, Point, FxBuildHasher>,
}

impl Landmarks {
    pub fn get(&self, name: &str) -> Option<Point> {
        self.entries.get(name).copied()
    }
    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Point)> + '_ {
        self.entries.iter().map(|(name, p)| (name.as_str(), *p))
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The demo dataset: Delhi landmarks on the default 15x15 grid.
    pub fn delhi() -> Self {
        [
            ("AIIMS", Point::new(2, 2)),
            ("CP", Point::new(5, 5)),
            ("India Gate", Point::new(7, 7)),
            ("Lotus", Point::new(10, 8)),
            ("Airport", Point::new(12, 12)),
            ("Station", Point::new(3, 10)),
            ("Jantar", Point::new(9, 3)),
        ]
        .into_iter()
        .collect()
    }
}

impl<S: Into<String>> FromIterator<(S, Point)> for Landmarks {
    fn from_iter<T: IntoIterator<Item = (S, Point)>>(iter: T) -> Self {
        Landmarks {
            entries: iter.into_iter().map(|(n, p)| (n.into(), p)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_and_order() {
        let landmarks = Landmarks::delhi();
        assert_eq!(landmarks.get("Airport"), Some(Point::new(12, 12)));
        assert_eq!(landmarks.get("Atlantis"), None);
        assert_eq!(landmarks.len(), 7);
        assert_eq!(landmarks.iter().next(), Some(("AIIMS", Point::new(2, 2))));
    }
}
