//! The binary restock label space.

use std::fmt;
use std::str::FromStr;

use crate::ModelError;

/// Restock status of an inventory item; the classifier's target.
///
/// Class indices follow the lexicographic order of the canonical labels,
/// so `NeedsRestock` is class 0 and `NoRestockNeeded` is class 1.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
    serde::Serialize, serde::Deserialize,
)]
pub enum RestockStatus {
    /// Stock should be replenished.
    #[serde(rename = "Needs Restock")]
    NeedsRestock,
    /// Stock is sufficient.
    #[serde(rename = "No Restock Needed")]
    NoRestockNeeded,
}

impl RestockStatus {
    /// Every status in class-index order.
    pub const ALL: [RestockStatus; 2] = [RestockStatus::NeedsRestock, RestockStatus::NoRestockNeeded];

    /// Size of the label space.
    pub const N_CLASSES: usize = Self::ALL.len();

    /// Return the canonical display label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RestockStatus::NeedsRestock => "Needs Restock",
            RestockStatus::NoRestockNeeded => "No Restock Needed",
        }
    }

    /// Return the zero-based class index used by the decision tree.
    #[must_use]
    pub fn class_index(self) -> usize {
        match self {
            RestockStatus::NeedsRestock => 0,
            RestockStatus::NoRestockNeeded => 1,
        }
    }

    /// Map a class index back to a status.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidCode`] for an index outside the label space.
    pub fn from_class_index(index: usize) -> Result<Self, ModelError> {
        Self::ALL.get(index).copied().ok_or(ModelError::InvalidCode {
            column: crate::schema::STATUS.to_string(),
            code: index,
            n_categories: Self::N_CLASSES,
        })
    }
}

impl fmt::Display for RestockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RestockStatus {
    type Err = ModelError;

    /// Parse a status label, case-insensitively and ignoring surrounding
    /// whitespace. The Indonesian labels
    /// ("Perlu Restok", "Tidak Perlu Restok") are accepted as aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "needs restock" | "perlu restok" => Ok(RestockStatus::NeedsRestock),
            "no restock needed" | "tidak perlu restok" => Ok(RestockStatus::NoRestockNeeded),
            _ => Err(ModelError::InvalidValue {
                column: crate::schema::STATUS.to_string(),
                row: None,
                raw: s.to_string(),
                reason: "expected \"Needs Restock\" or \"No Restock Needed\"",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RestockStatus;
    use crate::ModelError;

    #[test]
    fn class_indices_follow_label_order() {
        let mut labels: Vec<&str> = RestockStatus::ALL.iter().map(|s| s.as_str()).collect();
        labels.sort_unstable();
        for (i, label) in labels.iter().enumerate() {
            let status: RestockStatus = label.parse().unwrap();
            assert_eq!(status.class_index(), i);
            assert_eq!(RestockStatus::from_class_index(i).unwrap(), status);
        }
    }

    #[test]
    fn parses_aliases_and_case() {
        assert_eq!(" needs restock ".parse::<RestockStatus>().unwrap(), RestockStatus::NeedsRestock);
        assert_eq!("Perlu Restok".parse::<RestockStatus>().unwrap(), RestockStatus::NeedsRestock);
        assert_eq!(
            "Tidak Perlu Restok".parse::<RestockStatus>().unwrap(),
            RestockStatus::NoRestockNeeded
        );
    }

    #[test]
    fn rejects_unknown_label() {
        let err = "Maybe".parse::<RestockStatus>().unwrap_err();
        assert!(matches!(err, ModelError::InvalidValue { .. }));
    }

    #[test]
    fn out_of_range_class_index() {
        let err = RestockStatus::from_class_index(2).unwrap_err();
        assert!(matches!(err, ModelError::InvalidCode { code: 2, .. }));
    }
}
