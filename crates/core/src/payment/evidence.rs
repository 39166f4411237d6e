use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::payment::{ConditionIssue, IssueSeverity};
use crate::domain::shipment::GeoPoint;

/// Documentary categories captured at pickup. The required set gates the
/// pickup-verified transition; optional categories never do.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceCategory {
    FrontPhoto,
    RearPhoto,
    DriverSidePhoto,
    PassengerSidePhoto,
    OdometerPhoto,
    DamagePhoto,
    InteriorPhoto,
}

impl EvidenceCategory {
    pub const REQUIRED: [EvidenceCategory; 5] = [
        Self::FrontPhoto,
        Self::RearPhoto,
        Self::DriverSidePhoto,
        Self::PassengerSidePhoto,
        Self::OdometerPhoto,
    ];

    pub fn is_required(self) -> bool {
        Self::REQUIRED.contains(&self)
    }
}

/// Evidence bundle supplied with a pickup-verified event: captured photo
/// categories, any reported condition issues, and an optional geotag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PickupEvidence {
    pub captured: BTreeSet<EvidenceCategory>,
    pub issues: Vec<ConditionIssue>,
    pub location: Option<GeoPoint>,
    pub captured_at: DateTime<Utc>,
}

impl PickupEvidence {
    pub fn new(captured_at: DateTime<Utc>) -> Self {
        Self { captured: BTreeSet::new(), issues: Vec::new(), location: None, captured_at }
    }

    pub fn with_categories(
        mut self,
        categories: impl IntoIterator<Item = EvidenceCategory>,
    ) -> Self {
        self.captured.extend(categories);
        self
    }

    pub fn with_issue(mut self, severity: IssueSeverity, note: impl Into<String>) -> Self {
        self.issues.push(ConditionIssue { severity, note: note.into() });
        self
    }

    pub fn with_location(mut self, location: GeoPoint) -> Self {
        self.location = Some(location);
        self
    }

    /// Required categories not present in the captured set, in declaration
    /// order.
    pub fn missing_required(&self) -> Vec<EvidenceCategory> {
        EvidenceCategory::REQUIRED
            .into_iter()
            .filter(|category| !self.captured.contains(category))
            .collect()
    }

    pub fn has_major_issue(&self) -> bool {
        self.issues.iter().any(|issue| issue.severity == IssueSeverity::Major)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::domain::payment::IssueSeverity;

    use super::{EvidenceCategory, PickupEvidence};

    #[test]
    fn complete_required_set_has_nothing_missing() {
        let evidence = PickupEvidence::new(Utc::now()).with_categories(EvidenceCategory::REQUIRED);
        assert!(evidence.missing_required().is_empty());
    }

    #[test]
    fn missing_odometer_is_reported() {
        let evidence = PickupEvidence::new(Utc::now()).with_categories([
            EvidenceCategory::FrontPhoto,
            EvidenceCategory::RearPhoto,
            EvidenceCategory::DriverSidePhoto,
            EvidenceCategory::PassengerSidePhoto,
        ]);
        assert_eq!(evidence.missing_required(), vec![EvidenceCategory::OdometerPhoto]);
    }

    #[test]
    fn optional_categories_are_never_required() {
        assert!(!EvidenceCategory::DamagePhoto.is_required());
        assert!(!EvidenceCategory::InteriorPhoto.is_required());

        // optional extras do not stand in for missing required categories
        let evidence = PickupEvidence::new(Utc::now())
            .with_categories([EvidenceCategory::DamagePhoto, EvidenceCategory::InteriorPhoto]);
        assert_eq!(evidence.missing_required().len(), EvidenceCategory::REQUIRED.len());
    }

    #[test]
    fn major_issue_is_detected_among_minor_ones() {
        let evidence = PickupEvidence::new(Utc::now())
            .with_issue(IssueSeverity::Minor, "door ding, driver side")
            .with_issue(IssueSeverity::Major, "cracked windshield");
        assert!(evidence.has_major_issue());
    }
}
