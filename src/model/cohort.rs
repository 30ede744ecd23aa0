use super::AcquisitionRecord;
use std::collections::BTreeMap;

/// All acquisitions of one subject on one date; the unit of dispatch.
#[derive(Debug, Clone)]
pub struct Cohort {
    pub date: String,
    pub subject: String,
    /// Sorted by acquisition time.
    pub records: Vec<AcquisitionRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct CohortKey {
    pub date: String,
    pub subject: String,
}

impl CohortKey {
    pub fn of(record: &AcquisitionRecord) -> Self {
        Self {
            date: record.acquisition_date.clone(),
            subject: record.subject_id.clone(),
        }
    }
}

/// Groups records by `(acquisition_date, subject_id)`.
///
/// Cohorts come out ordered by date, then subject. Membership only depends on
/// key equality, so the order records were discovered in does not matter.
pub fn build_cohorts(mut records: Vec<AcquisitionRecord>) -> Vec<Cohort> {
    records.sort_by(|a, b| {
        (a.acquisition_date.as_str(), a.acquisition_time.as_str())
            .cmp(&(b.acquisition_date.as_str(), b.acquisition_time.as_str()))
    });

    let mut grouped: BTreeMap<CohortKey, Vec<AcquisitionRecord>> = BTreeMap::new();
    for record in records {
        grouped
            .entry(CohortKey::of(&record))
            .or_default()
            .push(record);
    }

    grouped
        .into_iter()
        .map(|(key, records)| Cohort {
            date: key.date,
            subject: key.subject,
            records,
        })
        .collect()
}
