//! Stable grouping of annotation rows by vulnerability id.

use std::collections::HashMap;

use predict_shared::{Annotation, AnnotationGroup};

/// Partition `rows` by upper-cased `cve_id` in a single pass.
///
/// Groups come out in the order their id first appears in `rows`; members keep
/// their relative input order.
pub fn group(rows: &[Annotation]) -> Vec<AnnotationGroup> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<AnnotationGroup> = Vec::new();

    for row in rows {
        let key = row.cve_id.trim().to_uppercase();
        let slot = *index.entry(key.clone()).or_insert_with(|| {
            groups.push(AnnotationGroup {
                cve_id: key,
                members: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].members.push(row.clone());
    }

    groups
}
