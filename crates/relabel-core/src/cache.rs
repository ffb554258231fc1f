//! Local read cache
//!
//! Commands write their results here right after a successful mutation so
//! readers see them without a refetch. Writes must be idempotent: replaying
//! an `apply` and issuing a fresh one converge to the same contents.

use std::collections::BTreeMap;

use crate::model::{Label, LabelClass};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalCache {
    labels: BTreeMap<String, Label>,
    label_classes: BTreeMap<String, LabelClass>,
}

impl LocalCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_label(&mut self, label: Label) {
        self.labels.insert(label.id.clone(), label);
    }

    pub fn evict_label(&mut self, id: &str) -> Option<Label> {
        self.labels.remove(id)
    }

    pub fn label(&self, id: &str) -> Option<&Label> {
        self.labels.get(id)
    }

    /// Labels of an image in creation order
    pub fn labels_of_image(&self, image_id: &str) -> Vec<&Label> {
        let mut labels: Vec<&Label> = self
            .labels
            .values()
            .filter(|l| l.image_id == image_id)
            .collect();
        labels.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        labels
    }

    pub fn put_label_class(&mut self, class: LabelClass) {
        self.label_classes.insert(class.id.clone(), class);
    }

    pub fn evict_label_class(&mut self, id: &str) -> Option<LabelClass> {
        self.label_classes.remove(id)
    }

    pub fn label_class(&self, id: &str) -> Option<&LabelClass> {
        self.label_classes.get(id)
    }

    /// Classes of a dataset ordered by their index
    pub fn classes_of_dataset(&self, dataset_id: &str) -> Vec<&LabelClass> {
        let mut classes: Vec<&LabelClass> = self
            .label_classes
            .values()
            .filter(|c| c.dataset_id == dataset_id)
            .collect();
        classes.sort_by_key(|c| c.index);
        classes
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    pub fn label_class_count(&self) -> usize {
        self.label_classes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Geometry, LabelType};
    use chrono::{TimeZone, Utc};

    fn label(id: &str, image_id: &str, secs: i64) -> Label {
        let at = Utc.timestamp_opt(secs, 0).unwrap();
        Label {
            id: id.to_string(),
            image_id: image_id.to_string(),
            label_type: LabelType::Box,
            geometry: Geometry::rectangle(0.0, 0.0, 1.0, 1.0),
            label_class_id: None,
            smart_tool_input: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_put_is_idempotent() {
        let mut cache = LocalCache::new();
        cache.put_label(label("L1", "I1", 1));
        cache.put_label(label("L1", "I1", 1));

        assert_eq!(cache.label_count(), 1);
    }

    #[test]
    fn test_labels_of_image_in_creation_order() {
        let mut cache = LocalCache::new();
        cache.put_label(label("b", "I1", 2));
        cache.put_label(label("a", "I1", 3));
        cache.put_label(label("c", "I2", 1));

        let ids: Vec<&str> = cache
            .labels_of_image("I1")
            .iter()
            .map(|l| l.id.as_str())
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
    }
}
