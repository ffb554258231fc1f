use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelClass {
    pub id: String,
    pub dataset_id: String,
    pub name: String,
    /// `#rrggbb`
    pub color: String,
    /// Ordering index within the dataset, assigned by the remote store
    pub index: u32,
}

/// Create payload; `index` is only set when recreating a deleted class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLabelClass {
    pub id: String,
    pub dataset_id: String,
    pub name: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
}

impl From<&LabelClass> for NewLabelClass {
    fn from(class: &LabelClass) -> Self {
        Self {
            id: class.id.clone(),
            dataset_id: class.dataset_id.clone(),
            name: class.name.clone(),
            color: class.color.clone(),
            index: Some(class.index),
        }
    }
}
