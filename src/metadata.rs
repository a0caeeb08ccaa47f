//! Production slate metadata.
//!
//! Slates tag recorded clips with production context. The well-known fields
//! are the scene, the take and the production name, but the mapping is open:
//! hosts may add camera roll, director, notes or any other field a driver can
//! forward into the camera's clip metadata.
//!
//! ## `SlateMetadataBuilder`
//!
//! Builds a slate step by step:
//!
//! ```rust
//! use landfall_camera::metadata::SlateMetadata;
//!
//! let slate = SlateMetadata::builder()
//!     .production("Landfall")
//!     .scene("12A")
//!     .take(3)
//!     .field("camera_roll", "A004")
//!     .build();
//!
//! assert_eq!(slate.scene(), Some("12A"));
//! assert_eq!(slate.take(), Some(3));
//! ```

use crate::error::{CameraError, CameraResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Field name for the scene identifier.
pub const SCENE: &str = "scene";
/// Field name for the take number.
pub const TAKE: &str = "take";
/// Field name for the production title.
pub const PRODUCTION: &str = "production_name";
/// Field name for the shoot date, `YYYY-MM-DD`.
pub const SHOOT_DATE: &str = "shoot_date";

/// Longest field name accepted by [`SlateMetadata::validate`].
pub const MAX_FIELD_NAME_LEN: usize = 64;

/// Open-ended mapping from slate field name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlateMetadata {
    fields: BTreeMap<String, Value>,
}

impl SlateMetadata {
    /// Empty slate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start building a slate.
    pub fn builder() -> SlateMetadataBuilder {
        SlateMetadataBuilder::default()
    }

    /// Set a field, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(key.into(), value.into())
    }

    /// Look up a field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Scene identifier, if present as text.
    pub fn scene(&self) -> Option<&str> {
        self.fields.get(SCENE).and_then(Value::as_str)
    }

    /// Take number, accepting either a number or numeric text.
    pub fn take(&self) -> Option<u64> {
        match self.fields.get(TAKE)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Production title, if present as text.
    pub fn production(&self) -> Option<&str> {
        self.fields.get(PRODUCTION).and_then(Value::as_str)
    }

    /// Shoot date, if present and well formed.
    pub fn shoot_date(&self) -> Option<NaiveDate> {
        let text = self.fields.get(SHOOT_DATE)?.as_str()?;
        NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
    }

    /// Fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the slate has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields flattened to text, as most camera protocols expect.
    pub fn to_text_fields(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .map(|(k, v)| {
                let text = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), text)
            })
            .collect()
    }

    /// Checks the slate before a driver forwards it.
    ///
    /// Rejects empty slates, blank or overlong field names, and nested
    /// arrays/objects, which no camera clip-metadata format can hold.
    pub fn validate(&self) -> CameraResult<()> {
        if self.fields.is_empty() {
            return Err(CameraError::InvalidMetadata("slate has no fields".into()));
        }
        for (key, value) in &self.fields {
            if key.trim().is_empty() {
                return Err(CameraError::InvalidMetadata("field name is empty".into()));
            }
            if key.len() > MAX_FIELD_NAME_LEN {
                return Err(CameraError::InvalidMetadata(format!(
                    "field name '{}' exceeds {} characters",
                    key, MAX_FIELD_NAME_LEN
                )));
            }
            if value.is_array() || value.is_object() {
                return Err(CameraError::InvalidMetadata(format!(
                    "field '{}' must be a scalar value",
                    key
                )));
            }
        }
        Ok(())
    }
}

impl From<HashMap<String, Value>> for SlateMetadata {
    fn from(map: HashMap<String, Value>) -> Self {
        Self {
            fields: map.into_iter().collect(),
        }
    }
}

impl FromIterator<(String, Value)> for SlateMetadata {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// A builder for constructing `SlateMetadata` instances.
#[derive(Default)]
pub struct SlateMetadataBuilder {
    inner: SlateMetadata,
}

impl SlateMetadataBuilder {
    /// Scene identifier (`"12A"`).
    pub fn scene(mut self, scene: &str) -> Self {
        self.inner.insert(SCENE, scene);
        self
    }

    /// Take number.
    pub fn take(mut self, take: u64) -> Self {
        self.inner.insert(TAKE, take);
        self
    }

    /// Production title.
    pub fn production(mut self, name: &str) -> Self {
        self.inner.insert(PRODUCTION, name);
        self
    }

    /// Shoot date.
    pub fn shoot_date(mut self, date: NaiveDate) -> Self {
        self.inner
            .insert(SHOOT_DATE, date.format("%Y-%m-%d").to_string());
        self
    }

    /// Any other field.
    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.inner.insert(key, value);
        self
    }

    /// Finish the slate.
    pub fn build(self) -> SlateMetadata {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_well_known_fields() {
        let slate = SlateMetadata::builder()
            .production("Landfall")
            .scene("4")
            .take(2)
            .build();
        assert_eq!(slate.production(), Some("Landfall"));
        assert_eq!(slate.scene(), Some("4"));
        assert_eq!(slate.take(), Some(2));
        assert_eq!(slate.len(), 3);
        assert!(slate.validate().is_ok());
    }

    #[test]
    fn test_shoot_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let slate = SlateMetadata::builder().shoot_date(date).build();
        assert_eq!(slate.get(SHOOT_DATE), Some(&json!("2024-03-09")));
        assert_eq!(slate.shoot_date(), Some(date));

        let mut garbled = SlateMetadata::new();
        garbled.insert(SHOOT_DATE, "yesterday");
        assert_eq!(garbled.shoot_date(), None);
    }

    #[test]
    fn test_take_from_text() {
        let mut slate = SlateMetadata::new();
        slate.insert(TAKE, "07");
        assert_eq!(slate.take(), Some(7));
    }

    #[test]
    fn test_validation_rejects_bad_slates() {
        assert!(SlateMetadata::new().validate().is_err());

        let mut blank_key = SlateMetadata::new();
        blank_key.insert(" ", "x");
        assert!(blank_key.validate().is_err());

        let nested = SlateMetadata::builder()
            .field("crew", json!(["dp", "ac"]))
            .build();
        assert!(nested.validate().is_err());
    }

    #[test]
    fn test_text_fields_are_sorted_and_flattened() {
        let slate = SlateMetadata::builder().take(12).scene("1B").build();
        assert_eq!(
            slate.to_text_fields(),
            vec![
                ("scene".to_string(), "1B".to_string()),
                ("take".to_string(), "12".to_string())
            ]
        );
    }

    #[test]
    fn test_from_hash_map() {
        let mut map = HashMap::new();
        map.insert("scene".to_string(), json!("9"));
        let slate = SlateMetadata::from(map);
        assert_eq!(slate.scene(), Some("9"));
        assert_eq!(serde_json::to_value(&slate).unwrap(), json!({"scene": "9"}));
    }
}
