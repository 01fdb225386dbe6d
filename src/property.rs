use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Well known property keys
pub mod keys {
    pub const INDEX_ORIGIN: &str = "indexOrigin";
    pub const VOXEL_SIZE: &str = "voxelSize";
    pub const ACQUISITION_NUMBER: &str = "acquisitionNumber";
    pub const ROW_VEC: &str = "rowVec";
    pub const COLUMN_VEC: &str = "columnVec";
}

/// A single tagged property value
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Vector([f64; 3]),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(v) => write!(f, "{v}"),
            PropertyValue::Int(v) => write!(f, "{v}"),
            PropertyValue::Float(v) => write!(f, "{v}"),
            PropertyValue::Text(v) => write!(f, "{v}"),
            PropertyValue::Vector([x, y, z]) => write!(f, "({x}, {y}, {z})"),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Int(value.into())
    }
}

impl From<u32> for PropertyValue {
    fn from(value: u32) -> Self {
        PropertyValue::Int(value.into())
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int(value)
    }
}

impl From<f32> for PropertyValue {
    fn from(value: f32) -> Self {
        PropertyValue::Float(value.into())
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Float(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_owned())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

impl From<[f64; 3]> for PropertyValue {
    fn from(value: [f64; 3]) -> Self {
        PropertyValue::Vector(value)
    }
}

impl TryFrom<&PropertyValue> for bool {
    type Error = ();

    fn try_from(value: &PropertyValue) -> Result<Self, Self::Error> {
        match value {
            PropertyValue::Bool(v) => Ok(*v),
            _ => Err(()),
        }
    }
}

impl TryFrom<&PropertyValue> for i64 {
    type Error = ();

    fn try_from(value: &PropertyValue) -> Result<Self, Self::Error> {
        match value {
            PropertyValue::Int(v) => Ok(*v),
            _ => Err(()),
        }
    }
}

impl TryFrom<&PropertyValue> for f64 {
    type Error = ();

    fn try_from(value: &PropertyValue) -> Result<Self, Self::Error> {
        match value {
            PropertyValue::Float(v) => Ok(*v),
            PropertyValue::Int(v) => Ok(*v as f64),
            _ => Err(()),
        }
    }
}

impl TryFrom<&PropertyValue> for String {
    type Error = ();

    fn try_from(value: &PropertyValue) -> Result<Self, Self::Error> {
        match value {
            PropertyValue::Text(v) => Ok(v.clone()),
            _ => Err(()),
        }
    }
}

impl TryFrom<&PropertyValue> for [f64; 3] {
    type Error = ();

    fn try_from(value: &PropertyValue) -> Result<Self, Self::Error> {
        match value {
            PropertyValue::Vector(v) => Ok(*v),
            _ => Err(()),
        }
    }
}

/// Ordered key/value store attached to chunks and images
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertySet {
    entries: BTreeMap<String, PropertyValue>,
}

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, returning the previous value if there was one
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> Option<PropertyValue> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.entries.get(key)
    }

    /// Typed read. Returns `None` if the key is absent or holds another type.
    pub fn get_as<'a, V>(&'a self, key: &str) -> Option<V>
    where
        V: TryFrom<&'a PropertyValue>,
    {
        self.entries.get(key).and_then(|v| V::try_from(v).ok())
    }

    pub fn remove(&mut self, key: &str) -> Option<PropertyValue> {
        self.entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keys whose values differ between `self` and `other`, including keys
    /// present on only one side.
    pub fn diff(&self, other: &PropertySet) -> BTreeSet<String> {
        let mut ret: BTreeSet<String> = self
            .entries
            .iter()
            .filter(|(key, value)| other.get(key) != Some(value))
            .map(|(key, _)| key.clone())
            .collect();
        ret.extend(
            other
                .entries
                .keys()
                .filter(|key| !self.entries.contains_key(*key))
                .cloned(),
        );
        ret
    }

    pub fn erase<'a>(&mut self, keys: impl IntoIterator<Item = &'a String>) {
        for key in keys {
            self.entries.remove(key);
        }
    }

    /// Copy every entry of `other` whose key is not yet present.
    /// Returns the number of entries added.
    pub fn join(&mut self, other: &PropertySet) -> usize {
        let mut added = 0;
        for (key, value) in &other.entries {
            if !self.entries.contains_key(key) {
                self.entries.insert(key.clone(), value.clone());
                added += 1;
            }
        }
        added
    }

    /// The subset of `required` that is not present
    pub fn missing<S: AsRef<str>>(&self, required: &[S]) -> Vec<String> {
        required
            .iter()
            .map(AsRef::as_ref)
            .filter(|key| !self.has(key))
            .map(str::to_owned)
            .collect()
    }
}
