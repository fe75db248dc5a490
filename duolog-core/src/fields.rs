use serde::Serialize;
use serde_json::Value;

/// Ordered key/value pairs attached to one event.
///
/// Keys keep their insertion order in both the structured record and the
/// console block. Values are anything `serde` can serialize.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields(Vec<(String, Value)>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a pair, builder style.
    pub fn with<K: Into<String>, V: Serialize>(mut self, key: K, value: V) -> Self {
        self.push(key, value);
        self
    }

    /// Appends a pair.
    pub fn push<K: Into<String>, V: Serialize>(&mut self, key: K, value: V) {
        self.0.push((key.into(), to_value(value)));
    }

    /// Builds fields from a flat list of alternating keys and values.
    ///
    /// # Panics
    /// If the list has an odd length or a key position does not hold a
    /// string. Both are programming errors at the call site.
    #[track_caller]
    pub fn from_flat(keys_and_values: Vec<Value>) -> Self {
        if keys_and_values.len() % 2 != 0 {
            panic!("len() not even - keys and values: {keys_and_values:?}");
        }
        let mut pairs = Vec::with_capacity(keys_and_values.len() / 2);
        let mut items = keys_and_values.into_iter();
        while let (Some(key), Some(value)) = (items.next(), items.next()) {
            match key {
                Value::String(key) => pairs.push((key, value)),
                other => panic!("key must be a string, got {other}"),
            }
        }
        Self(pairs)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl<K: Into<String>, V: Serialize> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Fields::new();
        for (key, value) in iter {
            fields.push(key, value);
        }
        fields
    }
}

// A value that fails to serialize still gets recorded, as a marker string.
fn to_value<V: Serialize>(value: V) -> Value {
    serde_json::to_value(value)
        .unwrap_or_else(|err| Value::String(format!("<unserializable: {err}>")))
}

/// Builds [`Fields`] from `key => value` pairs.
///
/// ```rust
/// use duolog_core::fields;
///
/// let fields = fields! { "key" => "value", "attempt" => 3 };
/// assert_eq!(fields.len(), 2);
/// ```
#[macro_export]
macro_rules! fields {
    () => {
        $crate::Fields::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut fields = $crate::Fields::new();
        $(fields.push($key, $value);)+
        fields
    }};
}
