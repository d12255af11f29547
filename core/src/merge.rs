//! Merge utilities
//!
//! - [`merge_as_array`]: concatenates values into a compact, ordered sequence.
//!   Used to chain callbacks across resource defaults, action definitions and
//!   call-time overrides.
//! - [`merge_store`]: deep merge of JSON state.

use serde_json::Value;

/// A value that can take part in [`merge_as_array`]
///
/// Implementors describe which values are "falsy" (dropped from the result)
/// and how a value spreads into a sequence (sequence values contribute their
/// elements, scalars contribute themselves).
pub trait Mergeable: Sized {
    /// Whether this value is dropped by [`merge_as_array`]
    fn is_falsy(&self) -> bool;

    /// Spread this value one level
    ///
    /// Sequences yield their elements, everything else yields itself.
    fn spread(self) -> Vec<Self>;
}

impl Mergeable for Value {
    fn is_falsy(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Bool(b) => !b,
            Self::Number(n) => n.as_f64().is_none_or(|f| f == 0.0 || f.is_nan()),
            Self::String(s) => s.is_empty(),
            Self::Array(_) | Self::Object(_) => false,
        }
    }

    fn spread(self) -> Vec<Self> {
        match self {
            Self::Array(items) => items,
            other => vec![other],
        }
    }
}

/// Concatenate `target` and every source into one compact sequence
///
/// Order is preserved (target first, then sources in order). Sequence inputs
/// are flattened one level; falsy entries are removed.
///
/// # Example
///
/// ```
/// use rest_store_core::merge::merge_as_array;
/// use serde_json::{json, Value};
///
/// let merged = merge_as_array(
///     Value::Null,
///     [json!(false), json!("a"), Value::Null, json!(["b", "c"])],
/// );
/// assert_eq!(merged, vec![json!("a"), json!("b"), json!("c")]);
/// ```
#[must_use]
pub fn merge_as_array<T, I>(target: T, sources: I) -> Vec<T>
where
    T: Mergeable,
    I: IntoIterator<Item = T>,
{
    compact(std::iter::once(target).chain(sources))
}

/// Spread every item one level and drop the falsy ones
///
/// This is [`merge_as_array`] without a distinguished target, convenient for
/// joining two chains that are already sequences.
#[must_use]
pub fn compact<T, I>(items: I) -> Vec<T>
where
    T: Mergeable,
    I: IntoIterator<Item = T>,
{
    items
        .into_iter()
        .flat_map(Mergeable::spread)
        .filter(|item| !item.is_falsy())
        .collect()
}

/// Deep merge `sources` into `target`, later sources winning
///
/// Objects merge key by key, arrays merge index by index, anything else is
/// overwritten by the source value.
///
/// # Example
///
/// ```
/// use rest_store_core::merge::merge_store;
/// use serde_json::json;
///
/// let merged = merge_store(
///     json!({"user": {"name": "ada", "tags": [1, 2]}}),
///     [json!({"user": {"tags": [3]}, "pending": {}})],
/// );
/// assert_eq!(
///     merged,
///     json!({"user": {"name": "ada", "tags": [3, 2]}, "pending": {}})
/// );
/// ```
#[must_use]
pub fn merge_store<I>(mut target: Value, sources: I) -> Value
where
    I: IntoIterator<Item = Value>,
{
    for source in sources {
        merge_value(&mut target, source);
    }
    target
}

fn merge_value(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(slot) => merge_value(slot, value),
                    None => {
                        target.insert(key, value);
                    },
                }
            }
        },
        (Value::Array(target), Value::Array(source)) => {
            for (index, value) in source.into_iter().enumerate() {
                match target.get_mut(index) {
                    Some(slot) => merge_value(slot, value),
                    None => target.push(value),
                }
            }
        },
        (target, source) => *target = source,
    }
}
