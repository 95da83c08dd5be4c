//! Property-list documents.
//!
//! Grammar bundles ship as property lists (`.tmLanguage`, `.plist`) or their
//! JSON rendering (`.tmLanguage.json`). The grammar table never sees file
//! text; it consumes the already-parsed tree modelled here.
//!
//! * [`Plist`]: an insertion-ordered dictionary.
//! * [`PlistValue`]: a single value inside a dictionary or array.
//!
//! JSON input is decoded through serde. `null` entries are dropped while
//! decoding, so consumers never see an "absent" value inside a document.

use std::fmt;
use std::io::Read;

use indexmap::IndexMap;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use thiserror::Error;

/// Errors from decoding a document.
#[derive(Debug, Error)]
pub enum PlistError {
	#[error("failed to decode JSON document: {0}")]
	Json(#[from] serde_json::Error),

	#[error("expected a dictionary at the document root")]
	NotADictionary,
}

/// Result type for document decoding.
pub type Result<T> = std::result::Result<T, PlistError>;

/// A value stored in a property list.
#[derive(Debug, Clone, PartialEq)]
pub enum PlistValue {
	String(String),
	Integer(i64),
	Real(f64),
	Bool(bool),
	Array(Vec<PlistValue>),
	Dict(Plist),
}

impl PlistValue {
	/// Returns the string payload, or `None` for any other kind.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			PlistValue::String(s) => Some(s),
			_ => None,
		}
	}

	/// Returns the nested dictionary, or `None` for any other kind.
	pub fn as_dict(&self) -> Option<&Plist> {
		match self {
			PlistValue::Dict(d) => Some(d),
			_ => None,
		}
	}

	/// Returns the array items, or `None` for any other kind.
	pub fn as_array(&self) -> Option<&[PlistValue]> {
		match self {
			PlistValue::Array(items) => Some(items),
			_ => None,
		}
	}

	/// Unwraps a dictionary, rejecting every other kind.
	pub fn into_dict(self) -> Result<Plist> {
		match self {
			PlistValue::Dict(d) => Ok(d),
			_ => Err(PlistError::NotADictionary),
		}
	}
}

impl From<&str> for PlistValue {
	fn from(value: &str) -> Self {
		PlistValue::String(value.to_owned())
	}
}

impl From<String> for PlistValue {
	fn from(value: String) -> Self {
		PlistValue::String(value)
	}
}

impl From<Plist> for PlistValue {
	fn from(value: Plist) -> Self {
		PlistValue::Dict(value)
	}
}

impl From<Vec<PlistValue>> for PlistValue {
	fn from(value: Vec<PlistValue>) -> Self {
		PlistValue::Array(value)
	}
}

/// An insertion-ordered property-list dictionary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plist {
	entries: IndexMap<String, PlistValue>,
}

impl Plist {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, key: &str) -> Option<&PlistValue> {
		self.entries.get(key)
	}

	/// Returns the string stored under `key`, if it is one.
	pub fn get_str(&self, key: &str) -> Option<&str> {
		self.get(key).and_then(PlistValue::as_str)
	}

	pub fn contains(&self, key: &str) -> bool {
		self.entries.contains_key(key)
	}

	/// Iterates entries in document order.
	pub fn entries(&self) -> impl Iterator<Item = (&str, &PlistValue)> {
		self.entries.iter().map(|(k, v)| (k.as_str(), v))
	}

	/// Inserts or replaces `key`, returning the previous value.
	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<PlistValue>) -> Option<PlistValue> {
		self.entries.insert(key.into(), value.into())
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Decodes a JSON document whose root is an object.
	///
	/// Text is decoded straight into [`PlistValue`], so key order is the
	/// order of the input.
	pub fn from_json_str(input: &str) -> Result<Self> {
		serde_json::from_str::<PlistValue>(input)?.into_dict()
	}

	pub fn from_json_slice(input: &[u8]) -> Result<Self> {
		serde_json::from_slice::<PlistValue>(input)?.into_dict()
	}

	pub fn from_reader(reader: impl Read) -> Result<Self> {
		serde_json::from_reader::<_, PlistValue>(reader)?.into_dict()
	}

	/// Converts an already-decoded JSON value.
	///
	/// `serde_json` is built with `preserve_order`, so objects built with
	/// `json!` keep their written order here too.
	pub fn from_json_value(value: serde_json::Value) -> Result<Self> {
		serde_json::from_value::<PlistValue>(value)?.into_dict()
	}
}

impl<K: Into<String>, V: Into<PlistValue>> FromIterator<(K, V)> for Plist {
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		Self {
			entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
		}
	}
}

impl<'de> Deserialize<'de> for PlistValue {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
		deserializer.deserialize_any(ValueVisitor)
	}
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
	type Value = PlistValue;

	fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("a property-list value")
	}

	fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<PlistValue, E> {
		Ok(PlistValue::Bool(v))
	}

	fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<PlistValue, E> {
		Ok(PlistValue::Integer(v))
	}

	fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<PlistValue, E> {
		Ok(i64::try_from(v).map_or(PlistValue::Real(v as f64), PlistValue::Integer))
	}

	fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<PlistValue, E> {
		Ok(PlistValue::Real(v))
	}

	fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<PlistValue, E> {
		Ok(PlistValue::String(v.to_owned()))
	}

	fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<PlistValue, E> {
		Ok(PlistValue::String(v))
	}

	fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<PlistValue, A::Error> {
		let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
		while let Some(item) = seq.next_element::<Option<PlistValue>>()? {
			items.extend(item);
		}
		Ok(PlistValue::Array(items))
	}

	fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<PlistValue, A::Error> {
		let mut entries = IndexMap::with_capacity(map.size_hint().unwrap_or(0));
		while let Some((key, value)) = map.next_entry::<String, Option<PlistValue>>()? {
			if let Some(value) = value {
				entries.insert(key, value);
			}
		}
		Ok(PlistValue::Dict(Plist { entries }))
	}
}
