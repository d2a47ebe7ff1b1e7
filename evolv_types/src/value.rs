use derive_more::From;
use std::collections::BTreeMap;

/// An in-memory message, or any part of one.
///
/// Values carry no type information beyond their shape; they are checked against a
/// schema when they are planned for writing.
#[derive(From, PartialEq, Clone, Debug)]
pub enum Value {
    #[from(ignore)]
    Unit,
    Bool(bool),
    F64(f64),
    U64(u64),
    S64(i64),
    Bytes(Vec<u8>),
    Str(String),
    Struct(StructValue),
    Choice(ChoiceValue),
    Array(Vec<Value>),
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Self::Unit
    }
}

impl Value {
    /// The value as a reader observes it: choices never come back with their fallbacks.
    pub fn without_fallbacks(&self) -> Value {
        match self {
            Self::Struct(s) => Self::Struct(s.without_fallbacks()),
            Self::Choice(c) => Self::Choice(c.without_fallbacks()),
            Self::Array(elems) => Self::Array(elems.iter().map(Self::without_fallbacks).collect()),
            other => other.clone(),
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Unit => "Unit",
            Self::Bool(_) => "Bool",
            Self::F64(_) => "F64",
            Self::U64(_) => "U64",
            Self::S64(_) => "S64",
            Self::Bytes(_) => "Bytes",
            Self::Str(_) => "String",
            Self::Struct(_) => "Struct",
            Self::Choice(_) => "Choice",
            Self::Array(_) => "Array",
        }
    }
}

/// Field index to value. Absent optional fields are simply not in the map.
#[derive(From, PartialEq, Clone, Default, Debug)]
pub struct StructValue {
    pub fields: BTreeMap<u64, Value>,
}

impl StructValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<V: Into<Value>>(mut self, index: u64, value: V) -> Self {
        self.fields.insert(index, value.into());
        self
    }

    pub fn get(&self, index: u64) -> Option<&Value> {
        self.fields.get(&index)
    }

    fn without_fallbacks(&self) -> Self {
        let fields = self
            .fields
            .iter()
            .map(|(index, value)| (*index, value.without_fallbacks()))
            .collect();
        Self { fields }
    }
}

impl<const N: usize> From<[(u64, Value); N]> for StructValue {
    fn from(fields: [(u64, Value); N]) -> Self {
        Self {
            fields: BTreeMap::from(fields),
        }
    }
}

/// A selected variant, its payload, and (for non-required variants) the value readers
/// should use when they do not recognize the selection.
#[derive(PartialEq, Clone, Debug)]
pub struct ChoiceValue {
    pub index: u64,
    pub payload: Box<Value>,
    pub fallback: Option<Box<ChoiceValue>>,
}

impl ChoiceValue {
    pub fn new<V: Into<Value>>(index: u64, payload: V) -> Self {
        Self {
            index,
            payload: Box::new(payload.into()),
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: ChoiceValue) -> Self {
        self.fallback = Some(Box::new(fallback));
        self
    }

    /// Selections in the order a reader would try them.
    pub fn chain(&self) -> impl Iterator<Item = &ChoiceValue> {
        std::iter::successors(Some(self), |c| c.fallback.as_deref())
    }

    fn without_fallbacks(&self) -> Self {
        Self {
            index: self.index,
            payload: Box::new(self.payload.without_fallbacks()),
            fallback: None,
        }
    }
}
