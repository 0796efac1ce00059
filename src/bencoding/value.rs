use std::fmt::{self, Debug, Formatter};

/// A decoded bencode value. Dictionary entries are kept in the order they were encoded in, so a
/// decoded value re-encodes to the exact bytes it was read from.
#[derive(PartialEq, Eq, Clone)]
pub enum Value {
    String(Vec<u8>),
    Integer(i64),
    List(Vec<Value>),
    Dictionary(Vec<(Vec<u8>, Value)>),
}

#[cfg(test)]
impl Value {
    pub fn string(value: &str) -> Self {
        Self::String(value.as_bytes().to_vec())
    }

    pub fn list() -> Self {
        Self::List(Vec::new())
    }

    pub fn dictionary() -> Self {
        Self::Dictionary(Vec::new())
    }

    pub fn with_value(mut self, value: Value) -> Self {
        if let Self::List(values) = &mut self {
            values.push(value);
        }
        self
    }

    pub fn with_entry(mut self, key: &str, value: Value) -> Self {
        if let Self::Dictionary(entries) = &mut self {
            entries.push((key.as_bytes().to_vec(), value));
        }
        self
    }
}

impl Value {
    /// Looks up the first entry with the given key. Returns `None` for missing keys and for
    /// values that are not dictionaries.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Dictionary(entries) => entries
                .iter()
                .find(|(k, _)| k == key.as_bytes())
                .map(|(_, value)| value),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::String(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes()
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(integer) => Some(*integer),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(values) => Some(values),
            _ => None,
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(bytes) => match std::str::from_utf8(bytes) {
                Ok(string) if bytes.len() <= 64 => write!(f, "{:?}", string),
                _ => write!(f, "<{} bytes>", bytes.len()),
            },
            Self::Integer(integer) => write!(f, "{}", integer),
            Self::List(values) => f.debug_list().entries(values).finish(),
            Self::Dictionary(entries) => f
                .debug_map()
                .entries(
                    entries
                        .iter()
                        .map(|(key, value)| (String::from_utf8_lossy(key), value)),
                )
                .finish(),
        }
    }
}
