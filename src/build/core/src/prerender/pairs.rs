/* src/build/core/src/prerender/pairs.rs */

// Insertion-ordered map that crosses the process boundary as `[[key, value], ...]`.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{Error as _, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairMap<K, V> {
  entries: Vec<(K, V)>,
}

impl<K, V> Default for PairMap<K, V> {
  fn default() -> Self {
    Self { entries: Vec::new() }
  }
}

impl<K: PartialEq, V> PairMap<K, V> {
  pub fn new() -> Self {
    Self::default()
  }

  /// Insert or replace. A replaced entry keeps its original position.
  pub fn insert(&mut self, key: K, value: V) -> Option<V> {
    if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == key) {
      return Some(std::mem::replace(&mut slot.1, value));
    }
    self.entries.push((key, value));
    None
  }

  pub fn get<Q>(&self, key: &Q) -> Option<&V>
  where
    K: std::borrow::Borrow<Q>,
    Q: PartialEq + ?Sized,
  {
    self.entries.iter().find(|(k, _)| k.borrow() == key).map(|(_, v)| v)
  }

  pub fn contains_key<Q>(&self, key: &Q) -> bool
  where
    K: std::borrow::Borrow<Q>,
    Q: PartialEq + ?Sized,
  {
    self.get(key).is_some()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
    self.entries.iter().map(|(k, v)| (k, v))
  }

  pub fn keys(&self) -> impl Iterator<Item = &K> {
    self.entries.iter().map(|(k, _)| k)
  }
}

impl<K: PartialEq, V> FromIterator<(K, V)> for PairMap<K, V> {
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    let mut map = Self::new();
    for (k, v) in iter {
      map.insert(k, v);
    }
    map
  }
}

impl<K: Serialize, V: Serialize> Serialize for PairMap<K, V> {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(self.entries.len()))?;
    for (k, v) in &self.entries {
      seq.serialize_element(&(k, v))?;
    }
    seq.end()
  }
}

struct PairMapVisitor<K, V>(PhantomData<(K, V)>);

impl<'de, K, V> Visitor<'de> for PairMapVisitor<K, V>
where
  K: Deserialize<'de> + PartialEq + fmt::Debug,
  V: Deserialize<'de>,
{
  type Value = PairMap<K, V>;

  fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
    f.write_str("an array of [key, value] pairs")
  }

  fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
    let mut map = PairMap::new();
    while let Some((k, v)) = seq.next_element::<(K, V)>()? {
      if map.contains_key(&k) {
        return Err(A::Error::custom(format!("duplicate key {k:?}")));
      }
      map.entries.push((k, v));
    }
    Ok(map)
  }
}

impl<'de, K, V> Deserialize<'de> for PairMap<K, V>
where
  K: Deserialize<'de> + PartialEq + fmt::Debug,
  V: Deserialize<'de>,
{
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    deserializer.deserialize_seq(PairMapVisitor(PhantomData))
  }
}
