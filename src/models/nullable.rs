// src/models/nullable.rs

//! Update payloads need three states for a clearable field: absent (keep),
//! `null` (clear) and a value (set). Fields use `Option<Option<T>>` with
//! `#[serde(default, deserialize_with = "nullable::deserialize")]`.

use serde::{Deserialize, Deserializer};

pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
