//! Parameter Storage Types
//!
//! Name → value store backing the sensor configuration. Persistence is
//! left to the owner of the store.

use super::error::ParameterError;
use bitflags::bitflags;
use heapless::index_map::FnvIndexMap;
use heapless::String;

/// Maximum parameter name length
pub const PARAM_NAME_LEN: usize = 16;

/// Maximum number of parameters (power of two)
pub const MAX_PARAMS: usize = 64;

bitflags! {
    /// Parameter flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ParamFlags: u8 {
        /// Parameter is read-only
        const READ_ONLY = 0b00000010;
    }
}

/// Parameter value types
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Int(i32),
    Float(f32),
}

impl ParamValue {
    fn same_type(&self, other: &ParamValue) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }

    pub fn as_f32(&self) -> f32 {
        match *self {
            ParamValue::Bool(v) => f32::from(u8::from(v)),
            ParamValue::Int(v) => v as f32,
            ParamValue::Float(v) => v,
        }
    }

    pub fn as_i32(&self) -> i32 {
        match *self {
            ParamValue::Bool(v) => i32::from(v),
            ParamValue::Int(v) => v,
            ParamValue::Float(v) => v as i32,
        }
    }

    pub fn as_bool(&self) -> bool {
        match *self {
            ParamValue::Bool(v) => v,
            ParamValue::Int(v) => v != 0,
            ParamValue::Float(v) => v != 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    value: ParamValue,
    flags: ParamFlags,
}

/// Parameter store for configuration management
pub struct ParameterStore {
    entries: FnvIndexMap<String<PARAM_NAME_LEN>, Entry, MAX_PARAMS>,
}

fn key(name: &str) -> Result<String<PARAM_NAME_LEN>, ParameterError> {
    let mut key = String::new();
    key.push_str(name).map_err(|_| ParameterError::NameTooLong)?;
    Ok(key)
}

impl ParameterStore {
    pub fn new() -> Self {
        Self {
            entries: FnvIndexMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<ParamValue> {
        let key = key(name).ok()?;
        self.entries.get(&key).map(|entry| entry.value)
    }

    pub fn get_f32(&self, name: &str, default: f32) -> f32 {
        self.get(name).map_or(default, |v| v.as_f32())
    }

    pub fn get_i32(&self, name: &str, default: i32) -> i32 {
        self.get(name).map_or(default, |v| v.as_i32())
    }

    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        self.get(name).map_or(default, |v| v.as_bool())
    }

    /// Update a registered parameter. The value must have the registered
    /// type.
    pub fn set(&mut self, name: &str, value: ParamValue) -> Result<(), ParameterError> {
        let key = key(name)?;
        let entry = self.entries.get_mut(&key).ok_or(ParameterError::Unknown)?;
        if entry.flags.contains(ParamFlags::READ_ONLY) {
            return Err(ParameterError::ReadOnly);
        }
        if !entry.value.same_type(&value) {
            return Err(ParameterError::TypeMismatch);
        }
        entry.value = value;
        Ok(())
    }

    /// Register a new parameter with default value and flags
    ///
    /// If the parameter already exists, this is a no-op (idempotent).
    pub fn register(
        &mut self,
        name: &str,
        default_value: ParamValue,
        flags: ParamFlags,
    ) -> Result<(), ParameterError> {
        let key = key(name)?;
        if self.entries.contains_key(&key) {
            return Ok(());
        }
        self.entries
            .insert(
                key,
                Entry {
                    value: default_value,
                    flags,
                },
            )
            .map_err(|_| ParameterError::StoreFull)?;
        Ok(())
    }

    pub fn is_read_only(&self, name: &str) -> bool {
        key(name)
            .ok()
            .and_then(|key| self.entries.get(&key).map(|e| e.flags.contains(ParamFlags::READ_ONLY)))
            .unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ParamValue)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry.value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}
