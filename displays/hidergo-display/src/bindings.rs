//! Data bindings
//!
//! Named values the firmware publishes to the layout. Setting a binding to
//! a different value marks it changed; the layout redraws the elements
//! that depend on changed bindings and then clears the marks.

use heapless::{String, Vec};

/// Binding identifier, referenced by layout elements. 0 is reserved.
pub type BindingId = u8;

/// Longest string a binding can hold
pub const MAX_BINDING_STR: usize = 16;

/// Binding value
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Value {
    Int(i32),
    Bool(bool),
    Str(String<MAX_BINDING_STR>),
}

impl Value {
    /// Numeric view used by conditions and numeric parameters
    pub fn as_int(&self) -> i32 {
        match self {
            Value::Int(v) => *v,
            Value::Bool(b) => *b as i32,
            Value::Str(s) => s.len() as i32,
        }
    }
}

#[derive(Debug, Clone)]
struct Binding {
    name: &'static str,
    id: BindingId,
    value: Value,
    changed: bool,
}

/// Binding errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BindingError {
    /// Id 0 or already registered
    InvalidId,
    /// No room for another binding
    Full,
    /// Id not registered
    Unknown,
    /// String longer than `MAX_BINDING_STR`
    TooLong,
}

/// Fixed-capacity set of bindings
#[derive(Debug, Clone, Default)]
pub struct Bindings<const N: usize> {
    entries: Vec<Binding, N>,
}

impl<const N: usize> Bindings<N> {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a binding with its initial value
    pub fn add(
        &mut self,
        name: &'static str,
        id: BindingId,
        initial: Value,
    ) -> Result<(), BindingError> {
        if id == 0 || self.find(id).is_some() {
            return Err(BindingError::InvalidId);
        }
        self.entries
            .push(Binding {
                name,
                id,
                value: initial,
                changed: true,
            })
            .map_err(|_| BindingError::Full)
    }

    fn find(&self, id: BindingId) -> Option<usize> {
        self.entries.iter().position(|b| b.id == id)
    }

    /// Replace a value, marking the binding changed if it differs
    pub fn set(&mut self, id: BindingId, value: Value) -> Result<(), BindingError> {
        let index = self.find(id).ok_or(BindingError::Unknown)?;
        let entry = &mut self.entries[index];
        if entry.value != value {
            entry.value = value;
            entry.changed = true;
        }
        Ok(())
    }

    pub fn set_int(&mut self, id: BindingId, value: i32) -> Result<(), BindingError> {
        self.set(id, Value::Int(value))
    }

    pub fn set_bool(&mut self, id: BindingId, value: bool) -> Result<(), BindingError> {
        self.set(id, Value::Bool(value))
    }

    pub fn set_str(&mut self, id: BindingId, value: &str) -> Result<(), BindingError> {
        let s = String::try_from(value).map_err(|_| BindingError::TooLong)?;
        self.set(id, Value::Str(s))
    }

    /// Current value
    pub fn get(&self, id: BindingId) -> Option<&Value> {
        self.find(id).map(|i| &self.entries[i].value)
    }

    /// Id registered under `name`
    pub fn id_of(&self, name: &str) -> Option<BindingId> {
        self.entries.iter().find(|b| b.name == name).map(|b| b.id)
    }

    /// Whether the binding changed since the last [`Bindings::clear_changed`]
    pub fn is_changed(&self, id: BindingId) -> bool {
        self.find(id).is_some_and(|i| self.entries[i].changed)
    }

    pub fn any_changed(&self) -> bool {
        self.entries.iter().any(|b| b.changed)
    }

    pub fn clear_changed(&mut self) {
        for entry in self.entries.iter_mut() {
            entry.changed = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_lookup() {
        let mut b = Bindings::<4>::new();
        b.add("VIEW", 1, Value::Int(0)).unwrap();
        b.add("TIME", 5, Value::Str(String::new())).unwrap();

        assert_eq!(b.id_of("TIME"), Some(5));
        assert_eq!(b.get(1), Some(&Value::Int(0)));
        assert_eq!(b.add("DUP", 1, Value::Int(0)), Err(BindingError::InvalidId));
        assert_eq!(b.add("ZERO", 0, Value::Int(0)), Err(BindingError::InvalidId));
    }

    #[test]
    fn test_change_tracking() {
        let mut b = Bindings::<2>::new();
        b.add("BATT", 2, Value::Int(50)).unwrap();
        // New bindings start changed so the first draw includes them
        assert!(b.is_changed(2));
        b.clear_changed();

        b.set_int(2, 50).unwrap();
        assert!(!b.any_changed());
        b.set_int(2, 49).unwrap();
        assert!(b.is_changed(2));
        assert_eq!(b.set_int(9, 1), Err(BindingError::Unknown));
    }

    #[test]
    fn test_string_limit() {
        let mut b = Bindings::<1>::new();
        b.add("DATE", 6, Value::Str(String::new())).unwrap();
        assert_eq!(
            b.set_str(6, "a string that is far too long"),
            Err(BindingError::TooLong)
        );
        b.set_str(6, "17/10").unwrap();
        assert_eq!(b.get(6).unwrap().as_int(), 5);
    }

    #[test]
    fn test_capacity() {
        let mut b = Bindings::<1>::new();
        b.add("A", 1, Value::Bool(false)).unwrap();
        assert_eq!(b.add("B", 2, Value::Bool(false)), Err(BindingError::Full));
    }
}
