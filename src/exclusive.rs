//! An [Exclusive] owns its payload outright: it can be moved but never shared.
//!
//! This is what a cached resource uses for parts which must live exactly as long as the resource itself, for example
//! the encoded stream a song decodes from.  Unlike a bare `Box` it has a null state, so a resource can release the part
//! early or be built before the part is available.
use std::fmt;
use std::ops::{Deref, DerefMut};

pub struct Exclusive<T: ?Sized> {
    value: Option<Box<T>>,
}

impl<T> Exclusive<T> {
    pub fn new(value: T) -> Exclusive<T> {
        Exclusive::from_box(Box::new(value))
    }
}

impl<T: ?Sized> Exclusive<T> {
    pub fn from_box(value: Box<T>) -> Exclusive<T> {
        Exclusive { value: Some(value) }
    }

    pub fn null() -> Exclusive<T> {
        Exclusive { value: None }
    }

    pub fn is_null(&self) -> bool {
        self.value.is_none()
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_deref()
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.value.as_deref_mut()
    }

    /// Move the payload out, leaving this handle null.
    pub fn take(&mut self) -> Exclusive<T> {
        Exclusive {
            value: self.value.take(),
        }
    }

    /// Install a new payload, returning the old one (which is dropped if the caller ignores it).
    pub fn replace(&mut self, value: Box<T>) -> Exclusive<T> {
        Exclusive {
            value: self.value.replace(value),
        }
    }

    pub fn into_box(self) -> Option<Box<T>> {
        self.value
    }
}

impl<T: ?Sized> Default for Exclusive<T> {
    fn default() -> Self {
        Exclusive::null()
    }
}

impl<T: ?Sized> From<Box<T>> for Exclusive<T> {
    fn from(value: Box<T>) -> Self {
        Exclusive::from_box(value)
    }
}

impl<T: ?Sized> Deref for Exclusive<T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self.get() {
            Some(x) => x,
            None => panic!("Dereferenced a null exclusive handle"),
        }
    }
}

impl<T: ?Sized> DerefMut for Exclusive<T> {
    fn deref_mut(&mut self) -> &mut T {
        match self.get_mut() {
            Some(x) => x,
            None => panic!("Dereferenced a null exclusive handle"),
        }
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Exclusive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get() {
            Some(x) => f.debug_tuple("Exclusive").field(&x).finish(),
            None => f.write_str("Exclusive(null)"),
        }
    }
}
