use std::ops::{Deref, DerefMut};

/// A value followed by `N` 32-bit filler words, used where a shader
/// declares a stride wider than the element.
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct Padded<T, const N: usize> {
    pub v: T,
    pub pad: [f32; N],
}

impl<T, const N: usize> Padded<T, N> {
    pub fn new(v: T) -> Self {
        Self { v, pad: [0.0; N] }
    }

    pub fn into_inner(self) -> T {
        self.v
    }
}

impl<T: Default, const N: usize> Default for Padded<T, N> {
    fn default() -> Self {
        Self::new(Default::default())
    }
}

impl<T, const N: usize> From<T> for Padded<T, N> {
    fn from(v: T) -> Self {
        Self::new(v)
    }
}

impl<T, const N: usize> Deref for Padded<T, N> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.v
    }
}

impl<T, const N: usize> DerefMut for Padded<T, N> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.v
    }
}

#[cfg(test)]
mod tests {
    use std::mem::size_of;

    use super::*;

    #[test]
    fn sizes() {
        assert_eq!(size_of::<Padded<[f32; 3], 1>>(), 16);
        assert_eq!(size_of::<Padded<f32, 3>>(), 16);
        assert_eq!(size_of::<[Padded<[f32; 3], 1>; 3]>(), 48);
        assert_eq!(size_of::<Padded<[f32; 2], 2>>(), 16);
    }

    #[test]
    fn wraps_value() {
        let mut col: Padded<[f32; 3], 1> = [1.0, 2.0, 3.0].into();
        col[1] = 5.0;
        assert_eq!(*col, [1.0, 5.0, 3.0]);
        assert_eq!(col.pad, [0.0]);
        let zero = Padded::<u32, 2>::default();
        assert_eq!(zero.into_inner(), 0);
    }
}
