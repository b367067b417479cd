//! Tensor containers for the analog tile array
//!
//! An [`AnalogMatrix`] or [`AnalogVector`] pairs one host tensor with one
//! device tensor for its whole lifetime. The host side is either owned by
//! the container or borrowed from the caller - two explicit construction
//! modes, not a runtime flag. The device side is always owned, allocated
//! once at the fixed device geometry, and overwritten by every
//! `transfer_to_device`.
//!
//! The transfer policy (identity copy vs quantize-and-saturate) is chosen
//! once at construction from the element-type pair; see
//! [`crate::quantize::TransferMode`].

mod matrix;
mod vector;

pub use matrix::AnalogMatrix;
pub use vector::AnalogVector;

use num_traits::Zero;

use crate::element::DeviceElement;
use crate::error::{EscalarError, Result};

/// Host-side storage: container-owned or caller-owned.
#[derive(Debug)]
pub(crate) enum HostStorage<'a, T> {
    /// Allocated and freed by the container.
    Owned(Vec<T>),
    /// Caller-supplied; the caller guarantees it outlives the container.
    Borrowed(&'a mut [T]),
}

impl<T> HostStorage<'_, T> {
    pub(crate) fn as_slice(&self) -> &[T] {
        match self {
            HostStorage::Owned(v) => v,
            HostStorage::Borrowed(s) => s,
        }
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [T] {
        match self {
            HostStorage::Owned(v) => v,
            HostStorage::Borrowed(s) => s,
        }
    }
}

/// Allocate a zero-filled buffer, surfacing exhaustion as a typed error
/// instead of aborting the process.
pub(crate) fn try_alloc_zeroed<E: Zero + Clone>(
    len: usize,
    buffer: &'static str,
) -> Result<Vec<E>> {
    let mut v: Vec<E> = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| EscalarError::OutOfMemory {
            requested_bytes: len * std::mem::size_of::<E>(),
            buffer,
        })?;
    v.resize(len, E::zero());
    Ok(v)
}

/// Allocate the device buffer for a container.
pub(crate) fn alloc_device<Q: DeviceElement>(len: usize) -> Result<Vec<Q>> {
    try_alloc_zeroed(len, "device buffer")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_storage_owned() {
        let mut s: HostStorage<'_, f32> = HostStorage::Owned(vec![1.0, 2.0]);
        assert_eq!(s.as_slice(), &[1.0, 2.0]);
        s.as_mut_slice()[0] = 3.0;
        assert_eq!(s.as_slice(), &[3.0, 2.0]);
    }

    #[test]
    fn test_host_storage_borrowed() {
        let mut data = [1i32, 2, 3];
        let mut s = HostStorage::Borrowed(&mut data[..]);
        s.as_mut_slice()[2] = 9;
        drop(s);
        assert_eq!(data, [1, 2, 9]);
    }

    #[test]
    fn test_alloc_device_zeroed() {
        let v: Vec<i8> = alloc_device(16).unwrap();
        assert_eq!(v.len(), 16);
        assert!(v.iter().all(|&q| q == 0));
    }
}
