//! Aligned, deliberately misalignable benchmark buffers
//!
//! [`AlignedBuffer`] owns one heap allocation whose first element sits at
//! `base + misalign`, where `base` is aligned to the requested boundary. So
//! `(addr - misalign) % align == 0` for the data pointer. The allocation is
//! released exactly once in `Drop`, which also covers early returns.
//!
//! [`BufferSet`] provisions the `x`/`y`/`z` triple used by the throughput
//! kernels as three independent allocations, so they never overlap.

use std::{
    alloc::{alloc_zeroed, dealloc, Layout},
    fmt,
    marker::PhantomData,
    mem::{align_of, size_of},
    ops::{Deref, DerefMut},
    ptr::NonNull,
    slice,
};

use rand::{distributions::Uniform, rngs::StdRng, Rng, SeedableRng};

use crate::{
    element::Element,
    error::{HwprobeError, Result},
};

/// Default buffer alignment: one x86 cache line
pub const DEFAULT_ALIGN: usize = 64;

/// Check an alignment/misalignment pair for element type `T`
///
/// # Errors
///
/// Returns [`HwprobeError::InvalidConfig`] when `align` is not a power of two,
/// is smaller than `T`'s natural alignment, or when `misalign` is not a
/// multiple of `size_of::<T>()`.
pub fn check_placement<T>(align: usize, misalign: usize) -> Result<()> {
    if align == 0 || !align.is_power_of_two() {
        return Err(HwprobeError::config(
            "align",
            format!("{align} is not a power of two"),
        ));
    }
    if align < align_of::<T>() {
        return Err(HwprobeError::config(
            "align",
            format!("{align} is below the element alignment {}", align_of::<T>()),
        ));
    }
    if misalign % size_of::<T>() != 0 {
        return Err(HwprobeError::config(
            "misalign",
            format!(
                "{misalign} bytes is not a multiple of the element size {}",
                size_of::<T>()
            ),
        ));
    }
    Ok(())
}

/// Heap buffer of `T` with a fixed alignment and byte offset
pub struct AlignedBuffer<T: Element> {
    base: NonNull<u8>,
    layout: Layout,
    data: NonNull<T>,
    len: usize,
    align: usize,
    misalign: usize,
    _marker: PhantomData<T>,
}

// SAFETY: the buffer exclusively owns its allocation; `T: Element` is Send + Sync.
unsafe impl<T: Element> Send for AlignedBuffer<T> {}
// SAFETY: shared access only hands out `&[T]`.
unsafe impl<T: Element> Sync for AlignedBuffer<T> {}

impl<T: Element> AlignedBuffer<T> {
    /// Allocate `len` zeroed elements
    ///
    /// # Errors
    ///
    /// [`HwprobeError::InvalidConfig`] for a bad alignment pair or a size that
    /// overflows `usize`; [`HwprobeError::AllocationFailed`] when the
    /// allocator returns null.
    pub fn zeroed(len: usize, align: usize, misalign: usize) -> Result<Self> {
        check_placement::<T>(align, misalign)?;

        let bytes = len
            .checked_mul(size_of::<T>())
            .and_then(|b| b.checked_add(misalign))
            .ok_or_else(|| HwprobeError::config("len", format!("{len} elements overflow")))?;
        // Zero-sized allocations are not allowed; keep at least one byte.
        // `align` is already checked, so a rejected layout means the size
        // exceeds what any allocation can hold.
        let layout = Layout::from_size_align(bytes.max(1), align)
            .map_err(|_| HwprobeError::AllocationFailed { bytes, align })?;

        // SAFETY: layout has non-zero size.
        let raw = unsafe { alloc_zeroed(layout) };
        let base = NonNull::new(raw).ok_or(HwprobeError::AllocationFailed { bytes, align })?;

        // SAFETY: misalign <= bytes, so the offset stays inside the allocation,
        // and misalign is a multiple of size_of::<T>() on an align_of::<T>()
        // aligned base, so the result is aligned for T.
        let data = unsafe { NonNull::new_unchecked(base.as_ptr().add(misalign).cast::<T>()) };

        Ok(Self {
            base,
            layout,
            data,
            len,
            align,
            misalign,
            _marker: PhantomData,
        })
    }

    /// Allocate `len` elements all set to `value`
    ///
    /// # Errors
    ///
    /// Same as [`AlignedBuffer::zeroed`].
    pub fn filled(len: usize, align: usize, misalign: usize, value: T) -> Result<Self> {
        let mut buf = Self::zeroed(len, align, misalign)?;
        buf.fill(value);
        Ok(buf)
    }

    /// Number of elements
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the buffer holds no elements
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Requested alignment in bytes
    #[must_use]
    pub fn alignment(&self) -> usize {
        self.align
    }

    /// Extra byte offset applied after alignment
    #[must_use]
    pub fn misalignment(&self) -> usize {
        self.misalign
    }

    /// Address of the first element
    #[must_use]
    pub fn addr(&self) -> usize {
        self.data.as_ptr() as usize
    }

    /// View as a slice
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: data is valid and initialised for len elements.
        unsafe { slice::from_raw_parts(self.data.as_ptr(), self.len) }
    }

    /// View as a mutable slice
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: data is valid and initialised for len elements; &mut self is unique.
        unsafe { slice::from_raw_parts_mut(self.data.as_ptr(), self.len) }
    }
}

impl<T: Element> Drop for AlignedBuffer<T> {
    fn drop(&mut self) {
        // SAFETY: base was returned by alloc_zeroed with this exact layout.
        unsafe { dealloc(self.base.as_ptr(), self.layout) };
    }
}

impl<T: Element> Deref for AlignedBuffer<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Element> DerefMut for AlignedBuffer<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Element> fmt::Debug for AlignedBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlignedBuffer")
            .field("len", &self.len)
            .field("align", &self.align)
            .field("misalign", &self.misalign)
            .field("addr", &format_args!("{:#x}", self.addr()))
            .finish()
    }
}

/// The `x`, `y`, `z` operands of the throughput kernels
#[derive(Debug)]
pub struct BufferSet<T: Element> {
    /// First input
    pub x: AlignedBuffer<T>,
    /// Second input, updated in place by saxpy and written by stencil3
    pub y: AlignedBuffer<T>,
    /// Output of the elementwise multiply
    pub z: AlignedBuffer<T>,
}

impl<T: Element> BufferSet<T> {
    /// Allocate three zeroed buffers of `len` elements each
    ///
    /// # Errors
    ///
    /// Propagates [`AlignedBuffer::zeroed`] failures.
    pub fn provision(len: usize, align: usize, misalign: usize) -> Result<Self> {
        Ok(Self {
            x: AlignedBuffer::zeroed(len, align, misalign)?,
            y: AlignedBuffer::zeroed(len, align, misalign)?,
            z: AlignedBuffer::zeroed(len, align, misalign)?,
        })
    }

    /// Fill `x` and `y` with uniform values in `[1, 2)` from a seeded generator
    ///
    /// Draws alternate between `x[i]` and `y[i]`, so the contents depend only
    /// on the seed. `z` is reset to zero. The range keeps every input away
    /// from zero and from subnormals.
    pub fn init_random(&mut self, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        let dist = Uniform::new(T::one(), T::one() + T::one());
        for (xi, yi) in self.x.iter_mut().zip(self.y.iter_mut()) {
            *xi = rng.sample(&dist);
            *yi = rng.sample(&dist);
        }
        self.z.fill(T::zero());
    }

    /// Elements per buffer
    #[must_use]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Whether the buffers are empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}
