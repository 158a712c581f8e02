//! Dynamic uniform buffer for per-draw override values.
//!
//! Every override draw of a frame gets its own aligned slot, selected with a dynamic
//! offset, so successive surface binds inside one render pass keep independent colors.
//! Slots are written to the queue as they are pushed. Queue writes land before the
//! next submission, so all draws of the frame observe their own values.

use crate::context::Context;
use bytemuck::Pod;
use std::mem;

/// A dynamic uniform buffer handing out one slot per push.
///
/// When a frame needs more slots than the buffer holds, a larger buffer replaces it
/// and [`Self::push`] reports the reallocation; draws already recorded keep the old
/// buffer alive and still read their own slots.
///
/// # Usage
///
/// ```ignore
/// let mut buffer = DynamicUniformBuffer::<MyUniforms>::new(&ctxt, "my_uniforms", 256);
///
/// // In render loop:
/// buffer.clear();
/// for object in objects {
///     let (offset, reallocated) = buffer.push(&ctxt, &object.uniforms);
///     if reallocated {
///         // recreate the bind group referencing `buffer.buffer()`
///     }
///     // draw with `offset`
/// }
/// ```
pub struct DynamicUniformBuffer<T: Pod> {
    /// GPU buffer
    buffer: wgpu::Buffer,
    /// Current capacity in entries
    capacity: usize,
    /// Size of each entry (aligned)
    aligned_size: u64,
    /// Number of entries pushed since the last clear, in the current buffer
    count: usize,
    /// Label for debugging
    label: &'static str,
    /// Marker for the uniform type
    _marker: std::marker::PhantomData<T>,
}

impl<T: Pod> DynamicUniformBuffer<T> {
    /// Creates a new dynamic uniform buffer with room for `initial_capacity` entries.
    ///
    /// # Arguments
    /// * `ctxt` - The GPU context
    /// * `label` - Debug label for the GPU buffer
    /// * `initial_capacity` - Initial number of entries to allocate space for
    pub fn new(ctxt: &Context, label: &'static str, initial_capacity: usize) -> Self {
        let alignment = ctxt.device.limits().min_uniform_buffer_offset_alignment as u64;

        // Calculate aligned size for each entry
        let unaligned_size = mem::size_of::<T>() as u64;
        let aligned_size = unaligned_size.div_ceil(alignment) * alignment;
        let capacity = initial_capacity.max(1);

        Self {
            buffer: Self::allocate(ctxt, label, aligned_size, capacity),
            capacity,
            aligned_size,
            count: 0,
            label,
            _marker: std::marker::PhantomData,
        }
    }

    fn allocate(ctxt: &Context, label: &str, aligned_size: u64, capacity: usize) -> wgpu::Buffer {
        ctxt.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: aligned_size * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Returns the aligned size of each entry.
    #[inline]
    pub fn aligned_size(&self) -> u64 {
        self.aligned_size
    }

    /// Returns the unaligned size of each entry, as bound by shaders.
    #[inline]
    pub fn binding_size(&self) -> wgpu::BufferSize {
        wgpu::BufferSize::new(mem::size_of::<T>() as u64).unwrap_or(wgpu::BufferSize::MIN)
    }

    /// Returns the number of entries currently in the buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns true if the buffer contains no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Starts a new frame. Slots are reused from the beginning.
    pub fn clear(&mut self) {
        self.count = 0;
    }

    /// Writes `value` into the next slot.
    ///
    /// Returns the byte offset of the slot and whether the GPU buffer was replaced,
    /// in which case bind groups referencing it must be recreated.
    pub fn push(&mut self, ctxt: &Context, value: &T) -> (u32, bool) {
        let reallocated = if self.count == self.capacity {
            self.grow(ctxt);
            true
        } else {
            false
        };

        let offset = self.count as u64 * self.aligned_size;
        ctxt.write_buffer(&self.buffer, offset, bytemuck::bytes_of(value));
        self.count += 1;

        (offset as u32, reallocated)
    }

    /// Replaces the GPU buffer with one twice as large. Slot numbering restarts.
    fn grow(&mut self, ctxt: &Context) {
        let new_capacity = self.capacity * 2;
        log::warn!(
            "{}: {} override draws in one frame, growing to {} entries",
            self.label,
            self.count,
            new_capacity
        );
        self.buffer = Self::allocate(ctxt, self.label, self.aligned_size, new_capacity);
        self.capacity = new_capacity;
        self.count = 0;
    }

    /// Returns a reference to the underlying GPU buffer.
    #[inline]
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Returns the current capacity of the buffer in entries.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
