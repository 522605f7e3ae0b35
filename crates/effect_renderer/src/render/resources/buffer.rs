//! Geometry buffers
//!
//! [`GeometryBuffer`] is a fixed-capacity, append-only vertex ring used for
//! one frame at a time. Writes go to CPU staging memory through a
//! [`MappedRegion`] and reach the host buffer on unmap. The buffer never
//! grows mid-frame so the host handle stays stable; a full buffer is rewound
//! with a discard upload instead.
//!
//! [`QuadIndexBuffer`] holds the immutable index pattern shared by every
//! quad-based primitive.

use std::ops::Range;

use bytemuck::Pod;
use thiserror::Error;

use crate::render::api::{BufferHandle, RenderBackend};
use crate::render::RenderResult;

/// Geometry buffer mapping errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    /// `map` called while a region is still mapped
    #[error("buffer is already mapped")]
    AlreadyMapped,

    /// `unmap` called without a mapped region
    #[error("buffer is not mapped")]
    NotMapped,

    /// `map` called outside an active frame
    #[error("no frame is active")]
    FrameNotActive,

    /// The request is larger than the whole buffer
    #[error("requested {requested} bytes from a {capacity}-byte buffer")]
    ExceedsCapacity {
        /// Requested bytes
        requested: usize,
        /// Buffer capacity
        capacity: usize,
    },

    /// The request does not fit in what is left of the buffer this frame
    #[error("requested {requested} bytes with {remaining} remaining")]
    Overflow {
        /// Requested bytes
        requested: usize,
        /// Bytes left after the cursor
        remaining: usize,
    },

    /// The host buffer has not been allocated
    #[error("buffer has no host allocation")]
    NotAllocated,
}

/// Writable window into the staging memory of a [`GeometryBuffer`]
#[derive(Debug)]
pub struct MappedRegion<'a> {
    offset: usize,
    bytes: &'a mut [u8],
    written: usize,
}

impl MappedRegion<'_> {
    /// Byte offset of the region inside the buffer
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Size of the region in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the region is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Append vertices after whatever was already written
    pub fn write<V: Pod>(&mut self, vertices: &[V]) -> Result<(), BufferError> {
        let src: &[u8] = bytemuck::cast_slice(vertices);
        let remaining = self.bytes.len() - self.written;
        if src.len() > remaining {
            return Err(BufferError::Overflow {
                requested: src.len(),
                remaining,
            });
        }

        self.bytes[self.written..self.written + src.len()].copy_from_slice(src);
        self.written += src.len();
        Ok(())
    }
}

/// Frame-scoped, append-only vertex buffer
#[derive(Debug)]
pub struct GeometryBuffer {
    handle: Option<BufferHandle>,
    staging: Vec<u8>,
    cursor: usize,
    mapped: Option<Range<usize>>,
    frame_active: bool,
    discard_next: bool,
    uploaded_bytes: u64,
}

impl GeometryBuffer {
    /// Allocate a buffer of `capacity` bytes on the host
    pub fn allocate(backend: &mut dyn RenderBackend, capacity: usize) -> RenderResult<Self> {
        let handle = backend.create_vertex_buffer(capacity)?;
        log::debug!("Allocated {} byte geometry buffer {:?}", capacity, handle);

        Ok(Self {
            handle: Some(handle),
            staging: vec![0; capacity],
            cursor: 0,
            mapped: None,
            frame_active: false,
            discard_next: true,
            uploaded_bytes: 0,
        })
    }

    /// Host handle, `None` after the device was lost
    pub fn handle(&self) -> Option<BufferHandle> {
        self.handle
    }

    /// Total capacity in bytes
    pub fn capacity(&self) -> usize {
        self.staging.len()
    }

    /// Write cursor
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Bytes left after the cursor
    pub fn remaining(&self) -> usize {
        self.capacity() - self.cursor
    }

    /// Whether a region is mapped
    pub fn is_mapped(&self) -> bool {
        self.mapped.is_some()
    }

    /// Bytes uploaded to the host since allocation
    pub fn uploaded_bytes(&self) -> u64 {
        self.uploaded_bytes
    }

    /// Start a frame: rewind the cursor and accept maps
    pub fn begin_frame(&mut self) {
        self.reset();
        self.frame_active = true;
    }

    /// End the frame; any mapped region is dropped without upload
    pub fn end_frame(&mut self) {
        if self.mapped.take().is_some() {
            log::warn!("Geometry buffer still mapped at end of frame; dropping the region");
        }
        self.frame_active = false;
    }

    /// Rewind the write cursor to zero
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.mapped = None;
        self.discard_next = true;
    }

    /// Rewind mid-frame; the next upload discards the old contents
    pub fn wrap(&mut self) {
        log::trace!("Geometry buffer wrapped at {} of {} bytes", self.cursor, self.capacity());
        self.cursor = 0;
        self.discard_next = true;
    }

    /// Whether `bytes` fit after the cursor once aligned to `alignment`
    pub fn fits(&self, bytes: usize, alignment: usize) -> bool {
        align_up(self.cursor, alignment)
            .checked_add(bytes)
            .is_some_and(|end| end <= self.capacity())
    }

    /// Map `size` bytes at the cursor, aligned to `alignment`
    ///
    /// Fails when already mapped, outside a frame, or when the request does
    /// not fit; the caller flushes and wraps rather than growing the buffer.
    pub fn map(&mut self, size: usize, alignment: usize) -> Result<MappedRegion<'_>, BufferError> {
        if self.mapped.is_some() {
            return Err(BufferError::AlreadyMapped);
        }
        if !self.frame_active {
            return Err(BufferError::FrameNotActive);
        }
        if size > self.capacity() {
            return Err(BufferError::ExceedsCapacity {
                requested: size,
                capacity: self.capacity(),
            });
        }

        let start = align_up(self.cursor, alignment);
        if start + size > self.capacity() {
            return Err(BufferError::Overflow {
                requested: size,
                remaining: self.capacity().saturating_sub(start),
            });
        }

        let range = start..start + size;
        self.mapped = Some(range.clone());
        Ok(MappedRegion {
            offset: start,
            bytes: &mut self.staging[range],
            written: 0,
        })
    }

    /// Upload the mapped region to the host and advance the cursor
    pub fn unmap(&mut self, backend: &mut dyn RenderBackend) -> RenderResult<()> {
        let range = self.mapped.take().ok_or(BufferError::NotMapped)?;
        let handle = self.handle.ok_or(BufferError::NotAllocated)?;

        backend.upload_vertices(handle, range.start, &self.staging[range.clone()], self.discard_next)?;
        self.discard_next = false;
        self.uploaded_bytes += range.len() as u64;
        self.cursor = range.end;
        Ok(())
    }

    /// Raw staging bytes
    pub fn read(&self, range: Range<usize>) -> Option<&[u8]> {
        self.staging.get(range)
    }

    /// Read `count` vertices back from `offset`
    pub fn read_vertices<V: Pod>(&self, offset: usize, count: usize) -> Option<Vec<V>> {
        let stride = std::mem::size_of::<V>();
        let bytes = self.read(offset..offset + stride * count)?;
        Some(bytes.chunks_exact(stride).map(bytemuck::pod_read_unaligned).collect())
    }

    /// Forget the host handle after device loss
    pub fn invalidate(&mut self) {
        self.handle = None;
        self.mapped = None;
        self.frame_active = false;
    }

    /// Recreate the host buffer with the same capacity
    pub fn recreate(&mut self, backend: &mut dyn RenderBackend) -> RenderResult<()> {
        self.handle = Some(backend.create_vertex_buffer(self.capacity())?);
        self.reset();
        Ok(())
    }

    /// Release the host buffer
    pub fn release(&mut self, backend: &mut dyn RenderBackend) {
        if let Some(handle) = self.handle.take() {
            backend.release_buffer(handle);
        }
    }
}

/// Immutable index buffer drawing `square_max_count` quads
#[derive(Debug)]
pub struct QuadIndexBuffer {
    handle: Option<BufferHandle>,
    square_max_count: usize,
}

impl QuadIndexBuffer {
    /// Index order within a quad whose vertices are lower-left, lower-right,
    /// upper-left, upper-right
    pub const QUAD_PATTERN: [u32; 6] = [3, 1, 0, 3, 0, 2];

    /// Create the index buffer on the host
    pub fn create(backend: &mut dyn RenderBackend, square_max_count: usize) -> RenderResult<Self> {
        let handle = backend.create_index_buffer(&Self::indices(square_max_count))?;
        Ok(Self {
            handle: Some(handle),
            square_max_count,
        })
    }

    /// Index list for `square_max_count` quads
    pub fn indices(square_max_count: usize) -> Vec<u32> {
        (0..square_max_count as u32)
            .flat_map(|quad| Self::QUAD_PATTERN.iter().map(move |i| i + quad * 4))
            .collect()
    }

    /// Host handle, `None` after the device was lost
    pub fn handle(&self) -> Option<BufferHandle> {
        self.handle
    }

    /// Number of quads covered
    pub fn square_max_count(&self) -> usize {
        self.square_max_count
    }

    /// Forget the host handle after device loss
    pub fn invalidate(&mut self) {
        self.handle = None;
    }

    /// Recreate the host buffer
    pub fn recreate(&mut self, backend: &mut dyn RenderBackend) -> RenderResult<()> {
        self.handle = Some(backend.create_index_buffer(&Self::indices(self.square_max_count))?);
        Ok(())
    }

    /// Release the host buffer
    pub fn release(&mut self, backend: &mut dyn RenderBackend) {
        if let Some(handle) = self.handle.take() {
            backend.release_buffer(handle);
        }
    }
}

fn align_up(value: usize, alignment: usize) -> usize {
    if alignment <= 1 {
        value
    } else {
        value.div_ceil(alignment) * alignment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Color, Vec3};
    use crate::render::backends::{BackendCommand, RecordingBackend};
    use crate::render::primitives::{Vertex, VertexDistortion};

    fn active_buffer(backend: &mut RecordingBackend, capacity: usize) -> GeometryBuffer {
        let mut buffer = GeometryBuffer::allocate(backend, capacity).unwrap();
        buffer.begin_frame();
        buffer
    }

    fn sample_distortion(i: usize) -> VertexDistortion {
        let f = i as f32;
        VertexDistortion::new(Vec3::new(f, f * 2.0, -f), Color::new(i as u8, 10, 20, 255), [f * 0.1, 1.0 - f * 0.1])
            .with_tangent_frame(Vec3::new(1.0, f, 0.0), Vec3::new(0.0, 1.0, f))
    }

    #[test]
    fn test_roundtrip_standard_vertices() {
        let mut backend = RecordingBackend::new();
        let mut buffer = active_buffer(&mut backend, 1024);
        let vertices: Vec<Vertex> = (0..4).map(|i| sample_distortion(i).into()).collect();

        let offset = {
            let mut region = buffer.map(96, 24).unwrap();
            region.write(&vertices).unwrap();
            region.offset()
        };
        buffer.unmap(&mut backend).unwrap();

        assert_eq!(buffer.read_vertices::<Vertex>(offset, 4).unwrap(), vertices);
        let uploaded = backend.buffer_contents(buffer.handle().unwrap()).unwrap();
        assert_eq!(&uploaded[offset..offset + 96], bytemuck::cast_slice::<Vertex, u8>(&vertices));
    }

    #[test]
    fn test_roundtrip_distortion_vertices_after_unaligned_cursor() {
        let mut backend = RecordingBackend::new();
        let mut buffer = active_buffer(&mut backend, 1024);

        // Leave the cursor at 24, which is not a multiple of 48.
        buffer.map(24, 24).unwrap().write(&[Vertex::from(sample_distortion(9))]).unwrap();
        buffer.unmap(&mut backend).unwrap();

        let vertices: Vec<VertexDistortion> = (0..4).map(sample_distortion).collect();
        let offset = {
            let mut region = buffer.map(192, 48).unwrap();
            region.write(&vertices).unwrap();
            region.offset()
        };
        buffer.unmap(&mut backend).unwrap();

        assert_eq!(offset, 48);
        assert_eq!(buffer.read_vertices::<VertexDistortion>(offset, 4).unwrap(), vertices);
    }

    #[test]
    fn test_map_failures() {
        let mut backend = RecordingBackend::new();
        let mut buffer = GeometryBuffer::allocate(&mut backend, 96).unwrap();

        assert_eq!(buffer.map(24, 24).unwrap_err(), BufferError::FrameNotActive);

        buffer.begin_frame();
        assert_eq!(
            buffer.map(200, 24).unwrap_err(),
            BufferError::ExceedsCapacity { requested: 200, capacity: 96 }
        );

        buffer.map(72, 24).unwrap();
        assert_eq!(buffer.map(24, 24).unwrap_err(), BufferError::AlreadyMapped);
        buffer.unmap(&mut backend).unwrap();

        assert_eq!(
            buffer.map(48, 24).unwrap_err(),
            BufferError::Overflow { requested: 48, remaining: 24 }
        );
        assert!(matches!(
            buffer.unmap(&mut backend),
            Err(crate::render::RenderError::BufferMapping(BufferError::NotMapped))
        ));
    }

    #[test]
    fn test_discard_after_reset_and_wrap() {
        let mut backend = RecordingBackend::new();
        let mut buffer = active_buffer(&mut backend, 96);

        for _ in 0..2 {
            buffer.map(48, 24).unwrap();
            buffer.unmap(&mut backend).unwrap();
        }
        assert!(!buffer.fits(24, 24));
        buffer.wrap();
        buffer.map(48, 24).unwrap();
        buffer.unmap(&mut backend).unwrap();

        let discards: Vec<bool> = backend
            .commands()
            .iter()
            .filter_map(|c| match c {
                BackendCommand::UploadVertices { discard, .. } => Some(*discard),
                _ => None,
            })
            .collect();
        assert_eq!(discards, vec![true, false, true]);
        assert_eq!(buffer.cursor(), 48);
    }

    #[test]
    fn test_region_rejects_overlong_write() {
        let mut backend = RecordingBackend::new();
        let mut buffer = active_buffer(&mut backend, 1024);
        let mut region = buffer.map(24, 24).unwrap();
        let two = [Vertex::from(sample_distortion(0)); 2];
        assert_eq!(region.write(&two), Err(BufferError::Overflow { requested: 48, remaining: 24 }));
    }

    #[test]
    fn test_quad_indices() {
        let indices = QuadIndexBuffer::indices(2);
        assert_eq!(indices, vec![3, 1, 0, 3, 0, 2, 7, 5, 4, 7, 4, 6]);
    }
}
