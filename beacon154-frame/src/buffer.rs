//! A fixed-capacity buffer for building frames back-to-front.

use crate::{Error, Result, MAX_PHY_PACKET_SIZE};

/// A frame under construction.
///
/// The valid region is `data[head..tail]`. Headers are prepended in front of
/// `head`, payload and MIC space are appended behind `tail`. Both operations
/// fail instead of overwriting when the capacity on that side is exhausted.
#[derive(Clone, PartialEq, Eq)]
pub struct FrameBuffer<const N: usize = MAX_PHY_PACKET_SIZE> {
    data: [u8; N],
    head: usize,
    tail: usize,
}

impl<const N: usize> FrameBuffer<N> {
    /// Create an empty buffer with `headroom` octets reserved for headers.
    pub const fn new(headroom: usize) -> Self {
        let headroom = if headroom > N { N } else { headroom };
        Self {
            data: [0u8; N],
            head: headroom,
            tail: headroom,
        }
    }

    /// Create a buffer holding a copy of `frame`, without headroom.
    ///
    /// # Errors
    ///
    /// Returns an error if `frame` does not fit.
    pub fn from_slice(frame: &[u8]) -> Result<Self> {
        let mut buffer = Self::new(0);
        buffer.append(frame)?;
        Ok(buffer)
    }

    /// Prepend `bytes` in front of the current content.
    pub fn prepend(&mut self, bytes: &[u8]) -> Result<()> {
        let start = self.reserve_front(bytes.len())?;
        start.copy_from_slice(bytes);
        Ok(())
    }

    /// Reserve `len` octets in front of the current content and return them.
    pub fn reserve_front(&mut self, len: usize) -> Result<&mut [u8]> {
        if len > self.head {
            return Err(Error);
        }
        self.head -= len;
        Ok(&mut self.data[self.head..self.head + len])
    }

    /// Append `bytes` behind the current content.
    pub fn append(&mut self, bytes: &[u8]) -> Result<()> {
        let end = self.reserve_back(bytes.len())?;
        end.copy_from_slice(bytes);
        Ok(())
    }

    /// Reserve `len` zeroed octets behind the current content and return them.
    pub fn reserve_back(&mut self, len: usize) -> Result<&mut [u8]> {
        if self.tail + len > N {
            return Err(Error);
        }
        let start = self.tail;
        self.tail += len;
        let slice = &mut self.data[start..self.tail];
        slice.fill(0);
        Ok(slice)
    }

    /// Drop `len` octets from the end of the content.
    pub fn truncate_back(&mut self, len: usize) {
        self.tail = self.tail.saturating_sub(len).max(self.head);
    }

    /// Number of octets that can still be prepended.
    pub fn headroom(&self) -> usize {
        self.head
    }

    /// Number of octets that can still be appended.
    pub fn tailroom(&self) -> usize {
        N - self.tail
    }

    /// Length of the content.
    pub fn len(&self) -> usize {
        self.tail - self.head
    }

    /// Returns `true` when there is no content.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the content.
    pub fn as_slice(&self) -> &[u8] {
        &self.data[self.head..self.tail]
    }

    /// Return the content mutably.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data[self.head..self.tail]
    }
}

impl<const N: usize> AsRef<[u8]> for FrameBuffer<N> {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl<const N: usize> AsMut<[u8]> for FrameBuffer<N> {
    fn as_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

impl<const N: usize> core::fmt::Debug for FrameBuffer<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "FrameBuffer({:02x?})", self.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn back_to_front() {
        let mut buffer = FrameBuffer::<16>::new(4);
        buffer.append(&[3, 4]).unwrap();
        buffer.prepend(&[2]).unwrap();
        buffer.prepend(&[0, 1]).unwrap();
        assert_eq!(buffer.as_slice(), &[0, 1, 2, 3, 4]);
        assert_eq!(buffer.headroom(), 1);

        assert!(buffer.prepend(&[9, 9]).is_err());
        assert_eq!(buffer.as_slice(), &[0, 1, 2, 3, 4]);
    }

    #[test]
    fn tail_capacity() {
        let mut buffer = FrameBuffer::<4>::new(0);
        buffer.append(&[1, 2, 3]).unwrap();
        assert!(buffer.append(&[4, 5]).is_err());
        assert_eq!(buffer.reserve_back(1).unwrap(), &[0]);
        assert_eq!(buffer.tailroom(), 0);
        buffer.truncate_back(2);
        assert_eq!(buffer.as_slice(), &[1, 2]);
    }

    #[test]
    fn headroom_takes_from_tail() {
        let mut full = FrameBuffer::<8>::new(8);
        assert_eq!(full.tailroom(), 0);
        assert!(full.append(&[1]).is_err());
        full.prepend(&[1]).unwrap();
        assert_eq!(full.as_slice(), &[1]);

        let mut buffer = FrameBuffer::<8>::new(4);
        buffer.append(&[1, 2, 3, 4]).unwrap();
        assert_eq!(buffer.tailroom(), 0);
        assert!(buffer.append(&[5]).is_err());
    }
}
