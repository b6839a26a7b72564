//! Page-flip bookkeeping.
//!
//! Two scan-out buffers, one of which is on screen. Drawing always goes to
//! the other one; a successful commit swaps their roles. The hardware call
//! itself is supplied by the owner, so the chain works the same over mapped
//! dumb buffers and plain vectors.

use std::io;

use crate::{GraphicsError, Result};

#[derive(Debug)]
pub struct FlipChain<B> {
    // Slot 1 is declared first so it is released first.
    second: B,
    first: B,
    front: usize,
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> FlipChain<B> {
    /// Chain with slot 0 on screen.
    pub fn new(first: B, second: B) -> Self {
        Self {
            second,
            first,
            front: 0,
        }
    }

    fn slot(&self, index: usize) -> &B {
        if index & 1 == 0 {
            &self.first
        } else {
            &self.second
        }
    }

    fn slot_mut(&mut self, index: usize) -> &mut B {
        if index & 1 == 0 {
            &mut self.first
        } else {
            &mut self.second
        }
    }

    /// Slot currently scanned out.
    pub fn front_index(&self) -> usize {
        self.front
    }

    /// Slot drawing goes to.
    pub fn back_index(&self) -> usize {
        self.front ^ 1
    }

    pub fn front(&self) -> &[u8] {
        self.slot(self.front).as_ref()
    }

    pub fn back_mut(&mut self) -> &mut [u8] {
        let back = self.back_index();
        self.slot_mut(back).as_mut()
    }

    pub fn buffer(&self, index: usize) -> &B {
        self.slot(index)
    }

    /// Put the back buffer on screen.
    ///
    /// `commit` receives the slot to scan out. On failure the roles stay as
    /// they were and the error is reported as recoverable.
    pub fn flip<F>(&mut self, commit: F) -> Result<()>
    where
        F: FnOnce(usize) -> io::Result<()>,
    {
        let back = self.back_index();
        commit(back).map_err(|source| GraphicsError::PresentFailed { source })?;
        self.front = back;
        log::trace!("flipped to slot {back}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_two_flips_cancel_out() {
        let mut chain = FlipChain::new(vec![0u8; 4], vec![0u8; 4]);
        assert_eq!(chain.front_index(), 0);
        chain.flip(|slot| {
            assert_eq!(slot, 1);
            Ok(())
        })
        .unwrap();
        assert_eq!(chain.front_index(), 1);
        chain.flip(|_| Ok(())).unwrap();
        assert_eq!(chain.front_index(), 0);
    }

    #[test]
    fn test_draws_land_in_back_buffer() {
        let mut chain = FlipChain::new(vec![0u8; 4], vec![0u8; 4]);
        chain.back_mut()[0] = 7;
        assert_eq!(chain.buffer(1)[0], 7);
        assert_eq!(chain.front()[0], 0);
        chain.flip(|_| Ok(())).unwrap();
        assert_eq!(chain.front()[0], 7);
        chain.back_mut()[0] = 9;
        assert_eq!(chain.buffer(0)[0], 9);
    }

    struct Tracked {
        slot: usize,
        released: Rc<RefCell<Vec<usize>>>,
        pixels: Vec<u8>,
    }

    impl AsRef<[u8]> for Tracked {
        fn as_ref(&self) -> &[u8] {
            &self.pixels
        }
    }

    impl AsMut<[u8]> for Tracked {
        fn as_mut(&mut self) -> &mut [u8] {
            &mut self.pixels
        }
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.released.borrow_mut().push(self.slot);
        }
    }

    #[test]
    fn test_buffers_released_last_slot_first() {
        let released = Rc::new(RefCell::new(Vec::new()));
        let tracked = |slot| Tracked {
            slot,
            released: Rc::clone(&released),
            pixels: vec![0; 4],
        };
        let mut chain = FlipChain::new(tracked(0), tracked(1));
        // Independent of which slot is on screen.
        chain.flip(|_| Ok(())).unwrap();
        drop(chain);
        assert_eq!(*released.borrow(), vec![1, 0]);
    }

    #[test]
    fn test_failed_flip_keeps_front() {
        let mut chain = FlipChain::new(vec![0u8; 4], vec![0u8; 4]);
        let err = chain
            .flip(|_| Err(io::Error::from_raw_os_error(libc::EBUSY)))
            .unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(chain.front_index(), 0);
    }
}
