use heapless::Vec;

use super::Error;

/// Maximum number of entries in a channel selector list.
pub const MAX_CHANNELS: usize = 8;

/// Cyclic list of channel select codes.
///
/// The codes are the raw words written to the bus to select the next channel
/// for conversion. Zero terminates a list and is never stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelList {
    codes: Vec<u32, MAX_CHANNELS>,
}

impl ChannelList {
    /// Build a list from a zero terminated sequence of codes.
    ///
    /// Everything from the first zero on is ignored. A missing terminator is
    /// fine as long as there are at most [MAX_CHANNELS] codes.
    pub fn new(codes: &[u32]) -> Result<Self, Error> {
        let mut list = Vec::new();
        for &code in codes.iter().take_while(|&&code| code != 0) {
            list.push(code).map_err(|_| Error::TooManyChannels)?;
        }
        if list.is_empty() {
            return Err(Error::EmptyChannelList);
        }
        Ok(Self { codes: list })
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// The code at `index`.
    ///
    /// `index` must come from [ChannelList::advance] or be zero.
    #[inline(always)]
    pub fn code(&self, index: usize) -> u32 {
        self.codes[index]
    }

    /// The index after `index`, wrapping to the start at the terminator.
    #[inline(always)]
    pub fn advance(&self, index: usize) -> usize {
        let next = index + 1;
        if next >= self.codes.len() {
            0
        } else {
            next
        }
    }

    pub fn codes(&self) -> &[u32] {
        &self.codes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminated() {
        let l = ChannelList::new(&[0xa, 0xb, 0xc, 0, 0xd]).unwrap();
        assert_eq!(l.codes(), &[0xa, 0xb, 0xc]);
        let l = ChannelList::new(&[1, 2, 3, 4, 5, 6, 7, 8, 0]).unwrap();
        assert_eq!(l.len(), 8);
    }

    #[test]
    fn invalid() {
        assert_eq!(ChannelList::new(&[]), Err(Error::EmptyChannelList));
        assert_eq!(ChannelList::new(&[0, 1]), Err(Error::EmptyChannelList));
        assert_eq!(
            ChannelList::new(&[1, 2, 3, 4, 5, 6, 7, 8, 9]),
            Err(Error::TooManyChannels)
        );
    }

    #[test]
    fn cyclic() {
        let l = ChannelList::new(&[0xa, 0xb, 0xc]).unwrap();
        let mut i = 0;
        let mut seen = [0; 7];
        for s in seen.iter_mut() {
            *s = l.code(i);
            i = l.advance(i);
        }
        assert_eq!(seen, [0xa, 0xb, 0xc, 0xa, 0xb, 0xc, 0xa]);

        let l = ChannelList::new(&[0xa]).unwrap();
        assert_eq!(l.advance(0), 0);
    }
}
