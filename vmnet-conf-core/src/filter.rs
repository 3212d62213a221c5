//! Byte-stream stages shared by every grammar.
//!
//! Each stage wraps a `u8` iterator and yields a transformed `u8` iterator, so
//! the stages compose into a lazy pull-based chain ending in a tokenizer.

use std::io::{self, Read};

/// Read a handle to exhaustion and return its bytes as the head of a pipeline.
pub fn consume<R: Read>(mut reader: R) -> io::Result<std::vec::IntoIter<u8>> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    Ok(bytes.into_iter())
}

/// What happens to the newline that terminates a `#` comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentEnd {
    /// The newline is removed together with the comment.
    Consume,
    /// The newline is passed through so line-oriented grammars keep their separator.
    Keep,
}

/// Remove everything from `#` to the end of the line.
pub fn strip_comments<I>(bytes: I, end: CommentEnd) -> StripComments<I>
where
    I: Iterator<Item = u8>,
{
    StripComments {
        inner: bytes,
        end,
        in_comment: false,
    }
}

/// Iterator returned by [`strip_comments`].
#[derive(Debug)]
pub struct StripComments<I> {
    inner: I,
    end: CommentEnd,
    in_comment: bool,
}

impl<I> Iterator for StripComments<I>
where
    I: Iterator<Item = u8>,
{
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        loop {
            let byte = self.inner.next()?;
            if self.in_comment {
                if byte == b'\n' {
                    self.in_comment = false;
                    if self.end == CommentEnd::Keep {
                        return Some(byte);
                    }
                }
                continue;
            }
            if byte == b'#' {
                self.in_comment = true;
                continue;
            }
            return Some(byte);
        }
    }
}

/// Drop every byte that appears in `ignore`.
pub fn filter_chars<'a, I>(bytes: I, ignore: &'a [u8]) -> impl Iterator<Item = u8> + 'a
where
    I: Iterator<Item = u8> + 'a,
{
    bytes.filter(move |byte| !ignore.contains(byte))
}

/// Split off one delimited block from `source`.
///
/// Bytes before `open` are discarded and returned as the first element. The
/// returned [`Bracketed`] then yields `open`, the block body and the first
/// `close`. Nesting is not tracked. When `source` runs out before `close`, a
/// `close` is synthesized so consumers always observe a terminator; when it runs
/// out before `open`, the block is empty.
pub fn extract_bracketed<I>(open: u8, close: u8, source: &mut I) -> (Vec<u8>, Bracketed<'_, I>)
where
    I: Iterator<Item = u8>,
{
    let mut leading = Vec::new();
    let mut opened = false;
    for byte in source.by_ref() {
        if byte == open {
            opened = true;
            break;
        }
        leading.push(byte);
    }

    let block = Bracketed {
        source,
        close,
        pending_open: opened.then_some(open),
        opened,
        done: !opened,
        synthesized: false,
    };
    (leading, block)
}

/// A single delimited block borrowed from an outer byte stream.
#[derive(Debug)]
pub struct Bracketed<'a, I> {
    source: &'a mut I,
    close: u8,
    pending_open: Option<u8>,
    opened: bool,
    done: bool,
    synthesized: bool,
}

impl<I> Bracketed<'_, I> {
    /// Whether an opening delimiter was found at all.
    pub fn is_open(&self) -> bool {
        self.opened
    }

    /// Whether the closing delimiter had to be made up because input ended.
    pub fn is_truncated(&self) -> bool {
        self.synthesized
    }
}

impl<I> Iterator for Bracketed<'_, I>
where
    I: Iterator<Item = u8>,
{
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.done {
            return None;
        }
        if let Some(open) = self.pending_open.take() {
            return Some(open);
        }
        match self.source.next() {
            Some(byte) => {
                if byte == self.close {
                    self.done = true;
                }
                Some(byte)
            }
            None => {
                self.done = true;
                self.synthesized = true;
                Some(self.close)
            }
        }
    }
}

/// Collect bytes up to (not including) `sentinel`.
///
/// The flag is `false` once `source` is exhausted without reaching the sentinel.
pub fn take_until<I>(sentinel: u8, source: &mut I) -> (Vec<u8>, bool)
where
    I: Iterator<Item = u8>,
{
    let mut out = Vec::new();
    for byte in source.by_ref() {
        if byte == sentinel {
            return (out, true);
        }
        out.push(byte);
    }
    (out, false)
}
