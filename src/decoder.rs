use std::collections::VecDeque;
use std::fmt;

use log::warn;
use utf8parse::{Parser as Utf8Parser, Receiver as Utf8Receiver};

/// Result of pulling one code point from the queue.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Decoded {
    Char(char),
    /// A malformed byte span was skipped.
    Invalid,
    EndOfStream,
}

/// Catches what the UTF-8 parser produced for one byte, if anything.
#[derive(Default)]
struct DecodedReceiver {
    decoded: Option<Decoded>,
}

impl Utf8Receiver for DecodedReceiver {
    fn codepoint(&mut self, c: char) {
        self.decoded = Some(Decoded::Char(c));
    }

    fn invalid_sequence(&mut self) {
        self.decoded = Some(Decoded::Invalid);
    }
}

/// Pending input chunks, decoded lazily as UTF-8.
///
/// `push` only stores the bytes; decoding happens in `next_char`, which feeds the
/// queue byte by byte into a `utf8parse` parser and drops chunks once they are used
/// up. Code points may straddle chunk boundaries.
#[derive(Default)]
pub struct InputQueue {
    chunks: VecDeque<Vec<u8>>,
    cursor: usize,
    utf8: Utf8Parser,
    // A multi-byte sequence has been started but not completed.
    in_sequence: bool,
}

impl fmt::Debug for InputQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputQueue")
            .field("chunks", &self.chunks.len())
            .field("cursor", &self.cursor)
            .field("in_sequence", &self.in_sequence)
            .finish_non_exhaustive()
    }
}

impl InputQueue {
    pub fn new() -> InputQueue {
        InputQueue {
            chunks: VecDeque::with_capacity(4),
            cursor: 0,
            utf8: Utf8Parser::new(),
            in_sequence: false,
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        if !bytes.is_empty() {
            self.chunks.push_back(bytes.to_vec());
        }
    }

    /// Total bytes not yet consumed.
    pub fn pending_len(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum::<usize>() - self.cursor
    }

    pub fn clear(&mut self) {
        self.chunks.clear();
        self.cursor = 0;
        self.utf8 = Utf8Parser::new();
        self.in_sequence = false;
    }

    fn peek_byte(&self) -> Option<u8> {
        self.chunks.front().map(|chunk| chunk[self.cursor])
    }

    fn advance(&mut self) {
        let Some(front) = self.chunks.front() else {
            return;
        };
        self.cursor += 1;
        if self.cursor == front.len() {
            self.chunks.pop_front();
            self.cursor = 0;
        }
    }

    /// Decodes the next code point. `\r\n` and a lone `\r` both come out as `\n`.
    pub fn next_char(&mut self) -> Decoded {
        match self.decode() {
            Decoded::Char('\r') => {
                if self.peek_byte() == Some(b'\n') {
                    self.advance();
                }
                Decoded::Char('\n')
            }
            other => other,
        }
    }

    fn decode(&mut self) -> Decoded {
        loop {
            let Some(byte) = self.peek_byte() else {
                if self.in_sequence {
                    warn!("Input ends inside a UTF-8 sequence");
                    self.utf8 = Utf8Parser::new();
                    self.in_sequence = false;
                    return Decoded::Invalid;
                }
                return Decoded::EndOfStream;
            };

            let mut receiver = DecodedReceiver::default();
            self.utf8.advance(&mut receiver, byte);
            match receiver.decoded {
                None => {
                    self.advance();
                    self.in_sequence = true;
                }
                Some(Decoded::Invalid) if self.in_sequence => {
                    // The byte broke an open sequence; leave it queued so it is
                    // decoded on its own next time.
                    warn!("Truncated UTF-8 sequence before {:02X}", byte);
                    self.in_sequence = false;
                    return Decoded::Invalid;
                }
                Some(decoded) => {
                    if decoded == Decoded::Invalid {
                        warn!("Invalid UTF-8 byte: {:02X}", byte);
                    }
                    self.advance();
                    self.in_sequence = false;
                    return decoded;
                }
            }
        }
    }
}
