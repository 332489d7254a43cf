//! Stream Decoder and Loop Controller
//!
//! Walks a BRR buffer block by block, feeding every decoded sample through
//! the envelope generator, and follows end/loop flags:
//!
//! - end + loop with looping enabled: jump to the configured loop start
//! - end otherwise: stop
//! - no end flag: advance to the next block
//!
//! Looping streams never reach an end on their own, so they are bounded by
//! `max_frames`. A stream that runs out of bytes stops at the last complete
//! block and reports a [`Diagnostic`]; it never fails with an error.

use std::fmt;

use tracing::{debug, warn};

use crate::brr::{decode_block, BlockHeader, BlockReader, FilterState};
use crate::config::DecoderConfig;
use crate::constants::{BLOCK_SIZE, SAMPLES_PER_BLOCK};
use crate::envelope::EnvelopeGenerator;
use crate::Result;

/// Why a stream stopped producing samples
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Reached an end block without looping
    EndFlag,
    /// Reached the configured frame bound
    FrameLimit,
    /// Ran off the end of the buffer on a block boundary without an end flag
    BufferExhausted,
    /// Fewer than 9 bytes were left for the next block
    MalformedBlock,
    /// The loop start offset lies outside the buffer
    LoopStartOutOfRange,
    /// The envelope released all the way down to silence
    EnvelopeReleased,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::EndFlag => write!(f, "end flag"),
            Termination::FrameLimit => write!(f, "frame limit"),
            Termination::BufferExhausted => write!(f, "buffer exhausted"),
            Termination::MalformedBlock => write!(f, "malformed block"),
            Termination::LoopStartOutOfRange => write!(f, "loop start out of range"),
            Termination::EnvelopeReleased => write!(f, "envelope released"),
        }
    }
}

/// Non-fatal problem found while decoding a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A block at `offset` had only `available` of its 9 bytes
    MalformedBlock {
        /// Byte offset of the truncated block
        offset: usize,
        /// Bytes left in the buffer
        available: usize,
    },
    /// The buffer ended at `offset` before any end-flagged block
    BufferExhausted {
        /// Buffer length (where the next block would start)
        offset: usize,
    },
    /// A loop jump targeted an offset beyond the buffer
    LoopStartOutOfRange {
        /// Configured loop start
        loop_start: usize,
        /// Buffer length
        len: usize,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MalformedBlock { offset, available } => write!(
                f,
                "block at offset {offset} has {available} of {BLOCK_SIZE} bytes; output truncated"
            ),
            Diagnostic::BufferExhausted { offset } => {
                write!(f, "buffer ended at offset {offset} without an end block")
            }
            Diagnostic::LoopStartOutOfRange { loop_start, len } => write!(
                f,
                "loop start {loop_start} is outside the {len}-byte buffer"
            ),
        }
    }
}

/// Result of one decode pass
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeOutput {
    /// Decoded 16-bit PCM at 32 kHz
    pub samples: Vec<i16>,
    /// Number of blocks decoded (loop repeats included)
    pub blocks_decoded: usize,
    /// Number of loop jumps taken
    pub loops_taken: usize,
    /// Why decoding stopped
    pub termination: Termination,
    /// Problems encountered along the way
    pub diagnostics: Vec<Diagnostic>,
}

impl DecodeOutput {
    /// Whether the stream ended without diagnostics
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// What the stream does after a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStep {
    /// Continue with the block at this offset
    Advance(usize),
    /// Jump back to the loop start
    Loop(usize),
    /// Stop
    End,
}

/// Decides the cursor movement after each block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopController {
    loop_start: usize,
    loop_enabled: bool,
}

impl LoopController {
    /// Create a controller
    pub fn new(loop_start: usize, loop_enabled: bool) -> Self {
        LoopController {
            loop_start,
            loop_enabled,
        }
    }

    /// Step for a block at `cursor` with `header`
    pub fn after_block(&self, cursor: usize, header: BlockHeader) -> BlockStep {
        if !header.is_end() {
            BlockStep::Advance(cursor + BLOCK_SIZE)
        } else if header.is_loop() && self.loop_enabled {
            BlockStep::Loop(self.loop_start)
        } else {
            BlockStep::End
        }
    }
}

/// Block-by-block decoder for one sample stream.
///
/// Owns its filter history and envelope; the source buffer is only borrowed.
#[derive(Debug, Clone)]
pub struct StreamDecoder<'a> {
    reader: BlockReader<'a>,
    cursor: usize,
    filter: FilterState,
    envelope: EnvelopeGenerator,
    looping: LoopController,
    max_frames: Option<usize>,
    key_off_at: Option<usize>,
    frames: usize,
    blocks_decoded: usize,
    loops_taken: usize,
    diagnostics: Vec<Diagnostic>,
    termination: Option<Termination>,
}

impl<'a> StreamDecoder<'a> {
    /// Create a stream over `data`, starting at offset 0.
    ///
    /// The config is validated here.
    pub fn new(data: &'a [u8], config: &DecoderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(data, config))
    }

    fn from_parts(data: &'a [u8], config: &DecoderConfig) -> Self {
        StreamDecoder {
            reader: BlockReader::new(data),
            cursor: 0,
            filter: FilterState::new(),
            envelope: config.envelope_generator(),
            looping: LoopController::new(config.loop_start, config.loop_enabled),
            max_frames: config.max_frames,
            key_off_at: config.key_off_at,
            frames: 0,
            blocks_decoded: 0,
            loops_taken: 0,
            diagnostics: Vec::new(),
            termination: None,
        }
    }

    /// Current byte offset
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Frames emitted so far
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Filter history
    pub fn filter_state(&self) -> &FilterState {
        &self.filter
    }

    /// Envelope state
    pub fn envelope(&self) -> &EnvelopeGenerator {
        &self.envelope
    }

    /// Termination reason, once the stream has stopped
    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    /// Decode the next block, appending its samples to `out`.
    ///
    /// Returns `Some(reason)` once the stream has stopped; further calls
    /// return the same reason without producing samples.
    pub fn decode_next_block(&mut self, out: &mut Vec<i16>) -> Option<Termination> {
        if let Some(reason) = self.termination {
            return Some(reason);
        }
        let reason = self.step(out);
        if let Some(reason) = reason {
            debug!(
                frames = self.frames,
                blocks = self.blocks_decoded,
                loops = self.loops_taken,
                %reason,
                "BRR stream finished"
            );
            self.termination = Some(reason);
        }
        reason
    }

    /// Run the stream to completion
    pub fn decode(mut self) -> DecodeOutput {
        let mut samples = Vec::with_capacity(self.estimated_frames());
        let termination = loop {
            if let Some(reason) = self.decode_next_block(&mut samples) {
                break reason;
            }
        };
        DecodeOutput {
            samples,
            blocks_decoded: self.blocks_decoded,
            loops_taken: self.loops_taken,
            termination,
            diagnostics: self.diagnostics,
        }
    }

    fn estimated_frames(&self) -> usize {
        let natural = self.reader.block_count() * SAMPLES_PER_BLOCK;
        self.max_frames.map_or(natural, |limit| limit.min(natural))
    }

    fn limit_reached(&self) -> bool {
        self.max_frames.is_some_and(|limit| self.frames >= limit)
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        warn!("{diagnostic}");
        self.diagnostics.push(diagnostic);
    }

    fn step(&mut self, out: &mut Vec<i16>) -> Option<Termination> {
        if self.limit_reached() {
            return Some(Termination::FrameLimit);
        }

        let available = self.reader.remaining(self.cursor);
        if available == 0 {
            self.report(Diagnostic::BufferExhausted {
                offset: self.cursor,
            });
            return Some(Termination::BufferExhausted);
        }
        let Some(block) = self.reader.block_at(self.cursor) else {
            self.report(Diagnostic::MalformedBlock {
                offset: self.cursor,
                available,
            });
            return Some(Termination::MalformedBlock);
        };

        let decoded = decode_block(&block, &mut self.filter);
        self.blocks_decoded += 1;

        for sample in decoded {
            if self.limit_reached() {
                return Some(Termination::FrameLimit);
            }
            if self.key_off_at == Some(self.frames) {
                self.envelope.key_off();
            }
            out.push(self.envelope.apply(sample));
            self.frames += 1;
            if self.envelope.is_finished() {
                return Some(Termination::EnvelopeReleased);
            }
        }

        match self.looping.after_block(self.cursor, block.header) {
            BlockStep::Advance(next) => {
                self.cursor = next;
                None
            }
            BlockStep::Loop(target) => {
                if target >= self.reader.len() {
                    self.report(Diagnostic::LoopStartOutOfRange {
                        loop_start: target,
                        len: self.reader.len(),
                    });
                    return Some(Termination::LoopStartOutOfRange);
                }
                self.loops_taken += 1;
                self.cursor = target;
                None
            }
            BlockStep::End => Some(Termination::EndFlag),
        }
    }
}

/// Decode `data` with `config`.
///
/// Only an invalid config is an error; stream problems end up in
/// [`DecodeOutput::diagnostics`].
pub fn decode(data: &[u8], config: &DecoderConfig) -> Result<DecodeOutput> {
    Ok(StreamDecoder::new(data, config)?.decode())
}

/// Decode `data` with no envelope, no looping and unity gain.
pub fn decode_raw(data: &[u8]) -> DecodeOutput {
    StreamDecoder::from_parts(data, &DecoderConfig::raw()).decode()
}
