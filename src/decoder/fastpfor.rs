//! FastPFOR integer codec.
//!
//! The wire format is a single aligned-count header word followed by pages
//! of 256-value blocks. Each block stores the low `bit_width` bits of every
//! value in a fixed-width body; values that need more bits keep their high
//! bits in a per-page exception stream selected by `max_bits - bit_width`.
//! Values that do not fill a whole block are appended as a VByte tail
//! (MSB-set terminator byte, the inverse of the varint convention).
//!
//! All multi-byte words are big-endian i32. The byte container and the
//! VByte tail are raw byte runs padded to word boundaries.

use std::sync::{Mutex, OnceLock};

use crate::decoder::unpack::{pack32, unpack32, unpack256};
use crate::error::{Error, Result, Section};

pub const BLOCK_SIZE: usize = 256;
pub const DEFAULT_PAGE_SIZE: usize = 65_536;

/// Cost in bits charged per exception when choosing a block bit width
/// (one position byte per exception).
const EXCEPTION_OVERHEAD_BITS: usize = 8;

fn malformed(details: &'static str) -> Error {
    Error::malformed(Section::FastPfor, details)
}

#[inline]
const fn words_for(bytes: usize) -> usize {
    bytes.div_ceil(4)
}

/// Decoder with reusable scratch buffers.
///
/// The scratch is owned by the value, so independent decoders never share
/// state and separate tiles can be decoded concurrently.
pub struct FastPforDecoder {
    words: Vec<i32>,
    exceptions: Vec<Vec<i32>>,
}

impl FastPforDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            words: Vec::new(),
            exceptions: (0..33).map(|_| Vec::new()).collect(),
        }
    }

    /// Decodes `num_values` integers from the header-included FastPFOR
    /// stream in `data`. The whole slice belongs to the stream.
    pub fn decode(&mut self, data: &[u8], num_values: usize) -> Result<Vec<i32>> {
        if data.len() % 4 != 0 {
            return Err(malformed("stream length is not word aligned"));
        }
        self.words.clear();
        self.words.reserve(data.len() / 4);
        for chunk in data.chunks_exact(4) {
            self.words
                .push(i32::from_be_bytes(chunk.try_into().expect("len == 4")));
        }

        let mut out = vec![0i32; num_values];
        let mut wpos = 0usize;
        let aligned = if num_values == 0 {
            // Zero-value streams may omit even the header.
            if self.words.is_empty() { 0 } else { read_word(&self.words, &mut wpos)? as usize }
        } else {
            read_word(&self.words, &mut wpos)? as usize
        };
        if aligned > num_values || aligned % BLOCK_SIZE != 0 {
            return Err(malformed("aligned count disagrees with stream header"));
        }

        let mut outpos = 0usize;
        while outpos < aligned {
            let this_size = DEFAULT_PAGE_SIZE.min(aligned - outpos);
            self.decode_page(data, &mut wpos, &mut out[outpos..outpos + this_size])?;
            outpos += this_size;
        }

        decode_vbyte_tail(data, wpos * 4, &mut out[aligned..])?;
        Ok(out)
    }

    fn decode_page(&mut self, data: &[u8], wpos: &mut usize, out: &mut [i32]) -> Result<()> {
        let page_start = *wpos;
        let where_meta = read_word(&self.words, wpos)? as usize;
        let mut meta = page_start
            .checked_add(where_meta)
            .ok_or_else(|| malformed("page metadata offset overflows"))?;

        let byte_size = read_word(&self.words, &mut meta)? as usize;
        let container_start = meta * 4;
        let container = data
            .get(container_start..container_start + byte_size)
            .ok_or_else(|| malformed("byte container exceeds stream"))?;
        meta += words_for(byte_size);

        let bitmap = read_word(&self.words, &mut meta)? as u32;
        for width in 2..=32usize {
            self.exceptions[width].clear();
            if bitmap & (1 << (width - 1)) == 0 {
                continue;
            }
            let size = read_word(&self.words, &mut meta)? as usize;
            let rounded = size.div_ceil(32) * 32;
            self.exceptions[width].resize(rounded, 0);
            for j in (0..rounded).step_by(32) {
                if meta + width > self.words.len() {
                    return Err(malformed("exception stream exceeds stream"));
                }
                let stream = &mut self.exceptions[width];
                unpack32(&self.words[meta..], &mut stream[j..], width);
                meta += width;
            }
            self.exceptions[width].truncate(size);
        }

        let mut body = page_start + 1;
        let mut pointers = [0usize; 33];
        let mut container_pos = 0usize;
        let next_byte = |pos: &mut usize| -> Result<u8> {
            let byte = *container
                .get(*pos)
                .ok_or_else(|| malformed("byte container underrun"))?;
            *pos += 1;
            Ok(byte)
        };

        if out.len() % BLOCK_SIZE != 0 {
            return Err(malformed("page size is not block aligned"));
        }
        for block in out.chunks_exact_mut(BLOCK_SIZE) {
            let bit_width = usize::from(next_byte(&mut container_pos)?);
            let c_except = usize::from(next_byte(&mut container_pos)?);
            if bit_width > 32 {
                return Err(malformed("block bit width exceeds 32"));
            }
            if body + 8 * bit_width > self.words.len() {
                return Err(malformed("block body exceeds stream"));
            }
            unpack256(&self.words[body..], block, bit_width);
            body += 8 * bit_width;

            if c_except == 0 {
                continue;
            }
            let max_bits = usize::from(next_byte(&mut container_pos)?);
            if max_bits > 32 || max_bits <= bit_width {
                return Err(malformed("invalid exception bit width"));
            }
            let index = max_bits - bit_width;
            if index == 1 {
                // Single excess bit: the patch is implicit.
                for _ in 0..c_except {
                    let pos = usize::from(next_byte(&mut container_pos)?);
                    block[pos] |= 1 << bit_width;
                }
            } else {
                let stream = &self.exceptions[index];
                if pointers[index] + c_except > stream.len() {
                    return Err(malformed("exception count exceeds exception stream"));
                }
                for _ in 0..c_except {
                    let pos = usize::from(next_byte(&mut container_pos)?);
                    let high = stream[pointers[index]];
                    pointers[index] += 1;
                    block[pos] |= high << bit_width;
                }
            }
        }

        // Every patched stream must be fully consumed.
        for (width, stream) in self.exceptions.iter().enumerate() {
            if !stream.is_empty() && pointers[width] != stream.len() {
                return Err(malformed("exception count mismatch"));
            }
        }

        *wpos = meta;
        Ok(())
    }
}

impl Default for FastPforDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn read_word(words: &[i32], pos: &mut usize) -> Result<i32> {
    let word = *words
        .get(*pos)
        .ok_or_else(|| malformed("unexpected end of stream"))?;
    *pos += 1;
    Ok(word)
}

fn decode_vbyte_tail(data: &[u8], start: usize, out: &mut [i32]) -> Result<()> {
    if out.is_empty() {
        return Ok(());
    }
    let tail = data
        .get(start..)
        .ok_or_else(|| malformed("VByte tail exceeds stream"))?;
    let mut produced = 0usize;
    let mut value = 0u32;
    let mut shift = 0u32;
    for &byte in tail {
        if byte & 0x80 == 0 {
            value |= u32::from(byte) << shift;
            shift += 7;
        } else {
            value |= u32::from(byte & 0x7F) << shift;
            out[produced] = value as i32;
            produced += 1;
            value = 0;
            shift = 0;
            if produced == out.len() {
                return Ok(());
            }
        }
    }
    Err(malformed("VByte tail truncated"))
}

/// Caller-owned encoder scratch. Encoding through one workspace is not
/// reentrant; parallel encoders must each bring their own.
pub struct Workspace {
    exceptions: Vec<Vec<i32>>,
    container: Vec<u8>,
    lane_scratch: [i32; 32],
}

impl Workspace {
    #[must_use]
    pub fn new() -> Self {
        Self {
            exceptions: (0..33).map(|_| Vec::new()).collect(),
            container: Vec::new(),
            lane_scratch: [0; 32],
        }
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared lazily-initialized workspace. Round-trip tests use it so they do
/// not each allocate scratch; production decode paths never touch it.
pub fn shared_workspace() -> &'static Mutex<Workspace> {
    static WORKSPACE: OnceLock<Mutex<Workspace>> = OnceLock::new();
    WORKSPACE.get_or_init(|| Mutex::new(Workspace::new()))
}

/// Reference encoder producing the header-included stream decoded by
/// [`FastPforDecoder::decode`]. Exists to feed round-trip tests.
pub fn encode(input: &[i32], workspace: &mut Workspace) -> Vec<u8> {
    encode_with_page_size(input, workspace, DEFAULT_PAGE_SIZE)
}

pub fn encode_with_page_size(input: &[i32], workspace: &mut Workspace, page_size: usize) -> Vec<u8> {
    let page_size = page_size.div_ceil(BLOCK_SIZE).max(1) * BLOCK_SIZE;
    let aligned = input.len() / BLOCK_SIZE * BLOCK_SIZE;

    let mut out = Vec::new();
    push_word(&mut out, aligned as i32);
    let mut pos = 0usize;
    while pos < aligned {
        let this_size = page_size.min(aligned - pos);
        encode_page(&input[pos..pos + this_size], workspace, &mut out);
        pos += this_size;
    }
    encode_vbyte_tail(&input[aligned..], &mut out);
    out
}

fn encode_page(page: &[i32], ws: &mut Workspace, out: &mut Vec<u8>) {
    let page_start = out.len();
    push_word(out, 0); // where_meta, backpatched below

    ws.container.clear();
    for stream in &mut ws.exceptions {
        stream.clear();
    }

    for block in page.chunks_exact(BLOCK_SIZE) {
        let (bit_width, c_except, max_bits) = best_block_width(block);
        ws.container.push(bit_width as u8);
        ws.container.push(c_except as u8);
        if c_except > 0 {
            ws.container.push(max_bits as u8);
            let index = max_bits - bit_width;
            for (pos, &value) in block.iter().enumerate() {
                if (value as u32) >> bit_width != 0 {
                    ws.container.push(pos as u8);
                    if index != 1 {
                        ws.exceptions[index].push(((value as u32) >> bit_width) as i32);
                    }
                }
            }
        }
        for lane in 0..BLOCK_SIZE / 32 {
            let mut packed = [0i32; 32];
            pack32(&block[lane * 32..], &mut packed, bit_width);
            for &word in &packed[..bit_width] {
                push_word(out, word);
            }
        }
    }

    let where_meta = ((out.len() - page_start) / 4) as i32;
    out[page_start..page_start + 4].copy_from_slice(&where_meta.to_be_bytes());

    push_word(out, ws.container.len() as i32);
    out.extend_from_slice(&ws.container);
    while out.len() % 4 != 0 {
        out.push(0);
    }

    let mut bitmap = 0i32;
    for width in 2..=32usize {
        if !ws.exceptions[width].is_empty() {
            bitmap |= 1 << (width - 1);
        }
    }
    push_word(out, bitmap);
    for width in 2..=32usize {
        let stream = &ws.exceptions[width];
        if stream.is_empty() {
            continue;
        }
        push_word(out, stream.len() as i32);
        let rounded = stream.len().div_ceil(32) * 32;
        for j in (0..rounded).step_by(32) {
            ws.lane_scratch.fill(0);
            let available = (stream.len() - j).min(32);
            ws.lane_scratch[..available].copy_from_slice(&stream[j..j + available]);
            let mut packed = [0i32; 32];
            pack32(&ws.lane_scratch, &mut packed, width);
            for &word in &packed[..width] {
                push_word(out, word);
            }
        }
    }
}

/// Picks the block bit width minimizing body bits plus exception cost.
fn best_block_width(block: &[i32]) -> (usize, usize, usize) {
    let mut freqs = [0usize; 33];
    for &value in block {
        freqs[32 - (value as u32).leading_zeros() as usize] += 1;
    }
    let mut max_bits = 32;
    while freqs[max_bits] == 0 && max_bits > 0 {
        max_bits -= 1;
    }
    let mut best_width = max_bits;
    let mut best_cost = best_width * BLOCK_SIZE;
    let mut best_except = 0usize;
    let mut c_except = 0usize;
    for width in (0..max_bits).rev() {
        c_except += freqs[width + 1];
        if c_except == BLOCK_SIZE {
            break;
        }
        let mut cost =
            c_except * EXCEPTION_OVERHEAD_BITS + c_except * (max_bits - width) + width * BLOCK_SIZE + 8;
        if max_bits - width == 1 {
            cost -= c_except;
        }
        if cost < best_cost {
            best_cost = cost;
            best_width = width;
            best_except = c_except;
        }
    }
    (best_width, best_except, max_bits)
}

fn encode_vbyte_tail(values: &[i32], out: &mut Vec<u8>) {
    for &value in values {
        let mut v = value as u32;
        while v >= 0x80 {
            out.push((v & 0x7F) as u8);
            v >>= 7;
        }
        out.push((v as u8) | 0x80);
    }
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

fn push_word(out: &mut Vec<u8>, word: i32) {
    out.extend_from_slice(&word.to_be_bytes());
}
