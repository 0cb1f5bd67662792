//! The incremental streaming hasher: chunk buffering, lazy Merkle-tree assembly and extendable
//! output.
//!
//! Unlike [`crate::single_chunk`] and [`crate::const_fn`], which only ever see one chunk or one
//! block worth of input, [`Hasher`] accepts input of any length across any number of `update()`
//! calls and produces output of any length. This is the "general case" API; the const-fn and
//! single-block/single-chunk modules exist only because they can do better than this one in the
//! restricted cases they cover (no runtime dispatch, GPU-friendly, or `const` evaluation).

#[cfg(test)]
mod tests;

use crate::platform::{le_bytes_from_words_32, words_from_le_bytes_32, words_from_le_bytes_64};
use crate::portable::{compress_in_place, compress_xof, hash_many};
use crate::{
    BLOCK_LEN, BlockBytes, CHUNK_END, CHUNK_LEN, CHUNK_START, CVBytes, CVWords,
    DERIVE_KEY_CONTEXT, DERIVE_KEY_MATERIAL, IV, KEY_LEN, KEYED_HASH, OUT_LEN, PARENT, ROOT,
};
use blake3::IncrementCounter;
use core::fmt;

// BLAKE3_MAX_DEPTH in the reference implementation: with 1024-byte chunks, 2^64 bytes of input is
// at most 2^54 chunks, so the stack never needs to hold more than that many unmerged subtrees.
const MAX_DEPTH: usize = 54;

#[derive(Clone)]
struct ChunkState {
    cv: CVWords,
    chunk_counter: u64,
    buf: BlockBytes,
    buf_len: u8,
    blocks_compressed: u8,
    flags: u8,
}

impl ChunkState {
    fn new(key: &CVWords, chunk_counter: u64, flags: u8) -> Self {
        Self {
            cv: *key,
            chunk_counter,
            buf: [0; BLOCK_LEN],
            buf_len: 0,
            blocks_compressed: 0,
            flags,
        }
    }

    fn reset(&mut self, key: &CVWords, chunk_counter: u64) {
        self.cv = *key;
        self.chunk_counter = chunk_counter;
        self.buf = [0; BLOCK_LEN];
        self.buf_len = 0;
        self.blocks_compressed = 0;
    }

    fn len(&self) -> usize {
        BLOCK_LEN * self.blocks_compressed as usize + self.buf_len as usize
    }

    fn start_flag(&self) -> u8 {
        if self.blocks_compressed == 0 {
            CHUNK_START
        } else {
            0
        }
    }

    fn fill_buf(&mut self, input: &mut &[u8]) {
        let want = BLOCK_LEN - self.buf_len as usize;
        let take = want.min(input.len());
        let (head, tail) = input.split_at(take);
        self.buf[self.buf_len as usize..self.buf_len as usize + take].copy_from_slice(head);
        self.buf_len += take as u8;
        *input = tail;
    }

    // Try to avoid buffering as much as possible by compressing directly from the input slice
    // when full blocks are available. Note the strict `>` below: the last block of a chunk is
    // always left in `buf`, so that `output()` can add CHUNK_END to it.
    fn update(&mut self, mut input: &[u8]) {
        if self.buf_len > 0 {
            self.fill_buf(&mut input);
            if !input.is_empty() {
                debug_assert_eq!(self.buf_len as usize, BLOCK_LEN);
                let block_flags = self.flags | self.start_flag();
                let block_words = words_from_le_bytes_64(&self.buf);
                compress_in_place(
                    &mut self.cv,
                    &block_words,
                    BLOCK_LEN as u32,
                    self.chunk_counter,
                    block_flags as u32,
                );
                self.blocks_compressed += 1;
                self.buf = [0; BLOCK_LEN];
                self.buf_len = 0;
            }
        }

        while input.len() > BLOCK_LEN {
            debug_assert_eq!(self.buf_len, 0);
            let block_flags = self.flags | self.start_flag();
            let block = input
                .first_chunk::<BLOCK_LEN>()
                .expect("loop condition guarantees at least BLOCK_LEN bytes remain; qed");
            let block_words = words_from_le_bytes_64(block);
            compress_in_place(
                &mut self.cv,
                &block_words,
                BLOCK_LEN as u32,
                self.chunk_counter,
                block_flags as u32,
            );
            self.blocks_compressed += 1;
            input = &input[BLOCK_LEN..];
        }

        self.fill_buf(&mut input);
        debug_assert!(input.is_empty());
        debug_assert!(self.len() <= CHUNK_LEN);
    }

    fn output(&self) -> Output {
        Output {
            input_chaining_value: self.cv,
            block: self.buf,
            block_len: self.buf_len,
            counter: self.chunk_counter,
            flags: self.flags | self.start_flag() | CHUNK_END,
        }
    }
}

// The "pending final compression" shared by chunks and parents: a CV can be derived from it
// cheaply, or it can be streamed as an arbitrary-length XOF if it happens to be the root.
struct Output {
    input_chaining_value: CVWords,
    block: BlockBytes,
    block_len: u8,
    counter: u64,
    flags: u8,
}

impl Output {
    fn chaining_value(&self) -> CVBytes {
        let mut cv = self.input_chaining_value;
        let block_words = words_from_le_bytes_64(&self.block);
        compress_in_place(
            &mut cv,
            &block_words,
            self.block_len as u32,
            self.counter,
            self.flags as u32,
        );
        *le_bytes_from_words_32(&cv)
    }

    // `seek` is a byte offset into the (conceptually infinite) output stream; `out` is filled
    // starting at that offset. Each 64-byte output block is just another compression of the same
    // input under ROOT and an incrementing block counter.
    fn root_output_bytes(&self, seek: u64, mut out: &mut [u8]) {
        let block_words = words_from_le_bytes_64(&self.block);
        let mut block_counter = seek / BLOCK_LEN as u64;
        let mut skip = (seek % BLOCK_LEN as u64) as usize;
        while !out.is_empty() {
            let wide = compress_xof(
                &self.input_chaining_value,
                &block_words,
                self.block_len as u32,
                block_counter,
                (self.flags | ROOT) as u32,
            );
            let available = &wide[skip..];
            let take = available.len().min(out.len());
            let (dst, rest) = out.split_at_mut(take);
            dst.copy_from_slice(&available[..take]);
            out = rest;
            skip = 0;
            block_counter += 1;
        }
    }
}

fn parent_output(block: BlockBytes, key: &CVWords, flags: u8) -> Output {
    Output {
        input_chaining_value: *key,
        block,
        block_len: BLOCK_LEN as u8,
        counter: 0,
        flags: flags | PARENT,
    }
}

// The wide-hasher contract, specialized to the serial degree-1 fallback: `platform::MAX_SIMD_DEGREE`
// is 1 in this crate, so a "batch" is always exactly one chunk. Higher-degree kernels would slot in
// here without changing anything above or below this function.
fn hash_chunk_cv(chunk: &[u8; CHUNK_LEN], key: &CVWords, chunk_counter: u64, flags: u8) -> CVBytes {
    let mut out = [0u8; OUT_LEN];
    let inputs = [chunk];
    hash_many(
        &inputs,
        key,
        chunk_counter,
        IncrementCounter::No,
        flags,
        CHUNK_START,
        CHUNK_END,
        &mut out,
    );
    out
}

/// An incremental BLAKE3 hasher that streams input of any length and produces output of any
/// length.
///
/// Cloning a `Hasher` is cheap (it holds no heap allocations) and is the standard way to fork a
/// hash computation, e.g. to finalize a prefix while continuing to feed more input into the
/// original.
#[derive(Clone)]
pub struct Hasher {
    key: CVWords,
    chunk: ChunkState,
    cv_stack: [CVBytes; MAX_DEPTH + 1],
    cv_stack_len: u8,
}

impl fmt::Debug for Hasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Deliberately don't print `key`: for keyed hashing and KDF output, that's secret material.
        f.debug_struct("Hasher")
            .field("flags", &self.chunk.flags)
            .finish_non_exhaustive()
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    fn new_internal(key: &CVWords, flags: u8) -> Self {
        Self {
            key: *key,
            chunk: ChunkState::new(key, 0, flags),
            cv_stack: [[0; OUT_LEN]; MAX_DEPTH + 1],
            cv_stack_len: 0,
        }
    }

    /// Hasher for the standard, unkeyed hash function.
    pub fn new() -> Self {
        Self::new_internal(IV, 0)
    }

    /// Hasher for the keyed hash function (MAC mode).
    pub fn new_keyed(key: &[u8; KEY_LEN]) -> Self {
        let key_words = words_from_le_bytes_32(key);
        Self::new_internal(&key_words, KEYED_HASH)
    }

    /// Hasher for the key derivation function. `context` should be a hardcoded,
    /// globally unique, application-specific string.
    pub fn new_derive_key(context: &str) -> Self {
        let mut context_hasher = Self::new_internal(IV, DERIVE_KEY_CONTEXT);
        context_hasher.update(context.as_bytes());
        let mut context_key = [0u8; KEY_LEN];
        context_hasher.finalize(&mut context_key);
        let context_key_words = words_from_le_bytes_32(&context_key);
        Self::new_internal(&context_key_words, DERIVE_KEY_MATERIAL)
    }

    /// Restores the hasher to its just-initialized state, preserving its mode and key.
    pub fn reset(&mut self) -> &mut Self {
        self.chunk.reset(&self.key, 0);
        self.cv_stack_len = 0;
        self
    }

    fn push_stack(&mut self, cv: CVBytes) {
        debug_assert!((self.cv_stack_len as usize) < self.cv_stack.len());
        self.cv_stack[self.cv_stack_len as usize] = cv;
        self.cv_stack_len += 1;
    }

    fn pop_stack(&mut self) -> CVBytes {
        self.cv_stack_len -= 1;
        self.cv_stack[self.cv_stack_len as usize]
    }

    fn needs_merge(&self, total_chunks: u64) -> bool {
        u64::from(self.cv_stack_len) > total_chunks.count_ones() as u64
    }

    fn merge_parent(&mut self) {
        let right = self.pop_stack();
        let left = self.pop_stack();
        let mut block = [0u8; BLOCK_LEN];
        block[..OUT_LEN].copy_from_slice(&left);
        block[OUT_LEN..].copy_from_slice(&right);
        let cv = parent_output(block, &self.key, self.chunk.flags).chaining_value();
        self.push_stack(cv);
    }

    // After this call, `cv_stack_len == popcount(chunk_counter + 1)`.
    fn push_chunk_cv(&mut self, cv: CVBytes, chunk_counter: u64) {
        while self.needs_merge(chunk_counter) {
            self.merge_parent();
        }
        self.push_stack(cv);
    }

    /// Adds input bytes to the hash state. Can be called any number of times.
    pub fn update(&mut self, mut input: &[u8]) -> &mut Self {
        // If we already have a partial chunk, or if this is the very first chunk (and it could be
        // the root), we need to add bytes to the chunk state.
        let is_first_chunk = self.chunk.chunk_counter == 0;
        let maybe_root = is_first_chunk && input.len() == CHUNK_LEN;
        if maybe_root || self.chunk.len() > 0 {
            let take = (CHUNK_LEN - self.chunk.len()).min(input.len());
            let (head, tail) = input.split_at(take);
            self.chunk.update(head);
            input = tail;
            // If we've filled the current chunk and there's more coming, finalize this chunk and
            // proceed. In this case we know it's not the root.
            if !input.is_empty() {
                let chunk_cv = self.chunk.output().chaining_value();
                self.push_chunk_cv(chunk_cv, self.chunk.chunk_counter);
                self.chunk.reset(&self.key, self.chunk.chunk_counter + 1);
            } else {
                return self;
            }
        }

        // Hash as many whole chunks as we can, without buffering anything. At this point we know
        // none of them can be the root.
        while input.len() >= CHUNK_LEN {
            let (chunk_bytes, rest) = input.split_at(CHUNK_LEN);
            let chunk = chunk_bytes
                .first_chunk::<CHUNK_LEN>()
                .expect("split_at(CHUNK_LEN) guarantees this length; qed");
            let cv = hash_chunk_cv(chunk, &self.key, self.chunk.chunk_counter, self.chunk.flags);
            // The chunk state is empty here, but its counter still tracks the next chunk index.
            self.push_chunk_cv(cv, self.chunk.chunk_counter);
            self.chunk.chunk_counter += 1;
            input = rest;
        }

        // If there's any remaining input less than a full chunk, add it to the chunk state. Also
        // do a final merge pass so the stack doesn't contain any unmerged pairs; this isn't
        // strictly necessary (push_chunk_cv already merges), but it simplifies finalize().
        if !input.is_empty() {
            while self.needs_merge(self.chunk.chunk_counter) {
                self.merge_parent();
            }
            self.chunk.update(input);
        }

        self
    }

    /// Writes the hash (or, in XOF mode, `out.len()` bytes of extended output) into `out`.
    /// Does not mutate the hasher: further `update()` calls extend the original input, and
    /// `finalize()` may be called again.
    pub fn finalize(&self, out: &mut [u8]) {
        self.finalize_seek(0, out);
    }

    /// Like [`Self::finalize()`], but starts the output stream at byte offset `seek`. The output
    /// stream is the same infinite sequence regardless of how it's chunked up across calls:
    /// `finalize_seek(s, buf)` always returns bytes `[s, s + buf.len())` of that stream.
    pub fn finalize_seek(&self, seek: u64, out: &mut [u8]) {
        // If the subtree stack is empty, the current (possibly partial) chunk is the root.
        if self.cv_stack_len == 0 {
            self.chunk.output().root_output_bytes(seek, out);
            return;
        }

        // If there are buffered bytes, finalize that chunk and merge it against every subtree on
        // the stack; the trailing merge loop in update() guarantees the stack needs no merging
        // among itself first. Otherwise the chunk state is empty and the top of the stack is
        // itself a chunk hash, so seed the walk with a parent of the top two entries instead.
        let mut cvs_remaining;
        let mut output;
        if self.chunk.len() > 0 {
            cvs_remaining = self.cv_stack_len as usize;
            output = self.chunk.output();
        } else {
            cvs_remaining = self.cv_stack_len as usize - 2;
            let mut block = [0u8; BLOCK_LEN];
            block[..OUT_LEN].copy_from_slice(&self.cv_stack[cvs_remaining]);
            block[OUT_LEN..].copy_from_slice(&self.cv_stack[cvs_remaining + 1]);
            output = parent_output(block, &self.key, self.chunk.flags);
        }
        while cvs_remaining > 0 {
            cvs_remaining -= 1;
            let mut block = [0u8; BLOCK_LEN];
            block[..OUT_LEN].copy_from_slice(&self.cv_stack[cvs_remaining]);
            block[OUT_LEN..].copy_from_slice(&output.chaining_value());
            output = parent_output(block, &self.key, self.chunk.flags);
        }
        output.root_output_bytes(seek, out);
    }
}
