//! Stream encoders.
//!
//! Four routines cover the format's eight encode behaviors: plain prefix
//! codes, run-length interleaving, swap windows, and both combined, each with
//! an optional [`IndexWriter`] side channel emitting one checkpoint per
//! [`INDEX_PART_SIZE`] characters.

use crate::codec::bits::{BitSink, EncodeMap, SwapSlot};
use crate::codec::container::{IndexEntry, INDEX_PART_SIZE};
use crate::codes::{CodeSet, MAX_RUN_LENGTH, MAX_SWAP_RUN_LENGTH, MIN_RUN_LENGTH, RLE_SYMBOL};
use crate::error::SeqError;

/// Collects index entries as the encoder passes checkpoint characters.
pub(crate) struct IndexWriter {
    entries: Vec<IndexEntry>,
    /// Characters until the next checkpoint.
    counter: i64,
    /// Entries emitted inside the currently open swap window.
    tagged: usize,
}

impl IndexWriter {
    pub fn new(n_entries: usize) -> IndexWriter {
        IndexWriter {
            entries: Vec::with_capacity(n_entries),
            counter: INDEX_PART_SIZE as i64 - 1,
            tagged: 0,
        }
    }

    fn emit(&mut self, sink: &BitSink) -> &mut IndexEntry {
        let (block, bit) = sink.checkpoint();
        self.entries.push(IndexEntry {
            block,
            bit,
            rle_shift: 0,
            swap_shift: 0,
        });
        self.entries.last_mut().unwrap()
    }

    /// Call before encoding each character.
    pub fn tick(&mut self, sink: &BitSink) {
        self.counter -= 1;
        if self.counter < 0 {
            self.counter += INDEX_PART_SIZE as i64;
            self.emit(sink);
        }
    }

    /// `tick` variant for swap encoders: also records the window counter.
    pub fn tick_swap(&mut self, sink: &BitSink, swap_counter: i32) {
        self.counter -= 1;
        if self.counter < 0 {
            self.counter += INDEX_PART_SIZE as i64;
            let entry = self.emit(sink);
            entry.swap_shift = swap_counter as u16;
            self.tagged += 1;
        }
    }

    /// Call before emitting a run triple covering `repeated` characters.
    /// When the triple straddles a checkpoint, the entry points at the
    /// triple and records how many of its characters precede the boundary.
    pub fn run_entry(&mut self, sink: &BitSink, repeated: i64) {
        if self.counter < repeated {
            let counter = self.counter;
            let entry = self.emit(sink);
            entry.rle_shift = counter as u16;
            self.counter += INDEX_PART_SIZE as i64;
        }
        self.counter -= repeated;
    }

    /// `run_entry` variant that also records the swap window counter.
    pub fn run_entry_swap(&mut self, sink: &BitSink, repeated: i64, swap_counter: i32) {
        if self.counter < repeated {
            let counter = self.counter;
            let entry = self.emit(sink);
            entry.rle_shift = counter as u16;
            entry.swap_shift = swap_counter as u16;
            self.tagged += 1;
            self.counter += INDEX_PART_SIZE as i64;
        }
        self.counter -= repeated;
    }

    /// Adjusts entries emitted inside the closing window: a resuming decoder
    /// must consult the swap table after the masters seen since the entry,
    /// not since the window opened.
    pub fn close_swap_window(&mut self, swap_counter: i32) {
        let adjust = swap_counter.max(0) as u16;
        let first = self.entries.len() - self.tagged;
        for entry in &mut self.entries[first..] {
            entry.swap_shift -= adjust;
        }
        self.tagged = 0;
    }

    pub fn into_entries(self) -> Vec<IndexEntry> {
        self.entries
    }
}

pub(crate) fn encode_plain(
    input: &[u8],
    code: &CodeSet,
    sink: &mut BitSink,
    mut index: Option<&mut IndexWriter>,
) -> Result<(), SeqError> {
    let map = EncodeMap::masters(code);
    for &c in input {
        if let Some(ix) = index.as_deref_mut() {
            ix.tick(sink);
        }
        let e = map.lookup(c)?;
        sink.push(e.code as u64, e.code_length as u32);
    }
    sink.flush();
    Ok(())
}

fn write_run(
    map: &EncodeMap,
    recent: u8,
    repeated: i64,
    sink: &mut BitSink,
    mut index: Option<&mut IndexWriter>,
) -> Result<(), SeqError> {
    if repeated < MIN_RUN_LENGTH as i64 {
        let e = map.lookup(recent)?;
        for _ in 0..repeated {
            if let Some(ix) = index.as_deref_mut() {
                ix.tick(sink);
            }
            sink.push(e.code as u64, e.code_length as u32);
        }
    } else {
        let character = map.lookup(recent)?;
        let escape = map.lookup(RLE_SYMBOL)?;
        if let Some(ix) = index.as_deref_mut() {
            ix.run_entry(sink, repeated);
        }
        let triple = ((escape.code as u64) << (8 + character.code_length))
            | (((repeated - MIN_RUN_LENGTH as i64) as u64) << character.code_length)
            | character.code as u64;
        sink.push(
            triple,
            character.code_length as u32 + escape.code_length as u32 + 8,
        );
    }
    Ok(())
}

pub(crate) fn encode_rle(
    input: &[u8],
    code: &CodeSet,
    sink: &mut BitSink,
    mut index: Option<&mut IndexWriter>,
) -> Result<(), SeqError> {
    let map = EncodeMap::masters(code);
    let mut chars = input.iter().copied();
    let Some(mut recent) = chars.next() else {
        sink.flush();
        return Ok(());
    };
    let mut repeated: i64 = 0;
    for current in chars {
        repeated += 1;
        if current != recent || repeated >= MAX_RUN_LENGTH as i64 - 1 {
            write_run(&map, recent, repeated, sink, index.as_deref_mut())?;
            recent = current;
            repeated = 0;
        }
    }
    repeated += 1;
    write_run(&map, recent, repeated, sink, index.as_deref_mut())?;
    sink.flush();
    Ok(())
}

/// Open swap window state: the reserved counter slot and the number of
/// master occurrences it may still absorb.
struct SwapWindow {
    slot: SwapSlot,
    counter: i32,
}

impl SwapWindow {
    fn open(sink: &mut BitSink) -> SwapWindow {
        SwapWindow {
            slot: sink.reserve_swap_slot(),
            counter: MAX_SWAP_RUN_LENGTH as i32,
        }
    }

    /// Patches the current slot with `position` and opens the next window.
    fn close(
        &mut self,
        sink: &mut BitSink,
        position: u16,
        index: Option<&mut IndexWriter>,
    ) {
        if let Some(ix) = index {
            ix.close_swap_window(self.counter);
        }
        sink.patch_swap_slot(self.slot, position);
        self.slot = sink.reserve_swap_slot();
        self.counter = MAX_SWAP_RUN_LENGTH as i32;
    }

    fn position(&self) -> u16 {
        if self.counter < 0 {
            MAX_SWAP_RUN_LENGTH as u16
        } else {
            (MAX_SWAP_RUN_LENGTH as i32 - self.counter) as u16
        }
    }
}

pub(crate) fn encode_swap(
    input: &[u8],
    code: &CodeSet,
    sink: &mut BitSink,
    mut index: Option<&mut IndexWriter>,
) -> Result<(), SeqError> {
    let master_map = EncodeMap::masters(code);
    let swap_map = EncodeMap::swapped(code);
    let master = code.master_symbol();
    let master_entry = master_map.lookup(master)?;
    let mut window = SwapWindow::open(sink);

    for &c in input {
        if let Some(ix) = index.as_deref_mut() {
            ix.tick_swap(sink, window.counter);
        }
        match swap_map.get(c) {
            None => {
                let e = master_map.lookup(c)?;
                sink.push(e.code as u64, e.code_length as u32);
            }
            Some(swap_entry) => {
                sink.push(master_entry.code as u64, master_entry.code_length as u32);
                if c == master {
                    window.counter -= 1;
                }
                if c != master || window.counter < 0 {
                    let position = window.position();
                    sink.push(swap_entry.code as u64, swap_entry.code_length as u32);
                    window.close(sink, position, index.as_deref_mut());
                }
            }
        }
    }
    sink.flush();
    if let Some(ix) = index.as_deref_mut() {
        ix.close_swap_window(window.counter);
    }
    sink.patch_swap_slot(window.slot, MAX_SWAP_RUN_LENGTH as u16);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn write_swap_run(
    recent: u8,
    repeated: i64,
    master_map: &EncodeMap,
    swap_map: &EncodeMap,
    master: u8,
    sink: &mut BitSink,
    window: &mut SwapWindow,
    mut index: Option<&mut IndexWriter>,
) -> Result<(), SeqError> {
    let master_entry = master_map.lookup(master)?;
    if repeated < MIN_RUN_LENGTH as i64 {
        match swap_map.get(recent) {
            None => {
                let e = master_map.lookup(recent)?;
                for _ in 0..repeated {
                    if let Some(ix) = index.as_deref_mut() {
                        ix.tick_swap(sink, window.counter);
                    }
                    sink.push(e.code as u64, e.code_length as u32);
                }
            }
            Some(swap_entry) => {
                for _ in 0..repeated {
                    if let Some(ix) = index.as_deref_mut() {
                        ix.tick_swap(sink, window.counter);
                    }
                    sink.push(master_entry.code as u64, master_entry.code_length as u32);
                    if recent == master {
                        window.counter -= 1;
                    }
                    if recent != master || window.counter < 0 {
                        let position = window.position();
                        sink.push(swap_entry.code as u64, swap_entry.code_length as u32);
                        window.close(sink, position, index.as_deref_mut());
                    }
                }
            }
        }
        return Ok(());
    }

    if let Some(ix) = index.as_deref_mut() {
        ix.run_entry_swap(sink, repeated, window.counter);
    }

    // Escape symbol, possibly through the swap partition.
    match master_map.get(RLE_SYMBOL) {
        Some(escape) => {
            sink.push(escape.code as u64, escape.code_length as u32);
            if master == RLE_SYMBOL {
                window.counter -= 1;
                if window.counter < 0 {
                    let swap_entry = swap_map.lookup(RLE_SYMBOL)?;
                    sink.push(swap_entry.code as u64, swap_entry.code_length as u32);
                    window.close(sink, MAX_SWAP_RUN_LENGTH as u16, index.as_deref_mut());
                }
            }
        }
        None => {
            sink.push(master_entry.code as u64, master_entry.code_length as u32);
            let position = window.position();
            let swap_entry = swap_map.lookup(RLE_SYMBOL)?;
            sink.push(swap_entry.code as u64, swap_entry.code_length as u32);
            window.close(sink, position, index.as_deref_mut());
        }
    }

    sink.push((repeated - MIN_RUN_LENGTH as i64) as u64, 8);

    // The repeated character itself.
    match swap_map.get(recent) {
        None => {
            let e = master_map.lookup(recent)?;
            sink.push(e.code as u64, e.code_length as u32);
        }
        Some(swap_entry) => {
            sink.push(master_entry.code as u64, master_entry.code_length as u32);
            if recent == master {
                window.counter -= 1;
            }
            if recent != master || window.counter < 0 {
                let position = window.position();
                sink.push(swap_entry.code as u64, swap_entry.code_length as u32);
                window.close(sink, position, index.as_deref_mut());
            }
        }
    }
    Ok(())
}

pub(crate) fn encode_swap_rle(
    input: &[u8],
    code: &CodeSet,
    sink: &mut BitSink,
    mut index: Option<&mut IndexWriter>,
) -> Result<(), SeqError> {
    let master_map = EncodeMap::masters(code);
    let swap_map = EncodeMap::swapped(code);
    let master = code.master_symbol();
    let mut window = SwapWindow::open(sink);

    let mut chars = input.iter().copied();
    if let Some(mut recent) = chars.next() {
        let mut repeated: i64 = 0;
        for current in chars {
            repeated += 1;
            if current != recent || repeated >= MAX_RUN_LENGTH as i64 - 1 {
                write_swap_run(
                    recent,
                    repeated,
                    &master_map,
                    &swap_map,
                    master,
                    sink,
                    &mut window,
                    index.as_deref_mut(),
                )?;
                recent = current;
                repeated = 0;
            }
        }
        repeated += 1;
        write_swap_run(
            recent,
            repeated,
            &master_map,
            &swap_map,
            master,
            sink,
            &mut window,
            index.as_deref_mut(),
        )?;
    }
    sink.flush();
    if let Some(ix) = index.as_deref_mut() {
        ix.close_swap_window(window.counter);
    }
    sink.patch_swap_slot(window.slot, MAX_SWAP_RUN_LENGTH as u16);
    Ok(())
}
