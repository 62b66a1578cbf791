//! Tagged zone memory
//!
//! Every renderer-owned allocation goes through here instead of the global
//! allocator, so lifetime is driven by purge tags (free a whole class at
//! level unload, purge caches under pressure) rather than per-allocation
//! bookkeeping. Blocks live in an arena and are addressed by
//! generation-checked handles; each tag keeps its blocks on a circular
//! next/prev ring so tag-wide frees walk the ring in O(blocks).

use std::cell::Cell;
use std::rc::Rc;

/// Live-block signature, cleared on free. A handle that reaches a block
/// without it means a double free or heap corruption.
const ZONE_SIG: u32 = 0x001d_4a11;

const NUM_TAGS: usize = 4;

/// Lifetime class of a zone block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurgeTag {
    /// Lives for the whole process
    Static,
    /// Pinned; never purged automatically
    Locked,
    /// Freed in bulk at level unload
    Level,
    /// Purgeable at any moment to satisfy another allocation
    Cache,
}

impl PurgeTag {
    fn index(self) -> usize {
        match self {
            PurgeTag::Static => 0,
            PurgeTag::Locked => 1,
            PurgeTag::Level => 2,
            PurgeTag::Cache => 3,
        }
    }
}

/// Generation-checked reference to a zone block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handle {
    index: u32,
    gen: u32,
}

/// Weak back-reference registered by the owner of a purgeable block.
/// The zone nulls it when the block is freed or purged, which is how the
/// owner learns its cached data is gone.
pub type OwnerSlot = Rc<Cell<Option<Handle>>>;

/// Create an empty owner slot
pub fn owner_slot() -> OwnerSlot {
    Rc::new(Cell::new(None))
}

struct Block {
    data: Vec<u8>,
    tag: PurgeTag,
    gen: u32,
    sig: u32,
    live: bool,
    // circular ring links within the tag (arena indices)
    next: u32,
    prev: u32,
    owner: Option<OwnerSlot>,
}

/// The zone heap: an arena of tagged blocks with a byte budget standing in
/// for the platform allocator's capacity.
pub struct Zone {
    blocks: Vec<Block>,
    free_slots: Vec<u32>,
    heads: [Option<u32>; NUM_TAGS],
    budget: usize,
    used: usize,
    used_by_tag: [usize; NUM_TAGS],
}

impl Zone {
    pub fn new(budget: usize) -> Self {
        Self {
            blocks: Vec::new(),
            free_slots: Vec::new(),
            heads: [None; NUM_TAGS],
            budget,
            used: 0,
            used_by_tag: [0; NUM_TAGS],
        }
    }

    /// Allocate `size` bytes under `tag`.
    ///
    /// A zero size returns `None` (and nulls the owner slot) without touching
    /// the heap. A `Cache` allocation must register an owner slot: purgeable
    /// memory nothing can null out would dangle invisibly. If the budget is
    /// exhausted the whole Cache ring is purged and the allocation retried
    /// once; failing that the process cannot usefully continue.
    pub fn alloc(&mut self, size: usize, tag: PurgeTag, owner: Option<&OwnerSlot>) -> Option<Handle> {
        if size == 0 {
            if let Some(slot) = owner {
                slot.set(None);
            }
            return None;
        }
        if tag == PurgeTag::Cache && owner.is_none() {
            panic!("zone: Cache allocation of {} bytes without an owner slot", size);
        }
        if self.used + size > self.budget {
            self.free_tag(PurgeTag::Cache);
            if self.used + size > self.budget {
                panic!("zone: failed to allocate {} bytes ({} of {} in use)", size, self.used, self.budget);
            }
        }

        let index = match self.free_slots.pop() {
            Some(i) => i,
            None => {
                self.blocks.push(Block {
                    data: Vec::new(),
                    tag,
                    gen: 0,
                    sig: 0,
                    live: false,
                    next: 0,
                    prev: 0,
                    owner: None,
                });
                (self.blocks.len() - 1) as u32
            }
        };

        let gen = self.blocks[index as usize].gen;
        {
            let block = &mut self.blocks[index as usize];
            block.data = vec![0u8; size];
            block.tag = tag;
            block.sig = ZONE_SIG;
            block.live = true;
            block.owner = owner.cloned();
        }
        self.link(index, tag);
        self.used += size;
        self.used_by_tag[tag.index()] += size;

        let handle = Handle { index, gen };
        if let Some(slot) = owner {
            slot.set(Some(handle));
        }
        Some(handle)
    }

    /// Allocate and zero-fill
    pub fn calloc(&mut self, size: usize, tag: PurgeTag, owner: Option<&OwnerSlot>) -> Option<Handle> {
        let handle = self.alloc(size, tag, owner);
        if let Some(h) = handle {
            self.bytes_mut(h).fill(0);
        }
        handle
    }

    /// Resize by copy-free-allocate. `old == None` degenerates to `alloc`,
    /// `size == 0` to `free`.
    pub fn realloc(
        &mut self,
        old: Option<Handle>,
        size: usize,
        tag: PurgeTag,
        owner: Option<&OwnerSlot>,
    ) -> Option<Handle> {
        let Some(old) = old else {
            return self.alloc(size, tag, owner);
        };
        self.check(old);
        if size == 0 {
            self.free(old);
            if let Some(slot) = owner {
                slot.set(None);
            }
            return None;
        }
        // Detach the owner before freeing so the slot keeps the new handle,
        // then copy out and free first: if the inner alloc purges the Cache
        // ring, a still-linked old block would be freed out from under us.
        self.blocks[old.index as usize].owner = None;
        let n = size.min(self.blocks[old.index as usize].data.len());
        let src: Vec<u8> = self.blocks[old.index as usize].data[..n].to_vec();
        self.free(old);
        let new = self.alloc(size, tag, owner)?;
        self.bytes_mut(new)[..n].copy_from_slice(&src);
        Some(new)
    }

    /// Free one block. The handle must carry a valid signature; a stale or
    /// forged handle means corruption or a double free and is fatal.
    pub fn free(&mut self, handle: Handle) {
        self.check(handle);
        let tag = self.blocks[handle.index as usize].tag;
        self.unlink(handle.index, tag);

        let block = &mut self.blocks[handle.index as usize];
        if let Some(slot) = block.owner.take() {
            slot.set(None);
        }
        let size = block.data.len();
        block.data = Vec::new();
        block.sig = 0;
        block.live = false;
        block.gen = block.gen.wrapping_add(1);

        self.used -= size;
        self.used_by_tag[tag.index()] -= size;
        self.free_slots.push(handle.index);
    }

    /// Free every block of one tag by walking its ring.
    pub fn free_tag(&mut self, tag: PurgeTag) {
        let Some(head) = self.heads[tag.index()] else {
            return;
        };
        // Snapshot the tail first: freeing the head rewrites the ring, so
        // re-reading "last" mid-walk would terminate early.
        let tail = self.blocks[head as usize].prev;
        let mut cur = head;
        loop {
            let next = self.blocks[cur as usize].next;
            let at_tail = cur == tail;
            let gen = self.blocks[cur as usize].gen;
            self.free(Handle { index: cur, gen });
            if at_tail {
                break;
            }
            cur = next;
        }
    }

    /// Move a block to another tag ring without copying its bytes.
    /// Moving into `Cache` requires a registered owner slot; a same-tag move
    /// is a no-op.
    pub fn change_tag(&mut self, handle: Handle, tag: PurgeTag) {
        self.check(handle);
        let old = self.blocks[handle.index as usize].tag;
        if old == tag {
            return;
        }
        if tag == PurgeTag::Cache && self.blocks[handle.index as usize].owner.is_none() {
            panic!("zone: change_tag to Cache on a block without an owner slot");
        }
        self.unlink(handle.index, old);
        self.link(handle.index, tag);
        self.blocks[handle.index as usize].tag = tag;
        let size = self.blocks[handle.index as usize].data.len();
        self.used_by_tag[old.index()] -= size;
        self.used_by_tag[tag.index()] += size;
    }

    /// Payload of a live block
    pub fn bytes(&self, handle: Handle) -> &[u8] {
        self.check(handle);
        &self.blocks[handle.index as usize].data
    }

    /// Mutable payload of a live block
    pub fn bytes_mut(&mut self, handle: Handle) -> &mut [u8] {
        self.check(handle);
        &mut self.blocks[handle.index as usize].data
    }

    /// Bytes currently allocated under one tag
    pub fn usage(&self, tag: PurgeTag) -> usize {
        self.used_by_tag[tag.index()]
    }

    /// Total bytes allocated across all tags
    pub fn total_used(&self) -> usize {
        self.used
    }

    fn check(&self, handle: Handle) {
        let ok = (handle.index as usize) < self.blocks.len() && {
            let b = &self.blocks[handle.index as usize];
            b.live && b.sig == ZONE_SIG && b.gen == handle.gen
        };
        if !ok {
            panic!("zone: handle without a valid signature (double free or corruption)");
        }
    }

    fn link(&mut self, index: u32, tag: PurgeTag) {
        let t = tag.index();
        match self.heads[t] {
            None => {
                self.heads[t] = Some(index);
                let block = &mut self.blocks[index as usize];
                block.next = index;
                block.prev = index;
            }
            Some(head) => {
                // insert at the tail, just before the head
                let tail = self.blocks[head as usize].prev;
                self.blocks[index as usize].next = head;
                self.blocks[index as usize].prev = tail;
                self.blocks[tail as usize].next = index;
                self.blocks[head as usize].prev = index;
            }
        }
    }

    fn unlink(&mut self, index: u32, tag: PurgeTag) {
        let t = tag.index();
        let next = self.blocks[index as usize].next;
        let prev = self.blocks[index as usize].prev;
        if next == index {
            // single-element ring
            self.heads[t] = None;
        } else {
            self.blocks[prev as usize].next = next;
            self.blocks[next as usize].prev = prev;
            if self.heads[t] == Some(index) {
                self.heads[t] = Some(next);
            }
        }
    }
}
