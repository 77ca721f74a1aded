//! Adaptive Huffman tree in the style of Vitter's algorithm.
//! This is used by the `lzhuff` module.  Nodes live in a fixed arena and
//! refer to each other by index, so swaps and re-grafts are pure index
//! surgery.  Leaf slots are fixed per symbol: `node[sym]` is always the
//! leaf for `sym`, whether or not it has been grafted into the tree yet.
//!
//! Each node carries its current codeword path, stored with the first
//! (root-side) bit in the least significant position so it can be written
//! LSB-first without reversal.  Any structural change reruns a subtree
//! path refresh before the next emission.
//!
//! The tree saturates rather than misbehave: once the depth would reach 63
//! or a frequency would overflow, updates are silently dropped and the
//! code book stops adapting.

const NIL: i32 = -1;

#[derive(Clone,Copy)]
struct Node {
    freq: u64,
    path: u64,
    bits: i32,
    parent: i32,
    left: i32,
    right: i32
}

const EMPTY: Node = Node {
    freq: 0,
    path: 0,
    bits: 0,
    parent: NIL,
    left: NIL,
    right: NIL
};

pub struct HuffTree {
    node: Vec<Node>,
    /// leaf count, a power of two; node array holds 2*leaves-1 slots
    leaves: usize,
    /// symbol whose leaf is the not-yet-transmitted escape
    nyt: usize,
    /// internal slots are handed out from the top down
    next: usize,
    /// max codeword length seen since the last root path refresh
    depth: i32,
    frozen: bool
}

impl HuffTree {
    pub fn new(leaves: usize,nyt: usize) -> Self {
        assert!(leaves.is_power_of_two() && leaves >= 8 && nyt < leaves);
        Self {
            node: vec![EMPTY;2*leaves-1],
            leaves,
            nyt,
            next: 2*leaves - 2,
            depth: 0,
            frozen: false
        }
    }
    pub fn root(&self) -> i32 {
        (2*self.leaves - 2) as i32
    }
    pub fn is_leaf(&self,ix: i32) -> bool {
        (ix as usize) < self.leaves
    }
    /// has this symbol been grafted into the tree yet
    pub fn seen(&self,sym: usize) -> bool {
        self.node[sym].bits != 0
    }
    pub fn frozen(&self) -> bool {
        self.frozen
    }
    /// current codeword for a grafted symbol, LSB-first
    pub fn path(&self,sym: usize) -> (u64,u32) {
        (self.node[sym].path,self.node[sym].bits as u32)
    }
    /// one step of a decode walk; NIL means the stream is garbage
    pub fn step(&self,ix: i32,bit: u64) -> i32 {
        match bit {
            0 => self.node[ix as usize].left,
            _ => self.node[ix as usize].right
        }
    }
    fn update_freq(&mut self,ix: i32) {
        let left = self.node[ix as usize].left;
        let right = self.node[ix as usize].right;
        self.node[ix as usize].freq =
            (if left != NIL { self.node[left as usize].freq } else { 0 }) +
            (if right != NIL { self.node[right as usize].freq } else { 0 });
    }
    /// Recompute bit lengths and paths below `ix`, whose own path must
    /// already be correct.
    fn update_paths(&mut self,ix: i32) {
        if ix == self.root() {
            self.depth = 0;
        }
        let bits = self.node[ix as usize].bits;
        let path = self.node[ix as usize].path;
        let left = self.node[ix as usize].left;
        let right = self.node[ix as usize].right;
        if left != NIL {
            self.node[left as usize].bits = bits + 1;
            self.node[left as usize].path = path;
            self.update_paths(left);
        }
        if right != NIL {
            self.node[right as usize].bits = bits + 1;
            self.node[right as usize].path = path | (1u64 << bits);
            self.update_paths(right);
        }
        if bits > self.depth {
            self.depth = bits;
        }
    }
    /// Restore the sibling rule at `ix`'s parent: the heavier sibling sits
    /// on the right.  Returns the node now occupying `ix`'s old position.
    fn swap_siblings(&mut self,ix: i32) -> i32 {
        if ix == self.root() {
            return ix;
        }
        let pix = self.node[ix as usize].parent;
        let left = self.node[pix as usize].left;
        let right = self.node[pix as usize].right;
        if left != NIL && right != NIL && self.node[left as usize].freq > self.node[right as usize].freq {
            self.node[pix as usize].left = right;
            self.node[pix as usize].right = left;
            // the swap changed every path below the parent
            self.update_paths(pix);
            return if ix == left { right } else { left };
        }
        ix
    }
    /// Vitter's local move: a right child that outweighs its aunt/uncle is
    /// grafted at the grandparent level, and the aunt/uncle takes its place.
    fn move_up(&mut self,ix: i32) {
        let pix = self.node[ix as usize].parent;
        let gix = self.node[pix as usize].parent;
        let parent_is_left = pix == self.node[gix as usize].left;
        let psx = match parent_is_left {
            true => self.node[gix as usize].right,
            false => self.node[gix as usize].left
        };
        if psx == NIL {
            return;
        }
        if self.node[ix as usize].freq > self.node[psx as usize].freq {
            self.node[ix as usize].parent = gix;
            match parent_is_left {
                true => self.node[gix as usize].right = ix,
                false => self.node[gix as usize].left = ix
            }
            self.node[pix as usize].right = psx;
            self.node[psx as usize].parent = pix;
            self.update_freq(pix);
            self.update_freq(gix);
            self.swap_siblings(ix);
            self.swap_siblings(psx);
            self.swap_siblings(pix);
            self.update_paths(gix);
            self.frequency_changed(gix);
        }
    }
    /// Propagate a frequency change from `ix` to the root, repairing the
    /// sibling rule at each level.
    fn frequency_changed(&mut self,ix: i32) {
        let pix = self.node[ix as usize].parent;
        let ix = match pix {
            NIL => {
                self.update_freq(ix);
                self.swap_siblings(ix)
            },
            _ => {
                self.update_freq(pix);
                let moved = self.swap_siblings(ix);
                self.frequency_changed(pix);
                moved
            }
        };
        if pix != NIL && self.node[pix as usize].parent != NIL && ix == self.node[pix as usize].right {
            self.move_up(ix);
        }
    }
    /// Graft a previously unseen symbol.  The first two grafts hang off the
    /// root; after that the current NYT leaf is split, keeping the escape
    /// reachable.  Returns false when the tree cannot grow any further.
    pub fn insert(&mut self,sym: usize) -> bool {
        let root = self.root();
        self.node[sym].freq = 1;
        let attach_point: i32;
        if self.node[root as usize].right == NIL {
            self.node[root as usize].right = sym as i32;
            self.node[sym].parent = root;
            attach_point = root;
        } else if self.node[root as usize].left == NIL {
            self.node[root as usize].left = sym as i32;
            self.node[sym].parent = root;
            attach_point = root;
        } else {
            let p = self.nyt as i32;
            if self.next == self.leaves || self.node[p as usize].bits >= 62 {
                self.frozen = true;
                return false;
            }
            self.next -= 1;
            let nix = self.next as i32;
            self.node[nix as usize] = Node {
                freq: self.node[p as usize].freq,
                path: self.node[p as usize].path,
                bits: self.node[p as usize].bits,
                parent: self.node[p as usize].parent,
                left: p,
                right: NIL
            };
            let pp = self.node[p as usize].parent;
            if self.node[pp as usize].left == p {
                self.node[pp as usize].left = nix;
            } else {
                self.node[pp as usize].right = nix;
            }
            self.node[p as usize].parent = nix;
            self.node[p as usize].bits += 1;
            self.node[nix as usize].right = sym as i32;
            self.node[sym].parent = nix;
            self.node[sym].bits = self.node[nix as usize].bits + 1;
            self.node[sym].path = self.node[nix as usize].path | (1u64 << self.node[nix as usize].bits);
            self.update_freq(nix);
            attach_point = nix;
        }
        let moved = self.swap_siblings(sym as i32);
        self.frequency_changed(moved);
        self.update_paths(attach_point);
        true
    }
    /// Count one more occurrence of a grafted symbol and repair the tree.
    /// Saturation silences the update instead of corrupting the code book.
    pub fn bump(&mut self,sym: usize) {
        if self.frozen || self.node[sym].parent == NIL {
            return;
        }
        if self.depth < 63 && self.node[sym].freq < u64::MAX - 1 {
            self.node[sym].freq += 1;
            self.frequency_changed(sym as i32);
        } else {
            self.frozen = true;
        }
    }
}

// *************** TESTS *****************

#[cfg(test)]
fn check_sibling_rule(t: &HuffTree) {
    for ix in t.leaves..2*t.leaves-1 {
        let n = &t.node[ix];
        if n.left != NIL && n.right != NIL {
            assert!(t.node[n.right as usize].freq >= t.node[n.left as usize].freq,
                "node {}: left {} outweighs right {}",ix,
                t.node[n.left as usize].freq,t.node[n.right as usize].freq);
        }
        if n.left != NIL || n.right != NIL {
            let mut sum = 0;
            if n.left != NIL { sum += t.node[n.left as usize].freq; }
            if n.right != NIL { sum += t.node[n.right as usize].freq; }
            assert_eq!(n.freq,sum);
        }
    }
}

#[cfg(test)]
fn check_paths(t: &HuffTree) {
    for sym in 0..t.leaves {
        if !t.seen(sym) {
            continue;
        }
        let (path,bits) = t.path(sym);
        assert!(bits > 0 && bits < 64);
        let mut ix = t.root();
        for b in 0..bits {
            ix = t.step(ix,(path >> b) & 1);
            assert!(ix != NIL);
            if b + 1 < bits {
                assert!(!t.is_leaf(ix));
            }
        }
        assert_eq!(ix as usize,sym);
    }
}

#[test]
fn grows_and_keeps_sibling_rule() {
    let mut t = HuffTree::new(512,286);
    t.insert(286);
    // skewed symbol traffic
    let syms = [65usize,65,66,65,67,65,65,68,66,65,65,65,69,66,67,65];
    for s in syms {
        if !t.seen(s) {
            t.insert(s);
        } else {
            t.bump(s);
        }
        check_sibling_rule(&t);
        check_paths(&t);
    }
    assert!(t.seen(286));
    assert!(!t.frozen());
}

#[test]
fn heavy_symbol_gets_short_code() {
    let mut t = HuffTree::new(512,286);
    t.insert(286);
    for s in 0..32usize {
        t.insert(s);
    }
    for _i in 0..2000 {
        t.bump(7);
    }
    check_sibling_rule(&t);
    check_paths(&t);
    let (_p7,b7) = t.path(7);
    let (_p8,b8) = t.path(8);
    assert!(b7 < b8,"dominant symbol got {} bits, rare one {}",b7,b8);
}

#[test]
fn every_symbol_reachable_after_full_load() {
    let mut t = HuffTree::new(32,30);
    t.insert(30);
    for s in 0..30usize {
        t.insert(s);
        t.bump(s % 7);
    }
    check_sibling_rule(&t);
    check_paths(&t);
    for s in 0..30usize {
        assert!(t.seen(s));
    }
}
