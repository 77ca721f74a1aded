//! Sliding-window longest-match search.
//!
//! `scan_window` is the reference implementation: try every window position
//! from nearest to farthest and keep the longest match, so equal lengths
//! resolve to the smallest distance.  `SeqTree` is the accelerated index:
//! an AVL tree over the byte sequences starting at each in-window position.
//! Both must return the same `(length,distance)` for every cursor position;
//! the tests below hold them to that.

use std::cmp::Ordering;
use crate::Error;

#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub struct Match {
    pub len: usize,
    pub dist: usize
}

/// Reference search: backward scan over `[cursor-window+1,cursor-1]`.
/// A match may run past the cursor (distance < length encodes a run).
pub fn scan_window(input: &[u8],cursor: usize,window: usize,min_len: usize,max_len: usize) -> Option<Match> {
    if cursor == 0 {
        return None;
    }
    let floor = match cursor >= window {
        true => cursor - window + 1,
        false => 0
    };
    let mut best: Option<Match> = None;
    let mut j = cursor - 1;
    loop {
        let mut k = 0;
        while cursor + k < input.len() && input[j+k] == input[cursor+k] && k < max_len {
            k += 1;
        }
        if k >= min_len && k > best.map_or(0,|b| b.len) {
            best = Some(Match { len: k, dist: cursor - j });
            if k == max_len {
                break;
            }
        }
        if j == floor {
            break;
        }
        j -= 1;
    }
    best
}

const NIL: i32 = -1;

#[derive(Clone,Copy)]
struct Node {
    pos: usize,
    left: i32,
    right: i32,
    height: i32
}

/// Ordered index over the window: an arena-backed AVL tree whose keys are
/// the byte sequences starting at the stored positions, compared over at
/// most `max_len` bytes with the position as final tie break.  The arena
/// is sized once at creation; freed slots are chained for reuse.
pub struct SeqTree {
    node: Vec<Node>,
    root: i32,
    free: i32,
    max_len: usize
}

impl SeqTree {
    pub fn create(capacity: usize,max_len: usize) -> Result<Self,Error> {
        let mut node = Vec::new();
        if node.try_reserve_exact(capacity).is_err() {
            return Err(Error::NoMemory);
        }
        Ok(Self {
            node,
            root: NIL,
            free: NIL,
            max_len
        })
    }
    /// longest shared prefix of the sequences at `a` and the cursor,
    /// mirroring the bounds of the linear scan
    fn lcp(&self,input: &[u8],a: usize,cursor: usize) -> usize {
        let mut k = 0;
        while cursor + k < input.len() && input[a+k] == input[cursor+k] && k < self.max_len {
            k += 1;
        }
        k
    }
    fn cmp(&self,input: &[u8],a: usize,b: usize) -> Ordering {
        let mut k = 0;
        while k < self.max_len {
            let ab = input.get(a+k);
            let bb = input.get(b+k);
            match (ab,bb) {
                (Some(x),Some(y)) if x == y => { k += 1; },
                (Some(x),Some(y)) => return x.cmp(y),
                (None,None) => break,
                (None,Some(_)) => return Ordering::Less,
                (Some(_),None) => return Ordering::Greater
            }
        }
        a.cmp(&b)
    }
    fn height(&self,ix: i32) -> i32 {
        match ix {
            NIL => 0,
            _ => self.node[ix as usize].height
        }
    }
    fn update_height(&mut self,ix: i32) {
        let h = 1 + self.height(self.node[ix as usize].left)
            .max(self.height(self.node[ix as usize].right));
        self.node[ix as usize].height = h;
    }
    fn balance_factor(&self,ix: i32) -> i32 {
        self.height(self.node[ix as usize].left) - self.height(self.node[ix as usize].right)
    }
    fn rotate_right(&mut self,y: i32) -> i32 {
        let x = self.node[y as usize].left;
        self.node[y as usize].left = self.node[x as usize].right;
        self.node[x as usize].right = y;
        self.update_height(y);
        self.update_height(x);
        x
    }
    fn rotate_left(&mut self,x: i32) -> i32 {
        let y = self.node[x as usize].right;
        self.node[x as usize].right = self.node[y as usize].left;
        self.node[y as usize].left = x;
        self.update_height(x);
        self.update_height(y);
        y
    }
    fn balance(&mut self,ix: i32) -> i32 {
        self.update_height(ix);
        let factor = self.balance_factor(ix);
        if factor > 1 {
            if self.balance_factor(self.node[ix as usize].left) < 0 {
                let rotated = self.rotate_left(self.node[ix as usize].left);
                self.node[ix as usize].left = rotated;
            }
            return self.rotate_right(ix);
        } else if factor < -1 {
            if self.balance_factor(self.node[ix as usize].right) > 0 {
                let rotated = self.rotate_right(self.node[ix as usize].right);
                self.node[ix as usize].right = rotated;
            }
            return self.rotate_left(ix);
        }
        ix
    }
    fn alloc(&mut self,pos: usize) -> i32 {
        let ix = match self.free {
            NIL => {
                self.node.push(Node { pos, left: NIL, right: NIL, height: 1 });
                (self.node.len() - 1) as i32
            },
            ix => {
                self.free = self.node[ix as usize].right;
                self.node[ix as usize] = Node { pos, left: NIL, right: NIL, height: 1 };
                ix
            }
        };
        ix
    }
    fn release(&mut self,ix: i32) {
        self.node[ix as usize].right = self.free;
        self.free = ix;
    }
    /// index the sequence starting at `pos`
    pub fn insert(&mut self,input: &[u8],pos: usize) {
        self.root = self.insert_at(input,self.root,pos);
    }
    fn insert_at(&mut self,input: &[u8],ix: i32,pos: usize) -> i32 {
        if ix == NIL {
            return self.alloc(pos);
        }
        match self.cmp(input,pos,self.node[ix as usize].pos) {
            Ordering::Less => {
                let sub = self.insert_at(input,self.node[ix as usize].left,pos);
                self.node[ix as usize].left = sub;
            },
            _ => {
                let sub = self.insert_at(input,self.node[ix as usize].right,pos);
                self.node[ix as usize].right = sub;
            }
        }
        self.balance(ix)
    }
    /// drop the node for a position that has aged out of the window
    pub fn evict(&mut self,input: &[u8],pos: usize) {
        self.root = self.evict_at(input,self.root,pos);
    }
    fn evict_at(&mut self,input: &[u8],ix: i32,pos: usize) -> i32 {
        if ix == NIL {
            return NIL;
        }
        let here = self.node[ix as usize].pos;
        if here == pos {
            let left = self.node[ix as usize].left;
            let right = self.node[ix as usize].right;
            return match (left,right) {
                (NIL,NIL) => {
                    self.release(ix);
                    NIL
                },
                (repl,NIL) | (NIL,repl) => {
                    self.release(ix);
                    self.balance(repl)
                },
                _ => {
                    // two branches: pull up the smallest key on the right
                    let succ = self.smallest(right);
                    self.node[ix as usize].pos = succ;
                    let sub = self.evict_at(input,right,succ);
                    self.node[ix as usize].right = sub;
                    self.balance(ix)
                }
            };
        }
        match self.cmp(input,pos,here) {
            Ordering::Less => {
                let sub = self.evict_at(input,self.node[ix as usize].left,pos);
                self.node[ix as usize].left = sub;
            },
            _ => {
                let sub = self.evict_at(input,self.node[ix as usize].right,pos);
                self.node[ix as usize].right = sub;
            }
        }
        self.balance(ix)
    }
    fn smallest(&self,ix: i32) -> usize {
        let mut ix = ix;
        while self.node[ix as usize].left != NIL {
            ix = self.node[ix as usize].left;
        }
        self.node[ix as usize].pos
    }
    /// Longest-prefix search for the sequence at the cursor, longest match
    /// first and smallest distance on ties.
    pub fn find(&self,input: &[u8],cursor: usize,min_len: usize) -> Option<Match> {
        let mut best = Match { len: 0, dist: 0 };
        self.find_at(input,self.root,cursor,&mut best);
        match best.len >= min_len {
            true => Some(best),
            false => None
        }
    }
    fn find_at(&self,input: &[u8],ix: i32,cursor: usize,best: &mut Match) {
        if ix == NIL {
            return;
        }
        let pos = self.node[ix as usize].pos;
        let l = self.lcp(input,pos,cursor);
        let dist = cursor - pos;
        if l > best.len || (l > 0 && l == best.len && dist < best.dist) {
            *best = Match { len: l, dist };
        }
        // Descend toward the probe first; the far side can only hold keys
        // whose shared prefix is at most `l`, so it is worth visiting only
        // when an equal-length nearer match could still be found there.
        match self.cmp(input,cursor,pos) {
            Ordering::Less => {
                self.find_at(input,self.node[ix as usize].left,cursor,best);
                if l >= best.len {
                    self.find_at(input,self.node[ix as usize].right,cursor,best);
                }
            },
            _ => {
                self.find_at(input,self.node[ix as usize].right,cursor,best);
                if l >= best.len {
                    self.find_at(input,self.node[ix as usize].left,cursor,best);
                }
            }
        }
    }
}

// *************** TESTS *****************

#[test]
fn linear_prefers_near_matches() {
    //                0         1         2
    //                0123456789012345678901234
    let buf = "abcXabcYabcZ abcW abcabc".as_bytes();
    // cursor at the final "abc" run: nearest "abc" occurrence wins ties
    let m = scan_window(buf,21,1024,3,254).unwrap();
    assert_eq!(m.dist,3);
    assert!(m.len >= 3);
}

#[test]
fn linear_finds_overlapping_run() {
    let buf = vec![0u8;4096];
    let m = scan_window(&buf,1,1024,3,254).unwrap();
    assert_eq!(m,Match { len: 254, dist: 1 });
    let buf: Vec<u8> = (0..4096).map(|i| [1u8,2,3,4][i % 4]).collect();
    let m = scan_window(&buf,4,1024,3,254).unwrap();
    assert_eq!(m,Match { len: 254, dist: 4 });
}

#[test]
fn linear_respects_window_edge() {
    let mut buf = vec![7u8;8];
    buf.extend(vec![9u8;2048]);
    buf.extend([7u8,7,7]);
    // the run of 7s at the start is outside a 1K window by now
    assert_eq!(scan_window(&buf,2056,1024,3,254),None);
    // but a full-size window still sees it
    let m = scan_window(&buf,2056,4096,3,254).unwrap();
    assert_eq!(m,Match { len: 3, dist: 2056 - 5 });
}

#[cfg(test)]
fn drive_both(input: &[u8],window: usize,min_len: usize,max_len: usize) {
    let mut tree = SeqTree::create(window,max_len).unwrap();
    for cursor in 0..input.len() {
        let linear = scan_window(input,cursor,window,min_len,max_len);
        let accel = tree.find(input,cursor,min_len);
        assert_eq!(accel,linear,"divergence at cursor {}",cursor);
        tree.insert(input,cursor);
        let next = cursor + 1;
        if next >= window {
            tree.evict(input,next - window);
        }
    }
}

#[test]
fn tree_matches_linear_on_text() {
    let text = "the quick brown fox jumps over the lazy dog; the quick brown cat naps. \
                the quick brown fox jumps again and again and again over the lazy dog."
        .as_bytes();
    drive_both(text,1024,3,254);
    drive_both(text,1024,3,258);
}

#[test]
fn tree_matches_linear_on_runs() {
    let mut buf = vec![0u8;600];
    buf.extend((0..600).map(|i| (i % 3) as u8));
    buf.extend(vec![0u8;100]);
    drive_both(&buf,1024,3,254);
}

#[test]
fn tree_matches_linear_on_random() {
    use rand::{Rng,SeedableRng};
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x5EED);
    // small alphabet so matches are plentiful
    let buf: Vec<u8> = (0..4096).map(|_| rng.gen_range(0..4u8)).collect();
    drive_both(&buf,1024,3,254);
    let buf: Vec<u8> = (0..2048).map(|_| rng.gen()).collect();
    drive_both(&buf,1024,3,254);
}

#[test]
fn eviction_recycles_arena() {
    let input: Vec<u8> = (0..4096).map(|i| (i * 31 % 251) as u8).collect();
    let window = 256;
    let mut tree = SeqTree::create(window,254).unwrap();
    for cursor in 0..input.len() {
        tree.insert(&input,cursor);
        let next = cursor + 1;
        if next >= window {
            tree.evict(&input,next - window);
        }
    }
    // arena never outgrows the window
    assert!(tree.node.len() <= window);
}
