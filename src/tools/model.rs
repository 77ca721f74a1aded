//! Per-context probability model backed by a Fenwick tree.
//! This is used by the `lzrc` module.  Frequencies live in a plain vector,
//! prefix sums in a parallel Fenwick tree, so cumulative queries and point
//! updates are both O(log n).

/// number of slots in every model; contexts with fewer symbols leave the
/// rest at frequency zero
pub const SLOTS: usize = 256;

/// Updates stop once the total reaches this cap, which bounds rescaling
/// and keeps the range coder's division well defined.
const MAX_TOTAL: u64 = 1 << 56;

pub struct Model {
    freq: Vec<u64>,
    tree: Vec<u64>
}

fn lsb(i: usize) -> usize {
    i & i.wrapping_neg()
}

impl Model {
    /// Symbols `0..n` start at frequency 1 and can never drop back to zero;
    /// symbols `n..SLOTS` start at zero and stay there unless updated.
    pub fn new(n: usize) -> Self {
        let mut freq = vec![0;SLOTS];
        for f in freq.iter_mut().take(n) {
            *f = 1;
        }
        let mut tree = freq.clone();
        for i in 1..=SLOTS {
            let parent = i + lsb(i);
            if parent <= SLOTS {
                tree[parent-1] += tree[i-1];
            }
        }
        Self { freq, tree }
    }
    pub fn freq(&self,sym: usize) -> u64 {
        self.freq[sym]
    }
    /// sum of the frequencies of all symbols strictly below `sym`
    pub fn cumulative(&self,sym: usize) -> u64 {
        let mut sum = 0;
        let mut i = sym;
        while i > 0 {
            sum += self.tree[i-1];
            i -= lsb(i);
        }
        sum
    }
    /// sum of all frequencies, never zero for an initialized model
    pub fn total(&self) -> u64 {
        // SLOTS is a power of two so the last tree slot holds the full sum
        self.tree[SLOTS-1]
    }
    /// Add `inc` to the symbol's frequency, unless the model has saturated,
    /// in which case nothing changes.
    pub fn update(&mut self,sym: usize,inc: u64) {
        if self.total() >= MAX_TOTAL {
            return;
        }
        self.freq[sym] += inc;
        let mut i = sym + 1;
        while i <= SLOTS {
            self.tree[i-1] += inc;
            i += lsb(i);
        }
    }
    /// Find the symbol whose cumulative interval contains `sum`, i.e.
    /// `cumulative(s) <= sum < cumulative(s) + freq(s)`.  Returns `None`
    /// when `sum` lies beyond the total.
    pub fn index_of(&self,sum: u64) -> Option<usize> {
        if sum >= self.total() {
            return None;
        }
        let mut idx = 0;
        let mut rem = sum;
        let mut mask = SLOTS >> 1;
        while mask > 0 {
            let t = idx + mask;
            if self.tree[t-1] <= rem {
                idx = t;
                rem -= self.tree[t-1];
            }
            mask >>= 1;
        }
        Some(idx)
    }
}

#[test]
fn init_shape() {
    let pm = Model::new(2);
    assert_eq!(pm.total(),2);
    assert_eq!(pm.cumulative(0),0);
    assert_eq!(pm.cumulative(1),1);
    assert_eq!(pm.cumulative(2),2);
    assert_eq!(pm.freq(0),1);
    assert_eq!(pm.freq(255),0);
    let pm = Model::new(256);
    assert_eq!(pm.total(),256);
    assert_eq!(pm.cumulative(200),200);
}

#[test]
fn update_moves_sums() {
    let mut pm = Model::new(256);
    pm.update(10,5);
    assert_eq!(pm.total(),261);
    assert_eq!(pm.cumulative(10),10);
    assert_eq!(pm.cumulative(11),16);
    assert_eq!(pm.freq(10),6);
}

#[test]
fn index_inverts_cumulative() {
    let mut pm = Model::new(64);
    // skew some frequencies, leave 64..256 at zero
    pm.update(0,9);
    pm.update(13,100);
    pm.update(63,3);
    for sym in 0..64 {
        assert_eq!(pm.index_of(pm.cumulative(sym)),Some(sym));
        let end = pm.cumulative(sym) + pm.freq(sym) - 1;
        assert_eq!(pm.index_of(end),Some(sym));
    }
    assert_eq!(pm.index_of(pm.total()),None);
}

#[test]
fn index_skips_empty_slots() {
    let mut pm = Model::new(1);
    pm.update(5,1);
    // slots 1..5 are empty, sum 1 must land on symbol 5
    assert_eq!(pm.index_of(0),Some(0));
    assert_eq!(pm.index_of(1),Some(5));
}

#[test]
fn saturation_freezes_counts() {
    let mut pm = Model::new(2);
    pm.update(0,MAX_TOTAL);
    let total = pm.total();
    let f0 = pm.freq(0);
    assert!(total >= MAX_TOTAL);
    pm.update(1,1);
    assert_eq!(pm.total(),total);
    assert_eq!(pm.freq(0),f0);
    assert_eq!(pm.freq(1),1);
}
