//! Shared-prefix coding for archive string tables.
//!
//! The encoder grows a bounded counting trie over the corpus (one byte per
//! node, at most a configurable number of fresh nodes per inserted string),
//! periodically pruning nodes whose support falls below a threshold. The
//! surviving trie is flattened into an indexed prefix table; at encode time
//! a string stores the 16-bit id of its longest table prefix followed by
//! the raw suffix bytes.
//!
//! Entry 0 is the empty root prefix, so every string has an encoding even
//! when it shares nothing with the corpus.

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::error::{Error, Result};
use crate::mem::MemFile;

/// Hard cap on table size; ids are stored as `u16`.
const MAX_TABLE_ENTRIES: usize = u16::MAX as usize;

/// Longest prefix chain the trie will grow.
const MAX_PREFIX_LEN: usize = 255;

// ------------------------------------------------------------------------------------------------
// Build-time configuration
// ------------------------------------------------------------------------------------------------

/// Tuning knobs for trie construction, derived from the corpus size.
#[derive(Debug, Clone, Copy)]
pub struct PrefixConfig {
    /// Fresh trie nodes a single inserted string may create.
    pub max_new_children_per_entry: usize,
    /// Minimum support a node needs to survive a prune.
    pub prune_min_support: u64,
    /// Insertions between prune passes.
    pub prune_interval: usize,
}

impl PrefixConfig {
    /// Derives a configuration from the number of corpus strings.
    pub fn auto(num_entries: usize) -> Self {
        Self {
            max_new_children_per_entry: 2,
            prune_min_support: (num_entries as u64 / 256).max(2),
            prune_interval: (num_entries / 16).max(16),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Counting trie (build time only)
// ------------------------------------------------------------------------------------------------

struct TrieNode {
    byte: u8,
    support: u64,
    children: Vec<usize>,
}

struct Trie {
    nodes: Vec<TrieNode>,
}

impl Trie {
    fn new() -> Self {
        Self {
            nodes: vec![TrieNode {
                byte: 0,
                support: 0,
                children: Vec::new(),
            }],
        }
    }

    fn add_string(&mut self, s: &[u8], max_new: usize) {
        let mut node = 0usize;
        let mut created = 0usize;
        for &b in s.iter().take(MAX_PREFIX_LEN) {
            let next = self.nodes[node]
                .children
                .iter()
                .copied()
                .find(|&c| self.nodes[c].byte == b);
            let next = match next {
                Some(c) => c,
                None => {
                    if created == max_new {
                        break;
                    }
                    created += 1;
                    self.nodes.push(TrieNode {
                        byte: b,
                        support: 0,
                        children: Vec::new(),
                    });
                    let c = self.nodes.len() - 1;
                    self.nodes[node].children.push(c);
                    c
                }
            };
            self.nodes[next].support += 1;
            node = next;
        }
    }

    fn prune(&mut self, min_support: u64) {
        // Dropping a node drops its whole subtree; children are only
        // reachable through their parent.
        for i in 0..self.nodes.len() {
            let keep: Vec<usize> = self.nodes[i]
                .children
                .iter()
                .copied()
                .filter(|&c| self.nodes[c].support >= min_support)
                .collect();
            self.nodes[i].children = keep;
        }
    }
}

// ------------------------------------------------------------------------------------------------
// Flattened table
// ------------------------------------------------------------------------------------------------

/// One prefix-table entry: a parent link plus the byte this node appends.
#[derive(Debug, Clone)]
struct PrefixEntry {
    parent: u16,
    fragment: Vec<u8>,
}

// ------------------------------------------------------------------------------------------------
// PrefixPacker
// ------------------------------------------------------------------------------------------------

/// Prefix-table string packer. See the module docs for the wire layout.
#[derive(Debug, Clone, Default)]
pub struct PrefixPacker {
    /// Entry 0 is the empty root.
    table: Vec<PrefixEntry>,
    /// `(node id, next byte) -> child id`, for longest-match encoding.
    children: HashMap<(u16, u8), u16>,
    /// Fully resolved prefix length per entry.
    resolved_len: Vec<usize>,
}

impl PrefixPacker {
    /// Builds the prefix table from the corpus, serializes it to `dst`, and
    /// leaves the packer ready to encode and decode. Returns the number of
    /// bytes written.
    pub fn write_extra(&mut self, dst: &mut MemFile<'_>, strings: &[&str]) -> Result<usize> {
        let cfg = PrefixConfig::auto(strings.len());
        let mut trie = Trie::new();
        for (i, s) in strings.iter().enumerate() {
            trie.add_string(s.as_bytes(), cfg.max_new_children_per_entry);
            if i % cfg.prune_interval == cfg.prune_interval - 1 {
                trie.prune(cfg.prune_min_support);
            }
        }
        trie.prune(cfg.prune_min_support);
        self.flatten(&trie);

        let start = dst.tell();
        dst.write_varuint(self.table.len() as u64)?;
        for entry in &self.table[1..] {
            dst.write_u16(entry.parent)?;
            dst.write_varuint(entry.fragment.len() as u64)?;
            dst.write(&entry.fragment)?;
        }
        Ok(dst.tell() - start)
    }

    /// Restores the prefix table from `nbytes` of serialized extra.
    pub fn read_extra(&mut self, src: &mut MemFile<'_>, nbytes: usize) -> Result<()> {
        let end = src.tell() + nbytes;
        let (len, _) = src.read_varuint()?;
        if len as usize > MAX_TABLE_ENTRIES || len == 0 {
            return Err(Error::corrupted(format!(
                "prefix table length {len} out of range"
            )));
        }
        let mut table = Vec::with_capacity(len as usize);
        table.push(PrefixEntry {
            parent: 0,
            fragment: Vec::new(),
        });
        for i in 1..len as usize {
            let parent = src.read_u16()?;
            if parent as usize >= i {
                return Err(Error::corrupted("prefix entry references a later parent"));
            }
            let (frag_len, _) = src.read_varuint()?;
            let fragment = src.read(frag_len as usize)?.to_vec();
            table.push(PrefixEntry { parent, fragment });
        }
        if src.tell() != end {
            return Err(Error::corrupted("prefix extra overruns its declared size"));
        }
        self.table = table;
        self.rebuild_index();
        Ok(())
    }

    /// Encodes `s` as its longest table prefix id plus the raw suffix.
    pub fn encode_string(&self, dst: &mut MemFile<'_>, s: &str) -> Result<()> {
        if self.table.is_empty() {
            return Err(Error::illegal_state("prefix packer has no table"));
        }
        let bytes = s.as_bytes();
        let mut node: u16 = 0;
        let mut matched = 0usize;
        for &b in bytes {
            match self.children.get(&(node, b)) {
                Some(&child) => {
                    node = child;
                    matched += 1;
                }
                None => break,
            }
        }
        dst.write_u16(node)?;
        dst.write(&bytes[matched..])?;
        Ok(())
    }

    /// Decodes one string of `strlen` decoded bytes: resolve the prefix id,
    /// then append the remaining suffix bytes.
    pub fn decode_string(&self, src: &mut MemFile<'_>, strlen: usize) -> Result<String> {
        if self.table.is_empty() {
            return Err(Error::illegal_state("prefix packer has no table"));
        }
        let id = src.read_u16()?;
        if (id as usize) < self.resolved_len.len() && self.resolved_len[id as usize] > strlen {
            return Err(Error::corrupted(format!(
                "prefix {id} longer ({}) than declared string length {strlen}",
                self.resolved_len[id as usize]
            )));
        }
        let mut out = self.resolve(id)?;
        out.extend_from_slice(src.read(strlen - out.len())?);
        String::from_utf8(out).map_err(|_| Error::corrupted("prefix output is not valid UTF-8"))
    }

    /// Renders the prefix table for diagnostics.
    pub fn print_extra(&self, out: &mut String) {
        if self.table.is_empty() {
            out.push_str("prefix: no table\n");
            return;
        }
        for id in 0..self.table.len() as u16 {
            if let Ok(prefix) = self.resolve(id) {
                let _ = writeln!(
                    out,
                    "prefix: id {id} -> {:?}",
                    String::from_utf8_lossy(&prefix)
                );
            }
        }
    }

    /// Number of table entries (including the empty root).
    pub fn table_len(&self) -> usize {
        self.table.len()
    }

    fn resolve(&self, id: u16) -> Result<Vec<u8>> {
        if id as usize >= self.table.len() {
            return Err(Error::corrupted(format!("prefix id {id} out of range")));
        }
        let mut fragments: Vec<&[u8]> = Vec::new();
        let mut cur = id;
        while cur != 0 {
            let entry = &self.table[cur as usize];
            fragments.push(&entry.fragment);
            cur = entry.parent;
        }
        let mut out = Vec::new();
        for frag in fragments.iter().rev() {
            out.extend_from_slice(frag);
        }
        Ok(out)
    }

    fn flatten(&mut self, trie: &Trie) {
        // Breadth-first so parents always precede children and get the
        // smaller ids.
        self.table = vec![PrefixEntry {
            parent: 0,
            fragment: Vec::new(),
        }];
        let mut queue: Vec<(usize, u16)> = vec![(0, 0)];
        let mut head = 0;
        while head < queue.len() {
            let (trie_node, table_id) = queue[head];
            head += 1;
            for &child in &trie.nodes[trie_node].children {
                if self.table.len() == MAX_TABLE_ENTRIES {
                    break;
                }
                self.table.push(PrefixEntry {
                    parent: table_id,
                    fragment: vec![trie.nodes[child].byte],
                });
                queue.push((child, (self.table.len() - 1) as u16));
            }
        }
        self.rebuild_index();
    }

    fn rebuild_index(&mut self) {
        self.children.clear();
        self.resolved_len = vec![0; self.table.len()];
        for (id, entry) in self.table.iter().enumerate().skip(1) {
            self.resolved_len[id] =
                self.resolved_len[entry.parent as usize] + entry.fragment.len();
            if let [b] = entry.fragment.as_slice() {
                self.children.insert((entry.parent, *b), id as u16);
            }
        }
    }
}
