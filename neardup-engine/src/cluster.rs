//! Duplicate clustering: connected components over verified edges.
//!
//! Membership is transitive by connectivity. Two documents in one cluster
//! may be below the threshold with each other if an intermediate document
//! links them.

use neardup_core::types::{DocHandle, DocInterner, FxHashMap};
use serde::Serialize;

use crate::verify::VerifiedEdge;

/// Disjoint-set forest over dense indices, union by rank with path
/// compression.
///
/// Each root also tracks the smallest index in its set, which is the
/// earliest-ingested document and therefore the cluster representative.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
    min_member: Vec<usize>,
}

impl UnionFind {
    pub fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
            rank: vec![0; len],
            min_member: (0..len).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        // second pass: point the whole path at the root
        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }
        root
    }

    /// Merge the sets of `a` and `b`. Returns false if already joined.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return false;
        }
        let (root, child) = match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => (rb, ra),
            std::cmp::Ordering::Greater => (ra, rb),
            std::cmp::Ordering::Equal => {
                self.rank[ra] += 1;
                (ra, rb)
            }
        };
        self.parent[child] = root;
        self.min_member[root] = self.min_member[root].min(self.min_member[child]);
        true
    }

    /// Smallest index in the set containing `x`.
    pub fn representative(&mut self, x: usize) -> usize {
        let root = self.find(x);
        self.min_member[root]
    }
}

/// Where one document ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClusterAssignment {
    pub cluster_id: usize,
    pub is_representative: bool,
}

/// One connected component. `members[0]` is the representative; the rest
/// follow in ingestion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateCluster {
    pub id: usize,
    pub members: Vec<String>,
}

impl DuplicateCluster {
    pub fn representative(&self) -> &str {
        &self.members[0]
    }

    pub fn duplicates(&self) -> &[String] {
        &self.members[1..]
    }

    pub fn is_duplicate_group(&self) -> bool {
        self.members.len() > 1
    }
}

/// The partition produced by a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClusterReport {
    pub clusters: Vec<DuplicateCluster>,
    pub assignments: FxHashMap<String, ClusterAssignment>,
}

impl ClusterReport {
    pub fn assignment(&self, doc_id: &str) -> Option<ClusterAssignment> {
        self.assignments.get(doc_id).copied()
    }

    /// Clusters with more than one member.
    pub fn duplicate_groups(&self) -> impl Iterator<Item = &DuplicateCluster> {
        self.clusters.iter().filter(|c| c.is_duplicate_group())
    }

    pub fn duplicate_group_count(&self) -> usize {
        self.duplicate_groups().count()
    }

    /// Every cluster as a sorted id list, the list itself sorted. Two reports
    /// with the same partition give the same value.
    pub fn partition(&self) -> Vec<Vec<String>> {
        let mut sets: Vec<Vec<String>> = self
            .clusters
            .iter()
            .map(|c| {
                let mut m = c.members.clone();
                m.sort();
                m
            })
            .collect();
        sets.sort();
        sets
    }
}

/// Turns verified edges into a `ClusterReport`.
///
/// Representative policy: the earliest-ingested member. Handles are interned
/// in ingestion order, so that is the member with the smallest handle index;
/// documents known only from the persisted index are interned after every
/// run document and rank behind them. Cluster ids are dense and follow
/// representative order.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuplicateClusterer;

impl DuplicateClusterer {
    pub fn new() -> Self {
        Self
    }

    /// Cluster every handle flagged in `in_run` plus any other handle an
    /// edge touches. Handles that are neither (persisted documents no
    /// verified edge reaches, skipped documents) are left out of the report.
    pub fn cluster(
        &self,
        interner: &DocInterner,
        in_run: &[bool],
        edges: &[VerifiedEdge],
    ) -> ClusterReport {
        let n = interner.len();
        let mut uf = UnionFind::new(n);
        let mut touched = vec![false; n];
        for edge in edges {
            let (a, b) = (edge.left.index(), edge.right.index());
            uf.union(a, b);
            touched[a] = true;
            touched[b] = true;
        }

        let mut cluster_of_root: FxHashMap<usize, usize> = FxHashMap::default();
        let mut report = ClusterReport::default();
        for index in 0..n {
            if !in_run.get(index).copied().unwrap_or(false) && !touched[index] {
                continue;
            }
            let Some(handle) = DocHandle::from_index(index) else {
                continue;
            };
            let root = uf.find(index);
            let is_representative = uf.representative(index) == index;
            // iterating in index order means the representative is always
            // the first member seen for its root
            let cluster_id = *cluster_of_root.entry(root).or_insert_with(|| {
                report.clusters.push(DuplicateCluster {
                    id: report.clusters.len(),
                    members: Vec::new(),
                });
                report.clusters.len() - 1
            });
            let doc_id = interner.resolve(handle).to_string();
            report.clusters[cluster_id].members.push(doc_id.clone());
            report.assignments.insert(
                doc_id,
                ClusterAssignment {
                    cluster_id,
                    is_representative,
                },
            );
        }

        tracing::debug!(
            documents = report.assignments.len(),
            clusters = report.clusters.len(),
            duplicate_groups = report.duplicate_group_count(),
            "clustered verified edges"
        );
        report
    }
}
