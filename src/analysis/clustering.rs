//! Agglomerative hierarchical clustering with Ward linkage
//!
//! Distances between clusters are updated with the Lance–Williams formula
//! for Ward's method on Euclidean distances:
//!
//! d(i∪j, k) = sqrt(((nᵢ+nₖ)·d(i,k)² + (nⱼ+nₖ)·d(j,k)² − nₖ·d(i,j)²) / (nᵢ+nⱼ+nₖ))
//!
//! Survey matrices hold at most a few hundred rows, so the O(n³) naive
//! closest-pair search is fine.

use nalgebra::DMatrix;

/// One agglomeration step
///
/// Clusters are identified by the row index of their first member (the
/// surviving slot), so `left` absorbs `right`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    pub left: usize,
    pub right: usize,
    pub distance: f64,
    /// Rows in the merged cluster
    pub size: usize,
}

/// Build the full Ward dendrogram (n − 1 merges, in merge order)
pub fn ward_linkage(data: &DMatrix<f64>) -> Vec<Merge> {
    let n = data.nrows();
    if n < 2 {
        return Vec::new();
    }

    let mut dist = vec![0.0f64; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = (data.row(i) - data.row(j)).norm();
            dist[i * n + j] = d;
            dist[j * n + i] = d;
        }
    }

    let mut active = vec![true; n];
    let mut sizes = vec![1usize; n];
    let mut merges = Vec::with_capacity(n - 1);

    for _ in 0..(n - 1) {
        // Closest active pair; first pair in scan order wins ties
        let mut best: Option<(usize, usize, f64)> = None;
        for i in (0..n).filter(|&i| active[i]) {
            for j in ((i + 1)..n).filter(|&j| active[j]) {
                let d = dist[i * n + j];
                if best.map_or(true, |(_, _, b)| d < b) {
                    best = Some((i, j, d));
                }
            }
        }
        let Some((i, j, d_ij)) = best else { break };

        let (n_i, n_j) = (sizes[i] as f64, sizes[j] as f64);
        for k in (0..n).filter(|&k| active[k] && k != i && k != j) {
            let n_k = sizes[k] as f64;
            let d_ik = dist[i * n + k];
            let d_jk = dist[j * n + k];
            let squared = ((n_i + n_k) * d_ik * d_ik + (n_j + n_k) * d_jk * d_jk - n_k * d_ij * d_ij)
                / (n_i + n_j + n_k);
            let updated = squared.max(0.0).sqrt();
            dist[i * n + k] = updated;
            dist[k * n + i] = updated;
        }

        active[j] = false;
        sizes[i] += sizes[j];
        merges.push(Merge {
            left: i,
            right: j,
            distance: d_ij,
            size: sizes[i],
        });
    }

    merges
}

/// Cut a dendrogram into exactly `k` flat clusters
///
/// Replays all but the last `k − 1` merges. Labels start at 1 and are
/// numbered by first appearance in row order.
pub fn cut_tree(merges: &[Merge], n: usize, k: usize) -> Vec<u32> {
    let keep = n.saturating_sub(k.max(1));
    let mut parent: Vec<usize> = (0..n).collect();

    fn find(parent: &mut [usize], mut x: usize) -> usize {
        while parent[x] != x {
            parent[x] = parent[parent[x]];
            x = parent[x];
        }
        x
    }

    for merge in merges.iter().take(keep) {
        let a = find(&mut parent, merge.left);
        let b = find(&mut parent, merge.right);
        if a != b {
            parent[b] = a;
        }
    }

    let mut root_labels: Vec<Option<u32>> = vec![None; n];
    let mut next = 1u32;
    (0..n)
        .map(|row| {
            let root = find(&mut parent, row);
            *root_labels[root].get_or_insert_with(|| {
                let label = next;
                next += 1;
                label
            })
        })
        .collect()
}

/// Ward clustering cut to `k` groups; empty when there are fewer than `k` rows
pub fn ward_clusters(data: &DMatrix<f64>, k: usize) -> Vec<u32> {
    let n = data.nrows();
    if k == 0 || n < k {
        return Vec::new();
    }

    cut_tree(&ward_linkage(data), n, k)
}
