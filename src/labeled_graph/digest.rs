use super::LabeledGraph;

fn hash_combine(seed: &mut u64, value: u64) {
    *seed ^= value
        .wrapping_add(0x9e37_79b9_7f4a_7c15)
        .wrapping_add(*seed << 6)
        .wrapping_add(*seed >> 2);
}

/// A cheap isomorphism-invariant digest of a labeled graph.
///
/// Isomorphic graphs always share a digest. Distinct digests prove the graphs are
/// not isomorphic, but equal digests prove nothing.
pub fn digest(graph: &LabeledGraph) -> u64 {
    let (mut vertex_xor, mut edge_xor) = (1u64, 1u64);
    for (src, dst, elabel) in graph.arcs() {
        edge_xor ^= elabel as u64;
        if let (Some(l1), Some(l2)) = (graph.vlabel(src), graph.vlabel(dst)) {
            vertex_xor ^= l1 as u64 ^ l2 as u64;
        }
    }
    let mut seed = 0;
    hash_combine(&mut seed, edge_xor.wrapping_add(vertex_xor));
    hash_combine(&mut seed, graph.num_vertices() as u64);
    hash_combine(&mut seed, graph.num_edges() as u64);
    seed
}
