use std::collections::BTreeMap;

use super::super::errors::NetConflict;
use super::super::signal::Signal;
use super::super::types::{NetId, PinId, PinKind};
use super::graph::{Graph, Net, Pin};

/// Union-find over pin arena indices with path halving.
pub(crate) struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    pub(crate) fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    pub(crate) fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    pub(crate) fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            // Lower index wins so grouping is independent of union order
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }
}

/// Check one prospective net membership: widths must agree, and plain
/// outputs may not share the net with any other output. Returns the
/// resolved width (0 when every member is a wildcard) and the tri-state
/// classification.
pub(crate) fn validate_members(
    pins: &[Pin],
    members: &[PinId],
) -> Result<(u32, bool), NetConflict> {
    // 1. Width: all non-zero declared widths must be one value
    let mut fixed: Option<(PinId, u32)> = None;
    for &pid in members {
        let pin = &pins[pid.index()];
        if pin.declared_width == 0 {
            continue;
        }
        match fixed {
            None => fixed = Some((pid, pin.declared_width)),
            Some((fp, fw)) => {
                if pin.declared_width != fw {
                    return Err(NetConflict::WidthMismatch {
                        a: fp,
                        a_label: pins[fp.index()].path.clone(),
                        a_width: fw,
                        b: pid,
                        b_label: pin.path.clone(),
                        b_width: pin.declared_width,
                    });
                }
            }
        }
    }
    let width = fixed.map(|(_, w)| w).unwrap_or(0);

    // 2. Drivers: several outputs are legal only when all are tri-state
    let outputs: Vec<PinId> = members
        .iter()
        .copied()
        .filter(|pid| pins[pid.index()].kind == PinKind::Output)
        .collect();
    let tri_state = outputs.iter().any(|pid| pins[pid.index()].tri_state);
    if outputs.len() >= 2 {
        if let Some(&plain) = outputs.iter().find(|pid| !pins[pid.index()].tri_state) {
            let other = outputs
                .iter()
                .copied()
                .find(|&pid| pid != plain)
                .unwrap_or(plain);
            return Err(NetConflict::DoubleDriver {
                a: plain,
                a_label: pins[plain.index()].path.clone(),
                b: other,
                b_label: pins[other.index()].path.clone(),
            });
        }
    }
    Ok((width, tri_state))
}

/// Rebuild the whole net partition from the wire list plus the groups of
/// same-named endpoint pins. Every pin ends up either in a fresh net or
/// unattached; resolved widths are written back to member pins.
pub(crate) fn rebuild(graph: &mut Graph, name_groups: &[Vec<PinId>]) -> Result<(), NetConflict> {
    let mut uf = UnionFind::new(graph.pins.len());

    // 1. Union both endpoints of every live wire
    for wire in graph.wires.iter().flatten() {
        uf.union(wire.a.index(), wire.b.index());
    }

    // 2. Union pins sharing an endpoint name
    for group in name_groups {
        for pair in group.windows(2) {
            uf.union(pair[0].index(), pair[1].index());
        }
    }

    // 3. Collect groups; ascending pin order keeps members and net ids
    //    deterministic
    let mut groups: BTreeMap<usize, Vec<PinId>> = BTreeMap::new();
    for idx in 0..graph.pins.len() {
        let root = uf.find(idx);
        groups.entry(root).or_default().push(PinId(idx));
    }

    // 4. Validate every non-singleton group before touching the graph
    let mut resolved: Vec<(Vec<PinId>, u32, bool)> = Vec::new();
    for members in groups.into_values() {
        if members.len() < 2 {
            continue;
        }
        let (width, tri_state) = validate_members(&graph.pins, &members)?;
        resolved.push((members, width, tri_state));
    }

    // 5. Commit: fresh nets, back-references and adopted widths
    for pin in &mut graph.pins {
        pin.net = None;
        pin.width = pin.declared_width;
    }
    graph.nets.clear();
    for (members, width, tri_state) in resolved {
        let net_id = NetId(graph.nets.len());
        for &pid in &members {
            let pin = &mut graph.pins[pid.index()];
            pin.net = Some(net_id);
            if pin.declared_width == 0 {
                pin.width = width;
            }
        }
        graph.nets.push(Net {
            pins: members,
            width,
            tri_state,
            value: Signal::floating(width),
            conflict: false,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_find_groups_transitively() {
        let mut uf = UnionFind::new(6);
        uf.union(0, 1);
        uf.union(2, 3);
        uf.union(1, 3);
        assert_eq!(uf.find(0), uf.find(2));
        assert_eq!(uf.find(1), uf.find(3));
        assert_ne!(uf.find(0), uf.find(4));
        assert_ne!(uf.find(4), uf.find(5));
    }

    #[test]
    fn test_union_find_root_is_lowest_index() {
        let mut uf = UnionFind::new(4);
        uf.union(3, 2);
        uf.union(2, 1);
        assert_eq!(uf.find(3), 1, "group root must not depend on union order");
    }
}
