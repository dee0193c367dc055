//! Radio topology and link properties.

use hashbrown::HashMap;
use swarmring::NodeId;

use crate::time::Duration;

/// Distance reported on links created without an explicit one.
pub const DEFAULT_DISTANCE: u16 = 40;

/// Properties of the radio path between two nodes.
#[derive(Debug, Clone)]
pub struct Link {
    /// Distance the receiver's radio estimates for frames on this link.
    pub distance: u16,
    /// Frame loss rate (0.0 to 1.0).
    pub loss_rate: f64,
    /// Rate at which a delivered frame has one byte damaged (0.0 to 1.0).
    pub corruption_rate: f64,
    /// Propagation delay.
    pub delay: Duration,
    /// Whether the link is currently active.
    pub active: bool,
}

impl Default for Link {
    fn default() -> Self {
        Self {
            distance: DEFAULT_DISTANCE,
            loss_rate: 0.0,
            corruption_rate: 0.0,
            delay: Duration::from_millis(1),
            active: true,
        }
    }
}

impl Link {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_distance(mut self, distance: u16) -> Self {
        self.distance = distance;
        self
    }

    pub fn with_loss_rate(mut self, rate: f64) -> Self {
        self.loss_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_corruption_rate(mut self, rate: f64) -> Self {
        self.corruption_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}

/// Which nodes hear each other, and how well.
///
/// Links are symmetric and stored once per unordered pair.
#[derive(Debug, Clone)]
pub struct Topology {
    links: HashMap<(NodeId, NodeId), Link>,
    default_link: Link,
}

impl Default for Topology {
    fn default() -> Self {
        Self::new()
    }
}

impl Topology {
    /// Create an empty topology.
    pub fn new() -> Self {
        Self {
            links: HashMap::new(),
            default_link: Link::default(),
        }
    }

    /// Template for links created by the constructors below.
    pub fn with_default_link(mut self, link: Link) -> Self {
        self.default_link = link;
        self
    }

    /// Every node hears every other node.
    pub fn fully_connected(nodes: &[NodeId], link: Link) -> Self {
        let mut topo = Self::new().with_default_link(link);
        for (i, &a) in nodes.iter().enumerate() {
            for &b in nodes.iter().skip(i + 1) {
                topo.connect(a, b);
            }
        }
        topo
    }

    /// Each node hears only its predecessor and successor.
    pub fn chain(nodes: &[NodeId], link: Link) -> Self {
        let mut topo = Self::new().with_default_link(link);
        for pair in nodes.windows(2) {
            topo.connect(pair[0], pair[1]);
        }
        topo
    }

    /// A chain whose ends also hear each other.
    pub fn ring(nodes: &[NodeId], link: Link) -> Self {
        let mut topo = Self::chain(nodes, link);
        if let (Some(&first), Some(&last)) = (nodes.first(), nodes.last()) {
            if nodes.len() > 2 {
                topo.connect(first, last);
            }
        }
        topo
    }

    /// The first node is a hub that hears every other node; the others hear
    /// only the hub.
    pub fn star(nodes: &[NodeId], link: Link) -> Self {
        let mut topo = Self::new().with_default_link(link);
        if let Some((&hub, spokes)) = nodes.split_first() {
            for &spoke in spokes {
                topo.connect(hub, spoke);
            }
        }
        topo
    }

    /// Nodes at planar positions hear each other within `radius`.
    ///
    /// Each link carries the rounded Euclidean distance. `positions` is
    /// matched to `nodes` by index.
    pub fn from_positions(
        nodes: &[NodeId],
        positions: &[(f64, f64)],
        radius: f64,
        link: Link,
    ) -> Self {
        let mut topo = Self::new().with_default_link(link);
        let placed: Vec<_> = nodes.iter().zip(positions).collect();
        for (i, &(&a, pa)) in placed.iter().enumerate() {
            for &(&b, pb) in placed.iter().skip(i + 1) {
                let dist = ((pa.0 - pb.0).powi(2) + (pa.1 - pb.1).powi(2)).sqrt();
                if dist <= radius {
                    let distance = dist.round().min(u16::MAX as f64) as u16;
                    let link = topo.default_link.clone().with_distance(distance);
                    topo.add_link(a, b, link);
                }
            }
        }
        topo
    }

    /// Canonical key for an unordered pair.
    fn key(a: NodeId, b: NodeId) -> (NodeId, NodeId) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// Add a link using the default template.
    pub fn connect(&mut self, a: NodeId, b: NodeId) {
        let link = self.default_link.clone();
        self.add_link(a, b, link);
    }

    pub fn add_link(&mut self, a: NodeId, b: NodeId, link: Link) {
        if a != b {
            self.links.insert(Self::key(a, b), link);
        }
    }

    pub fn remove_link(&mut self, a: NodeId, b: NodeId) {
        self.links.remove(&Self::key(a, b));
    }

    pub fn get_link(&self, a: NodeId, b: NodeId) -> Option<&Link> {
        self.links.get(&Self::key(a, b))
    }

    pub fn get_link_mut(&mut self, a: NodeId, b: NodeId) -> Option<&mut Link> {
        self.links.get_mut(&Self::key(a, b))
    }

    /// Whether `a` and `b` currently hear each other.
    pub fn is_connected(&self, a: NodeId, b: NodeId) -> bool {
        self.get_link(a, b).is_some_and(|l| l.active)
    }

    /// Active neighbors of `node`, in ascending id order.
    pub fn neighbors(&self, node: NodeId) -> Vec<NodeId> {
        let mut out: Vec<NodeId> = self
            .links
            .iter()
            .filter(|(_, link)| link.active)
            .filter_map(|(&(a, b), _)| {
                if a == node {
                    Some(b)
                } else if b == node {
                    Some(a)
                } else {
                    None
                }
            })
            .collect();
        out.sort_unstable();
        out
    }

    /// Disable every link that crosses between groups.
    ///
    /// Nodes absent from every group keep their links.
    pub fn partition(&mut self, groups: &[Vec<NodeId>]) {
        let group_of = |n: NodeId| groups.iter().position(|g| g.contains(&n));
        for (&(a, b), link) in self.links.iter_mut() {
            if let (Some(ga), Some(gb)) = (group_of(a), group_of(b)) {
                if ga != gb {
                    link.active = false;
                }
            }
        }
    }

    /// Re-enable every link.
    pub fn heal(&mut self) {
        for link in self.links.values_mut() {
            link.active = true;
        }
    }

    pub fn set_global_loss_rate(&mut self, rate: f64) {
        let rate = rate.clamp(0.0, 1.0);
        self.default_link.loss_rate = rate;
        for link in self.links.values_mut() {
            link.loss_rate = rate;
        }
    }

    pub fn set_global_corruption_rate(&mut self, rate: f64) {
        let rate = rate.clamp(0.0, 1.0);
        self.default_link.corruption_rate = rate;
        for link in self.links.values_mut() {
            link.corruption_rate = rate;
        }
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NODES: [NodeId; 4] = [10, 20, 30, 40];

    #[test]
    fn test_links_are_symmetric() {
        let mut topo = Topology::new();
        topo.add_link(20, 10, Link::new().with_distance(55));
        assert_eq!(topo.get_link(10, 20).unwrap().distance, 55);
        assert!(topo.is_connected(20, 10));

        topo.add_link(10, 10, Link::new());
        assert_eq!(topo.link_count(), 1);
    }

    #[test]
    fn test_shapes() {
        assert_eq!(Topology::fully_connected(&NODES, Link::new()).link_count(), 6);
        assert_eq!(Topology::chain(&NODES, Link::new()).link_count(), 3);

        let ring = Topology::ring(&NODES, Link::new());
        assert_eq!(ring.link_count(), 4);
        assert_eq!(ring.neighbors(10), [20, 40]);

        let star = Topology::star(&NODES, Link::new());
        assert_eq!(star.neighbors(10), [20, 30, 40]);
        assert_eq!(star.neighbors(30), [10]);

        // Two nodes form a single link, not a doubled one
        assert_eq!(Topology::ring(&[1, 2], Link::new()).link_count(), 1);
    }

    #[test]
    fn test_from_positions() {
        let positions = [(0.0, 0.0), (30.0, 40.0), (200.0, 0.0), (60.0, 80.0)];
        let topo = Topology::from_positions(&NODES, &positions, 90.0, Link::new());

        assert_eq!(topo.get_link(10, 20).unwrap().distance, 50);
        assert_eq!(topo.get_link(20, 40).unwrap().distance, 50);
        assert!(topo.get_link(10, 40).is_none()); // 100 apart
        assert!(topo.neighbors(30).is_empty());
    }

    #[test]
    fn test_partition_and_heal() {
        let mut topo = Topology::fully_connected(&NODES, Link::new());
        topo.partition(&[vec![10, 20], vec![30, 40]]);

        assert!(topo.is_connected(10, 20));
        assert!(topo.is_connected(30, 40));
        assert!(!topo.is_connected(10, 30));
        assert_eq!(topo.neighbors(20), [10]);

        topo.heal();
        assert_eq!(topo.neighbors(20), [10, 30, 40]);
    }

    #[test]
    fn test_global_rates() {
        let mut topo = Topology::chain(&NODES, Link::new());
        topo.set_global_loss_rate(1.5);
        topo.set_global_corruption_rate(0.25);
        let link = topo.get_link(20, 30).unwrap();
        assert_eq!(link.loss_rate, 1.0);
        assert_eq!(link.corruption_rate, 0.25);

        topo.connect(10, 40);
        assert_eq!(topo.get_link(10, 40).unwrap().loss_rate, 1.0);
    }
}
