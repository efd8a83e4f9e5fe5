use geo::{Coord, Distance, Haversine, Point};

use super::ring::is_closed;

/// Connect open way segments end-to-start into chains
///
/// Starting from the first unused segment, the chain is extended with the
/// unused segment whose first point equals the chain's last point. When no
/// segment matches exactly, the one whose first point is nearest (great-circle
/// distance) is taken instead; ties go to the segment that comes first. A chain
/// stops growing once it closes on itself or no segments are left.
///
/// Segments are never reversed. A member way stored against the ring's
/// direction is matched on its first point only, so it is attached backwards
/// and the resulting ring crosses itself; ring repair usually recovers the area.
///
/// Every segment is consumed exactly once, so this always terminates. Chains
/// are returned in the order they were started and may still be open.
pub fn chain_segments(segments: Vec<Vec<Coord<f64>>>) -> Vec<Vec<Coord<f64>>> {
    let mut unused: Vec<Option<Vec<Coord<f64>>>> = segments
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(Some)
        .collect();
    let mut chains = Vec::new();

    while let Some(mut chain) = unused.iter_mut().find_map(Option::take) {
        while !is_closed(&chain) {
            let Some(&tail) = chain.last() else {
                break;
            };
            let Some(next) = next_segment(&unused, tail) else {
                break;
            };
            let Some(segment) = unused[next].take() else {
                break;
            };

            if segment[0] == tail {
                chain.extend_from_slice(&segment[1..]);
            } else {
                chain.extend(segment);
            }
        }
        chains.push(chain);
    }

    chains
}

fn next_segment(unused: &[Option<Vec<Coord<f64>>>], tail: Coord<f64>) -> Option<usize> {
    let candidates = || {
        unused
            .iter()
            .enumerate()
            .filter_map(|(idx, s)| s.as_ref().map(|s| (idx, s[0])))
    };

    if let Some((idx, _)) = candidates().find(|&(_, head)| head == tail) {
        return Some(idx);
    }

    candidates()
        .map(|(idx, head)| {
            let meters = Haversine::distance(Point::from(tail), Point::from(head));
            (idx, meters)
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(idx, _)| idx)
}
