//! Parent/child/sibling derivation over a flat indented sequence.
//!
//! Parent is the nearest preceding item with a strictly smaller indent.
//! Children of item `i` are the items of indent `indent(i) + 1` in the run
//! that follows `i` and ends at the first item with indent `<= indent(i)`.
//! All scans assume `indent(k + 1) <= indent(k) + 1`.

/// Anything placed in the ordered sequence.
pub trait Indented {
    fn indent(&self) -> i64;
}

impl Indented for i64 {
    fn indent(&self) -> i64 {
        *self
    }
}

/// Index of the parent of `index`, `None` for roots.
pub fn parent_of<T: Indented>(items: &[T], index: usize) -> Option<usize> {
    let indent = items.get(index)?.indent();
    items[..index]
        .iter()
        .rposition(|candidate| candidate.indent() < indent)
}

/// 0-based rank of `index` among its siblings, in document order.
pub fn row_of<T: Indented>(items: &[T], index: usize) -> usize {
    let Some(item) = items.get(index) else {
        return 0;
    };
    let start = parent_of(items, index).map_or(0, |parent| parent + 1);
    items[start..index]
        .iter()
        .filter(|sibling| sibling.indent() == item.indent())
        .count()
}

/// Indices of the direct children of `index`.
pub fn children_of<T: Indented>(items: &[T], index: usize) -> Vec<usize> {
    let Some(item) = items.get(index) else {
        return Vec::new();
    };
    let indent = item.indent();
    items[index + 1..]
        .iter()
        .take_while(|next| next.indent() > indent)
        .enumerate()
        .filter(|(_, next)| next.indent() == indent + 1)
        .map(|(offset, _)| index + 1 + offset)
        .collect()
}

pub fn children_count_of<T: Indented>(items: &[T], index: usize) -> usize {
    children_of(items, index).len()
}

/// Index of the `n`-th direct child of `index`.
pub fn child_of<T: Indented>(items: &[T], index: usize, n: usize) -> Option<usize> {
    children_of(items, index).get(n).copied()
}

/// Clamps indents so the sequence satisfies the derivation invariant.
///
/// The first item becomes 0, negatives become 0 and every later item is at
/// most one level deeper than its predecessor. Returns the repaired indents.
pub fn repair_indents(indents: &mut [i64]) -> usize {
    let mut repaired = 0;
    let mut previous: Option<i64> = None;
    for indent in indents.iter_mut() {
        let ceiling = previous.map_or(0, |value| value + 1);
        let fixed = (*indent).clamp(0, ceiling);
        if fixed != *indent {
            *indent = fixed;
            repaired += 1;
        }
        previous = Some(fixed);
    }
    repaired
}

#[cfg(test)]
mod tests {
    use super::{child_of, children_count_of, parent_of, repair_indents, row_of};

    const SAMPLE: [i64; 6] = [0, 1, 1, 2, 1, 0];

    #[test]
    fn children_skip_grandchildren_and_stop_at_shallower_item() {
        assert_eq!(children_count_of(&SAMPLE, 0), 3);
        assert_eq!(child_of(&SAMPLE, 0, 2), Some(4));
        assert_eq!(children_count_of(&SAMPLE, 1), 0);
        assert_eq!(children_count_of(&SAMPLE, 2), 1);
        assert_eq!(children_count_of(&SAMPLE, 5), 0);
    }

    #[test]
    fn parent_is_nearest_shallower_predecessor() {
        assert_eq!(parent_of(&SAMPLE, 0), None);
        assert_eq!(parent_of(&SAMPLE, 3), Some(2));
        assert_eq!(parent_of(&SAMPLE, 4), Some(0));
        assert_eq!(parent_of(&SAMPLE, 5), None);
    }

    #[test]
    fn row_counts_siblings_under_same_parent() {
        assert_eq!(row_of(&SAMPLE, 4), 2);
        assert_eq!(row_of(&SAMPLE, 3), 0);
        assert_eq!(row_of(&SAMPLE, 5), 1);
    }

    #[test]
    fn repair_clamps_jumps_and_negatives() {
        let mut indents = [2, 3, -1, 4, 1];
        assert_eq!(repair_indents(&mut indents), 4);
        assert_eq!(indents, [0, 1, 0, 1, 1]);
    }
}
