//! Display-order list transforms. Up/down buttons and drag moves both
//! reduce to the same persisted sequence: `display_order` equals the
//! element's index in the final id array.

/// Swap the element at `index` with its predecessor. Returns false when
/// the move is out of range or already at the top.
pub fn move_up(ids: &mut [i64], index: usize) -> bool {
    if index == 0 || index >= ids.len() {
        return false;
    }
    ids.swap(index, index - 1);
    true
}

/// Swap the element at `index` with its successor.
pub fn move_down(ids: &mut [i64], index: usize) -> bool {
    if ids.len() < 2 || index >= ids.len() - 1 {
        return false;
    }
    ids.swap(index, index + 1);
    true
}

/// Splice semantics for drag-and-drop: remove from `from`, insert at `to`.
pub fn move_to(ids: &mut Vec<i64>, from: usize, to: usize) -> bool {
    if from >= ids.len() || to >= ids.len() {
        return false;
    }
    let id = ids.remove(from);
    ids.insert(to, id);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drag_and_repeated_move_up_agree() {
        // Drag index 3 to position 1...
        let mut dragged = vec![10, 20, 30, 40, 50];
        assert!(move_to(&mut dragged, 3, 1));

        // ...equals two discrete move-up calls on index 3 then 2.
        let mut stepped = vec![10, 20, 30, 40, 50];
        assert!(move_up(&mut stepped, 3));
        assert!(move_up(&mut stepped, 2));

        assert_eq!(dragged, stepped);
        assert_eq!(dragged, vec![10, 40, 20, 30, 50]);
    }

    #[test]
    fn drag_to_top_equals_three_move_ups() {
        let mut dragged = vec![10, 20, 30, 40, 50];
        assert!(move_to(&mut dragged, 3, 0));

        let mut stepped = vec![10, 20, 30, 40, 50];
        assert!(move_up(&mut stepped, 3));
        assert!(move_up(&mut stepped, 2));
        assert!(move_up(&mut stepped, 1));

        assert_eq!(dragged, stepped);
        assert_eq!(dragged[0], 40);
    }

    #[test]
    fn move_down_from_head() {
        // Problems ordered [10, 20, 30]; moving the first down yields the
        // persisted id sequence [20, 10, 30].
        let mut ids = vec![10, 20, 30];
        assert!(move_down(&mut ids, 0));
        assert_eq!(ids, vec![20, 10, 30]);
    }

    #[test]
    fn out_of_range_moves_are_rejected() {
        let mut ids = vec![10, 20, 30];
        assert!(!move_up(&mut ids, 0));
        assert!(!move_down(&mut ids, 2));
        assert!(!move_to(&mut ids, 5, 0));
        assert_eq!(ids, vec![10, 20, 30]);
    }
}
