/// Dense sibling ordering for columns and tasks
///
/// Columns are ordered by `position` inside a project, tasks by `priority`
/// inside a column. For a parent with `N` children the values are always
/// exactly `0..N`, without gaps or duplicates.
///
/// # Operations
///
/// - **Append**: a new child takes slot `N` ([`next_position`])
/// - **Move**: [`move_to_position`] shifts the siblings between the current
///   and the target slot by one, then places the item at the target
/// - **Close gap**: before a child is removed it is moved to the last slot
///   ([`move_to_end`]), so deleting it leaves `0..N-1`
///
/// ```text
/// move C from 2 to 0          move A from 0 to 2
///
///   A B C D                     A B C D
///   0 1 2 3                     0 1 2 3
///   [0, 2) shift +1             (0, 2] shift -1
///   C A B D                     B C A D
///   0 1 2 3                     0 1 2 3
/// ```
///
/// Every function takes the connection of an open transaction. The engine
/// never commits: displacing and placing happen inside the caller's
/// transaction, so readers never observe a non-dense sequence.
///
/// # Locking
///
/// Mutations lock the parent row (`SELECT ... FOR UPDATE`) before reading
/// sibling positions, so two moves under the same parent serialize instead
/// of interleaving.

use crate::error::{BoardError, BoardResult, Entity, StorageContext, Violation};
use sqlx::PgConnection;
use tracing::debug;

/// Table layout of an ordered child entity
///
/// The parent key column has the same name in the child and the parent
/// table (`project_id`, `column_id`).
pub trait Ordered {
    /// Entity kind, for `NotFound` errors
    const ENTITY: Entity;
    /// Child table
    const TABLE: &'static str;
    /// Primary key of the child table
    const ID: &'static str;
    /// Parent key column
    const PARENT: &'static str;
    /// Parent table
    const PARENT_TABLE: &'static str;
    /// Ordering column
    const POSITION: &'static str;
}

/// Columns ordered by `position` within a project
pub struct ColumnOrder;

impl Ordered for ColumnOrder {
    const ENTITY: Entity = Entity::Column;
    const TABLE: &'static str = "columns";
    const ID: &'static str = "column_id";
    const PARENT: &'static str = "project_id";
    const PARENT_TABLE: &'static str = "projects";
    const POSITION: &'static str = "position";
}

/// Tasks ordered by `priority` within a column
pub struct TaskOrder;

impl Ordered for TaskOrder {
    const ENTITY: Entity = Entity::Task;
    const TABLE: &'static str = "tasks";
    const ID: &'static str = "task_id";
    const PARENT: &'static str = "column_id";
    const PARENT_TABLE: &'static str = "columns";
    const POSITION: &'static str = "priority";
}

/// Where an item currently sits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub parent_id: i64,
    pub position: i32,
}

/// Shift of the siblings in `from..=to` by `delta`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Displacement {
    pub from: i32,
    pub to: i32,
    pub delta: i32,
}

impl Displacement {
    /// Checks whether a sibling at `position` is shifted
    pub fn covers(&self, position: i32) -> bool {
        (self.from..=self.to).contains(&position)
    }
}

/// Computes the sibling shift for moving an item from `current` to `target`
/// among `count` siblings
///
/// # Errors
///
/// - [`Violation::OutOfRange`] if `target` is negative or `>= count`
/// - [`Violation::NoOp`] if `target == current`
pub fn plan_move(current: i32, target: i32, count: i64) -> Result<Displacement, Violation> {
    if target < 0 || i64::from(target) >= count {
        return Err(Violation::OutOfRange {
            requested: target,
            count,
        });
    }

    match target.cmp(&current) {
        std::cmp::Ordering::Less => Ok(Displacement {
            from: target,
            to: current - 1,
            delta: 1,
        }),
        std::cmp::Ordering::Greater => Ok(Displacement {
            from: current + 1,
            to: target,
            delta: -1,
        }),
        std::cmp::Ordering::Equal => Err(Violation::NoOp { position: current }),
    }
}

/// Locks a parent row for the rest of the transaction
///
/// Returns `false` if the parent does not exist.
pub async fn lock_parent<O: Ordered>(conn: &mut PgConnection, parent_id: i64) -> BoardResult<bool> {
    let sql = format!(
        "SELECT {parent} FROM {parent_table} WHERE {parent} = $1 FOR UPDATE",
        parent = O::PARENT,
        parent_table = O::PARENT_TABLE,
    );

    let locked: Option<i64> = sqlx::query_scalar(&sql)
        .bind(parent_id)
        .fetch_optional(&mut *conn)
        .await
        .during("lock parent row")?;

    Ok(locked.is_some())
}

/// Reads the parent and position of an item
///
/// # Errors
///
/// `NotFound` if the item does not exist.
pub async fn locate<O: Ordered>(conn: &mut PgConnection, id: i64) -> BoardResult<Slot> {
    let sql = format!(
        "SELECT {parent}, {position} FROM {table} WHERE {id} = $1",
        parent = O::PARENT,
        position = O::POSITION,
        table = O::TABLE,
        id = O::ID,
    );

    let row: Option<(i64, i32)> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .during("locate item")?;

    row.map(|(parent_id, position)| Slot { parent_id, position })
        .ok_or_else(|| BoardError::not_found(O::ENTITY, id))
}

/// Counts the children of a parent
pub async fn sibling_count<O: Ordered>(conn: &mut PgConnection, parent_id: i64) -> BoardResult<i64> {
    let sql = format!(
        "SELECT COUNT(*) FROM {table} WHERE {parent} = $1",
        table = O::TABLE,
        parent = O::PARENT,
    );

    let count: i64 = sqlx::query_scalar(&sql)
        .bind(parent_id)
        .fetch_one(&mut *conn)
        .await
        .during("count siblings")?;

    Ok(count)
}

/// Slot for a child appended to `parent_id`
pub async fn next_position<O: Ordered>(conn: &mut PgConnection, parent_id: i64) -> BoardResult<i32> {
    let count = sibling_count::<O>(conn, parent_id).await?;
    to_position(count).ok_or_else(|| Violation::ParentFull { parent_id, count }.into())
}

/// Moves an item to `target`, shifting the siblings in between
///
/// Returns the item's new slot.
///
/// # Errors
///
/// - `NotFound` if the item does not exist
/// - `InvariantViolation(OutOfRange)` if `target` is not in `0..count`
/// - `InvariantViolation(NoOp)` if the item is already at `target`
pub async fn move_to_position<O: Ordered>(
    conn: &mut PgConnection,
    id: i64,
    target: i32,
) -> BoardResult<Slot> {
    let slot = locate_locked::<O>(conn, id).await?;
    let count = sibling_count::<O>(conn, slot.parent_id).await?;
    let plan = plan_move(slot.position, target, count)?;

    apply::<O>(conn, id, slot, target, plan).await
}

/// Moves an item to the last slot of its parent
///
/// Used before deleting or re-parenting an item so that its departure
/// leaves no gap. An item that is already last is left untouched.
pub async fn move_to_end<O: Ordered>(conn: &mut PgConnection, id: i64) -> BoardResult<Slot> {
    let slot = locate_locked::<O>(conn, id).await?;
    let count = sibling_count::<O>(conn, slot.parent_id).await?;
    let last = to_position(count - 1).ok_or(Violation::ParentFull {
        parent_id: slot.parent_id,
        count,
    })?;

    if slot.position == last {
        return Ok(slot);
    }

    let plan = plan_move(slot.position, last, count)?;
    apply::<O>(conn, id, slot, last, plan).await
}

/// Locks the item's parent, then reads the item's slot under that lock
async fn locate_locked<O: Ordered>(conn: &mut PgConnection, id: i64) -> BoardResult<Slot> {
    let unlocked = locate::<O>(conn, id).await?;
    lock_parent::<O>(conn, unlocked.parent_id).await?;
    locate::<O>(conn, id).await
}

async fn apply<O: Ordered>(
    conn: &mut PgConnection,
    id: i64,
    slot: Slot,
    target: i32,
    plan: Displacement,
) -> BoardResult<Slot> {
    let displace = format!(
        "UPDATE {table} SET {position} = {position} + $1 \
         WHERE {parent} = $2 AND {position} BETWEEN $3 AND $4",
        table = O::TABLE,
        position = O::POSITION,
        parent = O::PARENT,
    );

    let displaced = sqlx::query(&displace)
        .bind(plan.delta)
        .bind(slot.parent_id)
        .bind(plan.from)
        .bind(plan.to)
        .execute(&mut *conn)
        .await
        .during("displace siblings")?
        .rows_affected();

    let place = format!(
        "UPDATE {table} SET {position} = $1 WHERE {id} = $2",
        table = O::TABLE,
        position = O::POSITION,
        id = O::ID,
    );

    let moved = sqlx::query(&place)
        .bind(target)
        .bind(id)
        .execute(&mut *conn)
        .await
        .during("place item")?
        .rows_affected();

    debug!(
        table = O::TABLE,
        id,
        from = slot.position,
        to = target,
        displaced,
        moved,
        "Moved item"
    );

    Ok(Slot {
        parent_id: slot.parent_id,
        position: target,
    })
}

/// Converts a sibling count to a position, `None` past the `INTEGER` range
fn to_position(count: i64) -> Option<i32> {
    i32::try_from(count).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// In-memory sibling list driven by the same plans as the SQL engine
    #[derive(Debug, Default)]
    struct Siblings {
        // (id, position)
        items: Vec<(u32, i32)>,
        next_id: u32,
    }

    impl Siblings {
        fn append(&mut self) -> u32 {
            let id = self.next_id;
            self.next_id += 1;
            self.items.push((id, self.items.len() as i32));
            id
        }

        fn position(&self, id: u32) -> i32 {
            self.items.iter().find(|(i, _)| *i == id).map(|(_, p)| *p).unwrap()
        }

        fn move_to(&mut self, id: u32, target: i32) -> Result<(), Violation> {
            let current = self.position(id);
            let plan = plan_move(current, target, self.items.len() as i64)?;
            for (_, pos) in self.items.iter_mut() {
                if plan.covers(*pos) {
                    *pos += plan.delta;
                }
            }
            for (i, pos) in self.items.iter_mut() {
                if *i == id {
                    *pos = target;
                }
            }
            Ok(())
        }

        fn delete(&mut self, id: u32) {
            let last = self.items.len() as i32 - 1;
            if self.position(id) != last {
                self.move_to(id, last).unwrap();
            }
            self.items.retain(|(i, _)| *i != id);
        }

        fn sorted_positions(&self) -> Vec<i32> {
            let mut positions: Vec<i32> = self.items.iter().map(|(_, p)| *p).collect();
            positions.sort_unstable();
            positions
        }

        fn order(&self) -> Vec<u32> {
            let mut items = self.items.clone();
            items.sort_by_key(|(_, p)| *p);
            items.into_iter().map(|(i, _)| i).collect()
        }
    }

    #[test]
    fn test_plan_move_left() {
        let plan = plan_move(3, 1, 5).unwrap();
        assert_eq!(plan, Displacement { from: 1, to: 2, delta: 1 });
    }

    #[test]
    fn test_plan_move_right() {
        let plan = plan_move(0, 2, 3).unwrap();
        assert_eq!(plan, Displacement { from: 1, to: 2, delta: -1 });
    }

    #[test]
    fn test_plan_move_same_position_is_noop() {
        assert_eq!(plan_move(1, 1, 3), Err(Violation::NoOp { position: 1 }));
    }

    #[test]
    fn test_plan_move_out_of_range() {
        assert_eq!(
            plan_move(0, 3, 3),
            Err(Violation::OutOfRange { requested: 3, count: 3 })
        );
        assert_eq!(
            plan_move(0, -1, 3),
            Err(Violation::OutOfRange { requested: -1, count: 3 })
        );
    }

    #[test]
    fn test_range_check_precedes_noop() {
        // Single item: target 0 is a no-op, target 1 is out of range
        assert_eq!(plan_move(0, 0, 1), Err(Violation::NoOp { position: 0 }));
        assert!(matches!(plan_move(0, 1, 1), Err(Violation::OutOfRange { .. })));
    }

    #[test]
    fn test_to_position_rejects_counts_beyond_integer_range() {
        assert_eq!(to_position(0), Some(0));
        assert_eq!(to_position(i64::from(i32::MAX)), Some(i32::MAX));
        assert_eq!(to_position(i64::from(i32::MAX) + 1), None);
    }

    #[test]
    fn test_displacement_covers() {
        let plan = Displacement { from: 1, to: 3, delta: -1 };
        assert!(!plan.covers(0));
        assert!(plan.covers(1));
        assert!(plan.covers(3));
        assert!(!plan.covers(4));
    }

    #[test]
    fn test_column_scenario() {
        // Columns "TODO", "Doing", "Done"
        let mut board = Siblings::default();
        let todo = board.append();
        let doing = board.append();
        let done = board.append();

        board.move_to(todo, 2).unwrap();
        assert_eq!(board.order(), vec![doing, done, todo]);

        board.delete(doing);
        assert_eq!(board.order(), vec![done, todo]);
        assert_eq!(board.sorted_positions(), vec![0, 1]);
    }

    #[test]
    fn test_failed_moves_do_not_mutate() {
        let mut board = Siblings::default();
        let a = board.append();
        board.append();

        assert!(board.move_to(a, 0).is_err());
        assert!(board.move_to(a, 2).is_err());
        assert_eq!(board.sorted_positions(), vec![0, 1]);
        assert_eq!(board.position(a), 0);
    }

    proptest! {
        #[test]
        fn prop_positions_stay_dense(ops in prop::collection::vec((0u8..3, any::<u16>(), any::<u16>()), 0..64)) {
            let mut board = Siblings::default();

            for (kind, a, b) in ops {
                let len = board.items.len();
                match kind {
                    0 => {
                        board.append();
                    }
                    1 if len > 0 => {
                        let id = board.items[a as usize % len].0;
                        let target = (b as usize % len) as i32;
                        let current = board.position(id);
                        let result = board.move_to(id, target);
                        prop_assert_eq!(result.is_err(), current == target);
                        if result.is_ok() {
                            prop_assert_eq!(board.position(id), target);
                        }
                    }
                    2 if len > 0 => {
                        let id = board.items[a as usize % len].0;
                        board.delete(id);
                    }
                    _ => {}
                }

                let expected: Vec<i32> = (0..board.items.len() as i32).collect();
                prop_assert_eq!(board.sorted_positions(), expected);
            }
        }

        #[test]
        fn prop_out_of_range_always_rejected(current in 0i32..100, extra in 0i64..100, count in 1i64..100) {
            prop_assume!(i64::from(current) < count);
            let target = (count + extra) as i32;
            let rejected = matches!(plan_move(current, target, count), Err(Violation::OutOfRange { .. }));
            prop_assert!(rejected);
        }

        #[test]
        fn prop_move_preserves_relative_order_of_others(len in 2usize..20, from in any::<u16>(), to in any::<u16>()) {
            let mut board = Siblings::default();
            for _ in 0..len {
                board.append();
            }
            let id = board.order()[from as usize % len];
            let target = (to as usize % len) as i32;
            let before: Vec<u32> = board.order().into_iter().filter(|i| *i != id).collect();

            let _ = board.move_to(id, target);

            let after: Vec<u32> = board.order().into_iter().filter(|i| *i != id).collect();
            prop_assert_eq!(before, after);
        }
    }
}
