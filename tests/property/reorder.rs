//! Property-based tests for drag reconciliation.
//!
//! Uses proptest to verify, for any column and any pair of positions:
//! 1. A same-column drop yields one reorder whose ids are a permutation of
//!    the column and whose orders are exactly `0..n`.
//! 2. The new sequence equals `Vec::remove` + `Vec::insert` of the
//!    displayed sequence.
//! 3. Tasks in other columns never appear in the request.
//! 4. Dropping a task on itself yields no update.

use proptest::prelude::*;
use taskboard::board::{DragPlan, DropTarget, Reconciliation, column, plan_drag};
use taskboard_proto::task::{Category, Task, TaskId};

fn make_task(id: String, category: Category, order: i64) -> Task {
    Task {
        id: TaskId::new(id),
        title: String::new(),
        description: String::new(),
        email: String::new(),
        timestamp: String::new(),
        category,
        order,
    }
}

fn arb_category() -> impl Strategy<Value = Category> {
    prop_oneof![
        Just(Category::Todo),
        Just(Category::InProgress),
        Just(Category::Done),
    ]
}

/// A board where every task in `category` has an arbitrary (possibly
/// duplicated) order, plus some tasks elsewhere.
fn arb_board() -> impl Strategy<Value = (Category, Vec<Task>, usize)> {
    (arb_category(), 1_usize..12, 0_usize..6).prop_flat_map(|(category, n, others)| {
        (
            Just(category),
            proptest::collection::vec(-5_i64..20, n),
            proptest::collection::vec((arb_category(), 0_i64..5), others),
        )
            .prop_map(|(category, orders, others)| {
                let mut tasks: Vec<Task> = orders
                    .into_iter()
                    .enumerate()
                    .map(|(i, order)| make_task(format!("t{i}"), category, order))
                    .collect();
                tasks.extend(
                    others
                        .into_iter()
                        .enumerate()
                        .filter(|(_, (c, _))| *c != category)
                        .map(|(i, (c, order))| make_task(format!("o{i}"), c, order)),
                );
                let n = tasks.iter().filter(|t| t.category == category).count();
                (category, tasks, n)
            })
    })
}

proptest! {
    #[test]
    fn reorder_is_remove_insert((category, tasks, n) in arb_board(), from in 0_usize..12, to in 0_usize..12) {
        let from = from % n;
        let to = to % n;

        let displayed: Vec<TaskId> = column(&tasks, category).iter().map(|t| t.id.clone()).collect();
        let active = displayed[from].clone();
        let over = displayed[to].clone();

        let result = plan_drag(&tasks, &active, Some(&DropTarget::Task(over)));

        if from == to {
            prop_assert!(matches!(result, Reconciliation::NoOp(_)));
            return Ok(());
        }

        let request = match result {
            Reconciliation::Update(DragPlan::Reorder(request)) => request,
            other => return Err(TestCaseError::fail(format!("expected reorder, got {other:?}"))),
        };
        prop_assert_eq!(request.category, category);

        let mut expected = displayed.clone();
        let moved = expected.remove(from);
        expected.insert(to, moved);

        let sent: Vec<TaskId> = request.tasks.iter().map(|e| e.id.clone()).collect();
        prop_assert_eq!(&sent, &expected);

        let orders: Vec<i64> = request.tasks.iter().map(|e| e.order).collect();
        let expected_orders: Vec<i64> = (0..).take(n).collect();
        prop_assert_eq!(orders, expected_orders);

        for entry in &request.tasks {
            prop_assert!(entry.id.as_str().starts_with('t'));
        }
    }

    #[test]
    fn column_drop_only_moves((category, tasks, _n) in arb_board(), target in arb_category()) {
        let active = column(&tasks, category)[0].id.clone();
        let result = plan_drag(&tasks, &active, Some(&DropTarget::Column(target)));

        if target == category {
            prop_assert!(matches!(result, Reconciliation::NoOp(_)));
        } else {
            prop_assert_eq!(
                result,
                Reconciliation::Update(DragPlan::Move { id: active, category: target })
            );
        }
    }
}
