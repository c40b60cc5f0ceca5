//! Capacity store adapter.
//!
//! Turns "set the write capacity of Orders/by-customer to 48" into a
//! complete throughput write: the current configuration is loaded, only
//! the requested direction is replaced, and the other direction is
//! copied over unchanged.

use tracing::{debug, info};

use provisioner_core::{
    CapacityStore, CapacityValue, Direction, ResourceRef, TableDescription, Throughput,
    ThroughputUpdate,
};

use crate::error::{ControlError, ControlResult, Stage};

/// Current throughput of `resource` within its table description.
///
/// Fails with [`ControlError::IndexNotFound`] when the index is not
/// configured on the table.
pub fn current_throughput(
    description: &TableDescription,
    resource: &ResourceRef,
) -> ControlResult<Throughput> {
    match resource {
        ResourceRef::Table { .. } => Ok(description.throughput),
        ResourceRef::Index { table, index } => description
            .index(index)
            .map(|i| i.throughput)
            .ok_or_else(|| ControlError::IndexNotFound {
                table: table.clone(),
                index: index.clone(),
            }),
    }
}

/// Build the throughput write for `resource` from its current description.
pub fn plan_update(
    description: &TableDescription,
    resource: &ResourceRef,
    direction: Direction,
    value: CapacityValue,
) -> ControlResult<ThroughputUpdate> {
    let throughput = current_throughput(description, resource)?.with(direction, value);
    Ok(match resource {
        ResourceRef::Table { .. } => ThroughputUpdate::Table { throughput },
        ResourceRef::Index { index, .. } => ThroughputUpdate::Index {
            index: index.clone(),
            throughput,
        },
    })
}

/// Apply `value` to the `direction` throughput of `resource`.
///
/// Returns the resulting throughput pair. Nothing is written when the
/// table or index cannot be found, or when `direction` already holds
/// `value` (the capacity store rejects unchanged throughput).
pub async fn apply(
    store: &dyn CapacityStore,
    resource: &ResourceRef,
    direction: Direction,
    value: CapacityValue,
) -> ControlResult<Throughput> {
    let table = resource.table();
    let description = store
        .describe_table(table)
        .await
        .map_err(ControlError::remote(Stage::StoreUpdate, resource.to_string()))?
        .ok_or_else(|| ControlError::TableNotFound(table.to_string()))?;

    let current = current_throughput(&description, resource)?;
    if current.get(direction) == value.get() {
        debug!(
            %resource,
            field = direction.field_name(),
            %value,
            "provision unchanged, skipping update"
        );
        return Ok(current);
    }

    let update = plan_update(&description, resource, direction, value)?;
    info!(
        %resource,
        field = direction.field_name(),
        %value,
        read = update.throughput().read_capacity_units,
        write = update.throughput().write_capacity_units,
        "updating provision"
    );

    store
        .update_throughput(table, &update)
        .await
        .map_err(ControlError::remote(Stage::StoreUpdate, resource.to_string()))?;
    Ok(update.throughput())
}

#[cfg(test)]
mod tests {
    use super::*;
    use provisioner_core::IndexDescription;
    use provisioner_state::StateStore;

    fn orders() -> TableDescription {
        TableDescription {
            table_name: "Orders".to_string(),
            throughput: Throughput::new(10, 20),
            indexes: vec![
                IndexDescription {
                    index_name: "by-customer".to_string(),
                    throughput: Throughput::new(3, 4),
                },
                IndexDescription {
                    index_name: "by-date".to_string(),
                    throughput: Throughput::new(7, 8),
                },
            ],
        }
    }

    fn table_ref() -> ResourceRef {
        ResourceRef::Table {
            table: "Orders".to_string(),
        }
    }

    fn index_ref(index: &str) -> ResourceRef {
        ResourceRef::Index {
            table: "Orders".to_string(),
            index: index.to_string(),
        }
    }

    #[test]
    fn table_write_keeps_read() {
        let update = plan_update(&orders(), &table_ref(), Direction::Write, CapacityValue(48)).unwrap();
        assert_eq!(
            update,
            ThroughputUpdate::Table {
                throughput: Throughput::new(10, 48)
            }
        );
    }

    #[test]
    fn index_read_keeps_write() {
        let update =
            plan_update(&orders(), &index_ref("by-date"), Direction::Read, CapacityValue(2)).unwrap();
        assert_eq!(
            update,
            ThroughputUpdate::Index {
                index: "by-date".to_string(),
                throughput: Throughput::new(2, 8)
            }
        );
    }

    #[test]
    fn index_match_is_exact() {
        let err = plan_update(&orders(), &index_ref("By-Customer"), Direction::Read, CapacityValue(1))
            .unwrap_err();
        assert!(matches!(
            err,
            ControlError::IndexNotFound { ref table, ref index } if table == "Orders" && index == "By-Customer"
        ));
    }

    #[tokio::test]
    async fn apply_to_table() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_table(&orders()).unwrap();

        let written = apply(&store, &table_ref(), Direction::Write, CapacityValue(48))
            .await
            .unwrap();
        assert_eq!(written, Throughput::new(10, 48));

        let table = store.get_table("Orders").unwrap().unwrap();
        assert_eq!(table.throughput, Throughput::new(10, 48));
        assert_eq!(table.indexes, orders().indexes);
    }

    #[tokio::test]
    async fn apply_to_index() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_table(&orders()).unwrap();

        apply(&store, &index_ref("by-customer"), Direction::Write, CapacityValue(9))
            .await
            .unwrap();

        let table = store.get_table("Orders").unwrap().unwrap();
        assert_eq!(table.throughput, Throughput::new(10, 20));
        assert_eq!(table.index("by-customer").unwrap().throughput, Throughput::new(3, 9));
        assert_eq!(table.index("by-date").unwrap().throughput, Throughput::new(7, 8));
    }

    #[tokio::test]
    async fn missing_index_issues_no_write() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_table(&orders()).unwrap();

        let err = apply(&store, &index_ref("missing"), Direction::Read, CapacityValue(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::IndexNotFound { .. }));
        assert!(store.list_throughput_history("Orders").unwrap().is_empty());
        assert_eq!(store.get_table("Orders").unwrap().unwrap(), orders());
    }

    #[tokio::test]
    async fn missing_table_is_reported() {
        let store = StateStore::open_in_memory().unwrap();
        let err = apply(&store, &table_ref(), Direction::Read, CapacityValue(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::TableNotFound(t) if t == "Orders"));
    }

    #[tokio::test]
    async fn replay_is_idempotent() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_table(&orders()).unwrap();

        for _ in 0..2 {
            let written = apply(&store, &table_ref(), Direction::Read, CapacityValue(12))
                .await
                .unwrap();
            assert_eq!(written, Throughput::new(12, 20));
        }

        let history = store.list_throughput_history("Orders").unwrap();
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn unchanged_value_issues_no_write() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_table(&orders()).unwrap();

        let written = apply(&store, &table_ref(), Direction::Write, CapacityValue(20))
            .await
            .unwrap();
        assert_eq!(written, Throughput::new(10, 20));

        let written = apply(&store, &index_ref("by-date"), Direction::Read, CapacityValue(7))
            .await
            .unwrap();
        assert_eq!(written, Throughput::new(7, 8));

        assert!(store.list_throughput_history("Orders").unwrap().is_empty());
    }

    #[tokio::test]
    async fn unchanged_value_on_missing_index_still_fails() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_table(&orders()).unwrap();

        let err = apply(&store, &index_ref("missing"), Direction::Read, CapacityValue(0))
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::IndexNotFound { .. }));
    }
}
