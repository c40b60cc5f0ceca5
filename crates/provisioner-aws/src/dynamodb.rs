//! DynamoDB capacity store.

use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::{
    GlobalSecondaryIndexUpdate, ProvisionedThroughput, ProvisionedThroughputDescription,
    UpdateGlobalSecondaryIndexAction,
};
use tracing::debug;

use provisioner_core::remote::*;
use provisioner_core::types::*;

const SERVICE: &str = "dynamodb";

/// Provisioned throughput of DynamoDB tables and their global secondary indexes.
#[derive(Clone)]
pub struct DynamoDbCapacity {
    client: aws_sdk_dynamodb::Client,
}

impl DynamoDbCapacity {
    pub fn new(client: aws_sdk_dynamodb::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CapacityStore for DynamoDbCapacity {
    async fn describe_table(&self, table: &str) -> RemoteResult<Option<TableDescription>> {
        let output = match self.client.describe_table().table_name(table).send().await {
            Ok(output) => output,
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception()) =>
            {
                debug!(%table, "table not found");
                return Ok(None);
            }
            Err(err) => {
                return Err(RemoteError::new(
                    SERVICE,
                    format!("DescribeTable {table}: {}", DisplayErrorContext(&err)),
                ));
            }
        };

        output
            .table()
            .map(|t| convert_table(table, t))
            .transpose()
    }

    async fn update_throughput(&self, table: &str, update: &ThroughputUpdate) -> RemoteResult<()> {
        let throughput = provisioned(update.throughput())?;
        let request = self.client.update_table().table_name(table);
        let request = match update {
            ThroughputUpdate::Table { .. } => request.provisioned_throughput(throughput),
            ThroughputUpdate::Index { index, .. } => {
                let action = UpdateGlobalSecondaryIndexAction::builder()
                    .index_name(index)
                    .provisioned_throughput(throughput)
                    .build()
                    .map_err(|e| RemoteError::new(SERVICE, e.to_string()))?;
                request.global_secondary_index_updates(
                    GlobalSecondaryIndexUpdate::builder().update(action).build(),
                )
            }
        };

        request.send().await.map_err(|err| {
            RemoteError::new(
                SERVICE,
                format!("UpdateTable {table}: {}", DisplayErrorContext(&err)),
            )
        })?;
        debug!(%table, ?update, "throughput updated");
        Ok(())
    }
}

fn provisioned(throughput: Throughput) -> RemoteResult<ProvisionedThroughput> {
    ProvisionedThroughput::builder()
        .read_capacity_units(to_units(throughput.read_capacity_units)?)
        .write_capacity_units(to_units(throughput.write_capacity_units)?)
        .build()
        .map_err(|e| RemoteError::new(SERVICE, e.to_string()))
}

fn to_units(value: u64) -> RemoteResult<i64> {
    i64::try_from(value)
        .map_err(|_| RemoteError::new(SERVICE, format!("capacity {value} out of range")))
}

fn convert_throughput(
    owner: &str,
    description: Option<&ProvisionedThroughputDescription>,
) -> RemoteResult<Throughput> {
    let description = description.ok_or_else(|| {
        RemoteError::new(SERVICE, format!("{owner} has no provisioned throughput"))
    })?;
    let units = |value: Option<i64>, field: &str| {
        value
            .and_then(|v| u64::try_from(v).ok())
            .ok_or_else(|| RemoteError::new(SERVICE, format!("{owner} is missing {field}")))
    };
    Ok(Throughput {
        read_capacity_units: units(description.read_capacity_units(), "ReadCapacityUnits")?,
        write_capacity_units: units(description.write_capacity_units(), "WriteCapacityUnits")?,
    })
}

/// Convert a `DescribeTable` result into the domain description.
pub fn convert_table(
    table: &str,
    description: &aws_sdk_dynamodb::types::TableDescription,
) -> RemoteResult<TableDescription> {
    let table_name = description.table_name().unwrap_or(table).to_string();
    let throughput = convert_throughput(&table_name, description.provisioned_throughput())?;

    let indexes = description
        .global_secondary_indexes()
        .iter()
        .filter_map(|gsi| {
            let name = gsi.index_name()?;
            Some(
                convert_throughput(&format!("{table_name}/{name}"), gsi.provisioned_throughput())
                    .map(|throughput| IndexDescription {
                        index_name: name.to_string(),
                        throughput,
                    }),
            )
        })
        .collect::<RemoteResult<Vec<_>>>()?;

    Ok(TableDescription {
        table_name,
        throughput,
        indexes,
    })
}
