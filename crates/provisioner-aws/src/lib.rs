//! provisioner-aws: AWS backend for the capacity control loop.
//!
//! - **`dynamodb`**: table and global secondary index throughput
//!   (`DescribeTable`, `UpdateTable`)
//! - **`cloudwatch`**: metric statistics and alarm definitions
//!   (`GetMetricStatistics`, `DescribeAlarms`, `PutMetricAlarm`)
//!
//! Credentials and region come from the standard AWS SDK provider chain;
//! `[aws]` in provisioner.toml can pin the region or point both clients
//! at a local endpoint.

pub mod cloudwatch;
pub mod dynamodb;

use tracing::info;

use provisioner_core::config::AwsConfig;

pub use cloudwatch::CloudWatch;
pub use dynamodb::DynamoDbCapacity;

/// DynamoDB and CloudWatch clients built from one shared SDK config.
#[derive(Clone)]
pub struct AwsBackend {
    pub capacity: DynamoDbCapacity,
    pub cloudwatch: CloudWatch,
}

impl AwsBackend {
    /// Load the SDK config (applying any overrides) and build both clients.
    pub async fn load(config: &AwsConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &config.region {
            loader = loader.region(aws_config::Region::new(region.clone()));
        }
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        info!(
            region = sdk_config.region().map(|r| r.as_ref()).unwrap_or("<unset>"),
            endpoint = config.endpoint_url.as_deref().unwrap_or("<default>"),
            "aws clients initialized"
        );

        Self {
            capacity: DynamoDbCapacity::new(aws_sdk_dynamodb::Client::new(&sdk_config)),
            cloudwatch: CloudWatch::new(aws_sdk_cloudwatch::Client::new(&sdk_config)),
        }
    }
}
