use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_ssm::error::DisplayErrorContext;
use tracing::debug;

use crate::config::RemoteConfig;
use crate::error::RelayError;
use crate::storage::{output_object_key, INPUT_PREFIX};

/// Shell document used for every dispatch.
const RUN_SHELL_SCRIPT: &str = "AWS-RunShellScript";

/// Shell script run on the GPU host for an inference round: pull the staged
/// inputs down, then run the segmentation container over them.
pub fn inference_commands(remote: &RemoteConfig, bucket: &str) -> Vec<String> {
    vec![
        format!("aws s3 sync s3://{}/{} {}", bucket, INPUT_PREFIX, remote.input_dir),
        format!("mkdir -p {}", remote.output_dir),
        format!(
            "docker run --rm --gpus all -v {}:/input -v {}:/output {}",
            remote.input_dir, remote.output_dir, remote.inference_image
        ),
    ]
}

/// Shell script that zips the output directory and pushes the archive to
/// the bucket under the given name.
pub fn package_commands(remote: &RemoteConfig, bucket: &str, archive_name: &str) -> Vec<String> {
    vec![
        format!("cd {} && zip -r /tmp/{} .", remote.output_dir, archive_name),
        format!(
            "aws s3 cp /tmp/{} s3://{}/{}",
            archive_name,
            bucket,
            output_object_key(archive_name)
        ),
    ]
}

/// Shell script removing the GPU host's local staging directories.
pub fn purge_commands(remote: &RemoteConfig) -> Vec<String> {
    vec![format!("rm -rf {} {}", remote.input_dir, remote.output_dir)]
}

/// Fire-and-forget shell command execution on a named remote instance.
/// Returns the dispatch's acceptance token; completion is never observed.
#[async_trait]
pub trait CommandDispatch: Send + Sync {
    async fn dispatch(
        &self,
        commands: Vec<String>,
        execution_timeout: Duration,
    ) -> Result<String, RelayError>;
}

/// Production dispatcher backed by SSM `SendCommand`.
pub struct SsmDispatcher {
    client: aws_sdk_ssm::Client,
    instance_id: String,
}

impl SsmDispatcher {
    pub fn new(client: aws_sdk_ssm::Client, instance_id: String) -> Self {
        Self { client, instance_id }
    }
}

#[async_trait]
impl CommandDispatch for SsmDispatcher {
    async fn dispatch(
        &self,
        commands: Vec<String>,
        execution_timeout: Duration,
    ) -> Result<String, RelayError> {
        debug!("Dispatching to {}: {:?}", self.instance_id, commands);

        let response = self
            .client
            .send_command()
            .instance_ids(&self.instance_id)
            .document_name(RUN_SHELL_SCRIPT)
            .parameters("commands", commands)
            .parameters(
                "executionTimeout",
                vec![execution_timeout.as_secs().to_string()],
            )
            .send()
            .await
            .map_err(|e| RelayError::Dispatch(DisplayErrorContext(e).to_string()))?;

        response
            .command()
            .and_then(|command| command.command_id())
            .map(str::to_string)
            .ok_or_else(|| {
                RelayError::Dispatch("dispatch accepted without a command id".to_string())
            })
    }
}
