//! Remote execution seam
//!
//! The dispatcher only talks to [`RemoteExecutor`] and [`RemoteConnection`].
//! [`SshExecutor`] is the production implementation: it fans every copy and
//! command out to each instance of the connected classes using `scp` and
//! `ssh`, one target at a time.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::application::DeploySettings;
use crate::error::RemoteExecutionError;
use crate::topology::Topology;

use super::manifest::TargetKind;

/// Opens connections to every instance of a set of classes
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    async fn connect(
        &self,
        kind: TargetKind,
        class_names: &[String],
    ) -> Result<Box<dyn RemoteConnection>, RemoteExecutionError>;
}

/// Operations applied to every target of a connection
#[async_trait]
pub trait RemoteConnection: Send + Sync {
    async fn copy_to(
        &self,
        source: &Path,
        destination: &str,
        logname: &str,
    ) -> Result<(), RemoteExecutionError>;

    async fn run_command(&self, command: &str, logname: &str) -> Result<(), RemoteExecutionError>;
}

// ============================================================================
// SBIO: Pure functions (no I/O)
// ============================================================================

/// One reachable host and the class it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub class_name: String,
    pub host: String,
}

/// Replace the class placeholder for `kind` with the target's class
pub fn substitute_class(command: &str, kind: TargetKind, class_name: &str) -> String {
    command.replace(kind.class_placeholder(), class_name)
}

/// Hostnames of every instance of every class, keyed by kind then class
pub fn target_hosts(topology: &Topology) -> BTreeMap<(TargetKind, String), Vec<String>> {
    let mut hosts = BTreeMap::new();
    for blade in &topology.blade_classes {
        hosts.insert(
            (TargetKind::Blade, blade.name.clone()),
            (0..blade.count).map(|i| blade.hostname(i)).collect(),
        );
    }
    for node in &topology.node_classes {
        hosts.insert(
            (TargetKind::Node, node.name.clone()),
            (0..node.count).map(|i| node.node_name(i)).collect(),
        );
    }
    hosts
}

// ============================================================================
// I/O boundary
// ============================================================================

/// `scp`/`ssh` based executor
#[derive(Debug, Clone)]
pub struct SshExecutor {
    hosts: BTreeMap<(TargetKind, String), Vec<String>>,
    remote_user: String,
    timeout: Duration,
    ssh_options: Vec<String>,
    ssh_program: String,
    scp_program: String,
}

impl SshExecutor {
    pub fn new(topology: &Topology, settings: &DeploySettings) -> Self {
        Self {
            hosts: target_hosts(topology),
            remote_user: settings.remote_user.clone(),
            timeout: Duration::from_secs(settings.command_timeout),
            ssh_options: vec![
                "-o".to_string(),
                "BatchMode=yes".to_string(),
                "-o".to_string(),
                "StrictHostKeyChecking=no".to_string(),
            ],
            ssh_program: "ssh".to_string(),
            scp_program: "scp".to_string(),
        }
    }

    /// Use different `ssh` and `scp` binaries
    pub fn with_programs(mut self, ssh: impl Into<String>, scp: impl Into<String>) -> Self {
        self.ssh_program = ssh.into();
        self.scp_program = scp.into();
        self
    }

    pub fn with_ssh_options(mut self, options: Vec<String>) -> Self {
        self.ssh_options = options;
        self
    }
}

#[async_trait]
impl RemoteExecutor for SshExecutor {
    async fn connect(
        &self,
        kind: TargetKind,
        class_names: &[String],
    ) -> Result<Box<dyn RemoteConnection>, RemoteExecutionError> {
        let mut targets = Vec::new();
        for class_name in class_names {
            let hosts = self
                .hosts
                .get(&(kind, class_name.clone()))
                .filter(|h| !h.is_empty())
                .ok_or_else(|| RemoteExecutionError::NoTargets {
                    kind: kind.to_string(),
                    class: class_name.clone(),
                })?;
            targets.extend(hosts.iter().map(|host| RemoteTarget {
                class_name: class_name.clone(),
                host: host.clone(),
            }));
        }
        info!("connected to {} {} targets", targets.len(), kind);

        Ok(Box::new(SshConnection {
            kind,
            targets,
            remote_user: self.remote_user.clone(),
            timeout: self.timeout,
            ssh_options: self.ssh_options.clone(),
            ssh_program: self.ssh_program.clone(),
            scp_program: self.scp_program.clone(),
        }))
    }
}

/// Connection to a fixed list of targets
#[derive(Debug, Clone)]
pub struct SshConnection {
    kind: TargetKind,
    targets: Vec<RemoteTarget>,
    remote_user: String,
    timeout: Duration,
    ssh_options: Vec<String>,
    ssh_program: String,
    scp_program: String,
}

impl SshConnection {
    pub fn targets(&self) -> &[RemoteTarget] {
        &self.targets
    }

    fn destination(&self, host: &str) -> String {
        format!("{}@{}", self.remote_user, host)
    }

    async fn execute(
        &self,
        program: &str,
        args: Vec<String>,
        host: &str,
        display: &str,
        logname: &str,
    ) -> Result<(), RemoteExecutionError> {
        debug!("[{}] {} {}", logname, program, args.join(" "));

        let mut cmd = Command::new(program);
        cmd.args(&args).kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| RemoteExecutionError::Timeout {
                host: host.to_string(),
                command: display.to_string(),
                seconds: self.timeout.as_secs(),
            })?
            .map_err(|e| RemoteExecutionError::Spawn {
                command: program.to_string(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(RemoteExecutionError::CommandFailed {
                logname: logname.to_string(),
                host: host.to_string(),
                command: display.to_string(),
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteConnection for SshConnection {
    async fn copy_to(
        &self,
        source: &Path,
        destination: &str,
        logname: &str,
    ) -> Result<(), RemoteExecutionError> {
        for target in &self.targets {
            let remote = format!("{}:{}", self.destination(&target.host), destination);
            let mut args = self.ssh_options.clone();
            args.push("-q".to_string());
            args.push(source.display().to_string());
            args.push(remote.clone());
            let display = format!("copy {} to {}", source.display(), remote);
            self.execute(&self.scp_program, args, &target.host, &display, logname)
                .await?;
        }
        Ok(())
    }

    async fn run_command(&self, command: &str, logname: &str) -> Result<(), RemoteExecutionError> {
        for target in &self.targets {
            let command = substitute_class(command, self.kind, &target.class_name);
            let mut args = self.ssh_options.clone();
            args.push(self.destination(&target.host));
            args.push(command.clone());
            self.execute(&self.ssh_program, args, &target.host, &command, logname)
                .await?;
        }
        Ok(())
    }
}
