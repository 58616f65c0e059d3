//! Deployment manifests
//!
//! A manifest names a target kind, the classes of that kind to reach, the
//! files to place on each target and the script to run once they are there.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::application::{
    DeploySettings, APP_CONFIG_NAME, BLADE_DEPLOY_SCRIPT_NAME, COMMON_DEPLOY_LIB_NAME,
    NODE_DEPLOY_SCRIPT_NAME,
};
use crate::topology::Topology;

/// Home directory of the remote account on every target
pub const REMOTE_HOME: &str = "/root";

/// Interpreter used on nodes
pub const NODE_PYTHON: &str = "python3";

/// Which kind of virtual host a manifest targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Node,
    Blade,
}

impl TargetKind {
    /// Placeholder the executor replaces with the class of each target
    pub fn class_placeholder(&self) -> &'static str {
        match self {
            TargetKind::Node => "{{ node_class }}",
            TargetKind::Blade => "{{ blade_class }}",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Node => "node",
            TargetKind::Blade => "blade",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file to copy onto every target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTransfer {
    pub source: PathBuf,
    pub destination: String,
    pub tag: String,
}

impl FileTransfer {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<String>, tag: &str) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            tag: tag.to_string(),
        }
    }

    pub fn copy_logname(&self, kind: TargetKind) -> String {
        format!("upload-application-{}-to-{}", self.tag, kind)
    }

    pub fn restrict_logname(&self, kind: TargetKind) -> String {
        format!("restrict-access-to-{}-on-{}", self.tag, kind)
    }

    pub fn restrict_command(&self) -> String {
        format!("chmod 0600 {}", self.destination)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub kind: TargetKind,
    pub class_names: Vec<String>,
    pub files: Vec<FileTransfer>,
    /// Remote path of the deploy script
    pub script: String,
    pub python: String,
}

impl Manifest {
    /// Command run on each target once every file is in place
    pub fn deploy_command(&self) -> String {
        format!(
            "{} {} {} {}",
            self.python,
            self.script,
            self.kind.class_placeholder(),
            remote_home(APP_CONFIG_NAME)
        )
    }

    pub fn deploy_logname(&self) -> String {
        format!("run-{}-app-deploy-script-on", self.kind)
    }
}

/// Path of `name` in the remote home directory
pub fn remote_home(name: &str) -> String {
    format!("{}/{}", REMOTE_HOME, name)
}

fn manifest(
    kind: TargetKind,
    class_names: Vec<String>,
    script_name: &str,
    script_tag: &str,
    python: &str,
    scripts_dir: &Path,
    config_path: &Path,
) -> Manifest {
    Manifest {
        kind,
        class_names,
        files: vec![
            FileTransfer::new(scripts_dir.join(script_name), remote_home(script_name), script_tag),
            FileTransfer::new(
                scripts_dir.join(COMMON_DEPLOY_LIB_NAME),
                remote_home(COMMON_DEPLOY_LIB_NAME),
                "common-deploy",
            ),
            FileTransfer::new(config_path, remote_home(APP_CONFIG_NAME), "config"),
        ],
        script: remote_home(script_name),
        python: python.to_string(),
    }
}

/// The node manifest (installer node class) followed by the blade manifest
/// (every blade class)
pub fn node_manifests(
    settings: &DeploySettings,
    topology: &Topology,
    scripts_dir: &Path,
    config_path: &Path,
) -> Vec<Manifest> {
    vec![
        manifest(
            TargetKind::Node,
            vec![settings.installer_node_class.clone()],
            NODE_DEPLOY_SCRIPT_NAME,
            "node-deploy",
            NODE_PYTHON,
            scripts_dir,
            config_path,
        ),
        manifest(
            TargetKind::Blade,
            topology.blade_class_names(),
            BLADE_DEPLOY_SCRIPT_NAME,
            "blade-deploy",
            &settings.blade_python,
            scripts_dir,
            config_path,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::BladeClass;

    fn manifests() -> Vec<Manifest> {
        let topology = Topology {
            blade_classes: vec![BladeClass::new("mgmt", 1), BladeClass::new("compute", 2)],
            ..Default::default()
        };
        let settings = DeploySettings {
            blade_python: "/usr/bin/python3.11".to_string(),
            ..Default::default()
        };
        node_manifests(
            &settings,
            &topology,
            Path::new("/opt/vshasta/scripts"),
            Path::new("/tmp/build/application_core_config.yaml"),
        )
    }

    #[test]
    fn test_node_manifest() {
        let manifests = manifests();
        let node = &manifests[0];
        assert_eq!(node.kind, TargetKind::Node);
        assert_eq!(node.class_names, vec!["pit_node"]);
        let dests: Vec<(&str, &str)> = node
            .files
            .iter()
            .map(|f| (f.destination.as_str(), f.tag.as_str()))
            .collect();
        assert_eq!(
            dests,
            vec![
                ("/root/deploy_application_to_node.py", "node-deploy"),
                ("/root/deploy_application_common.py", "common-deploy"),
                ("/root/application_core_config.yaml", "config"),
            ]
        );
        assert_eq!(
            node.files[0].source,
            PathBuf::from("/opt/vshasta/scripts/deploy_application_to_node.py")
        );
        assert_eq!(
            node.deploy_command(),
            "python3 /root/deploy_application_to_node.py {{ node_class }} /root/application_core_config.yaml"
        );
        assert_eq!(node.deploy_logname(), "run-node-app-deploy-script-on");
    }

    #[test]
    fn test_blade_manifest() {
        let manifests = manifests();
        let blade = &manifests[1];
        assert_eq!(blade.kind, TargetKind::Blade);
        assert_eq!(blade.class_names, vec!["mgmt", "compute"]);
        assert_eq!(blade.files[0].tag, "blade-deploy");
        assert_eq!(
            blade.files[2].source,
            PathBuf::from("/tmp/build/application_core_config.yaml")
        );
        assert_eq!(
            blade.deploy_command(),
            "/usr/bin/python3.11 /root/deploy_application_to_blade.py {{ blade_class }} /root/application_core_config.yaml"
        );
    }

    #[test]
    fn test_default_scripts_dir_ships_every_script() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join(DeploySettings::default().scripts_dir);
        for name in [NODE_DEPLOY_SCRIPT_NAME, BLADE_DEPLOY_SCRIPT_NAME, COMMON_DEPLOY_LIB_NAME] {
            assert!(dir.join(name).is_file(), "{} is missing", name);
        }
    }

    #[test]
    fn test_lognames() {
        let transfer = FileTransfer::new("/a/b", "/root/b", "config");
        assert_eq!(transfer.copy_logname(TargetKind::Blade), "upload-application-config-to-blade");
        assert_eq!(transfer.restrict_logname(TargetKind::Node), "restrict-access-to-config-on-node");
        assert_eq!(transfer.restrict_command(), "chmod 0600 /root/b");
    }
}
