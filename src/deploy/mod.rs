//! Application lifecycle: consolidate, prepare, validate, deploy, remove
//!
//! `validate()`, `deploy()` and `remove()` require a prepared application.
//! Consolidating again discards the prepared state.

pub mod manifest;
pub mod remote;

pub use manifest::{node_manifests, FileTransfer, Manifest, TargetKind};
pub use remote::{RemoteConnection, RemoteExecutor, SshExecutor};

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::application::{ApplicationConfig, APP_CONFIG_NAME};
use crate::config::credentials::BmcCredentials;
use crate::config::{expand_path, validate_system_config};
use crate::consolidate::{consolidate, write_seed_files, Consolidation};
use crate::error::{ConfigurationError, Error, PreconditionError, Result};
use crate::topology::ClusterDescription;

/// Directory under the build directory receiving the seed files
pub const SEED_DIR_NAME: &str = "seed";

/// An application layer deployment and its lifecycle state
#[derive(Debug, Clone)]
pub struct Application {
    app: ApplicationConfig,
    cluster: ClusterDescription,
    build_dir: PathBuf,
    scripts_dir: PathBuf,
    consolidation: Option<Consolidation>,
    prepared: bool,
}

impl Application {
    pub fn new(app: ApplicationConfig, cluster: ClusterDescription, build_dir: impl Into<PathBuf>) -> Self {
        let scripts_dir = expand_path(&app.deploy.scripts_dir);
        Self {
            app,
            cluster,
            build_dir: build_dir.into(),
            scripts_dir,
            consolidation: None,
            prepared: false,
        }
    }

    pub fn with_scripts_dir(mut self, scripts_dir: impl Into<PathBuf>) -> Self {
        self.scripts_dir = scripts_dir.into();
        self
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// Path of the serialized consolidated configuration
    pub fn config_path(&self) -> PathBuf {
        self.build_dir.join(APP_CONFIG_NAME)
    }

    pub fn seed_dir(&self) -> PathBuf {
        self.build_dir.join(SEED_DIR_NAME)
    }

    pub fn consolidation(&self) -> Option<&Consolidation> {
        self.consolidation.as_ref()
    }

    /// Resolve the topology and build the consolidated configuration,
    /// replacing any earlier result
    pub fn consolidate(&mut self, credentials: &BmcCredentials) -> Result<&Consolidation> {
        self.prepared = false;
        self.consolidation = None;
        let consolidation = consolidate(
            &self.app,
            &self.cluster.topology,
            &self.cluster.site,
            credentials,
        )?;
        info!(
            "consolidated {} node xnames into the application configuration",
            consolidation.config.xname_map.len()
        );
        Ok(self.consolidation.insert(consolidation))
    }

    /// Write the consolidated configuration and seed files into the build
    /// directory
    pub fn prepare(&mut self) -> Result<PathBuf> {
        let consolidation = self
            .consolidation
            .as_ref()
            .ok_or_else(|| PreconditionError::unconsolidated("prepare"))?;

        fs::create_dir_all(&self.build_dir).map_err(|e| Error::io(&self.build_dir, e))?;
        let config_path = self.config_path();
        let yaml = serde_yaml::to_string(&consolidation.config)
            .map_err(|e| Error::Serialize(e.to_string()))?;
        fs::write(&config_path, yaml).map_err(|e| Error::io(&config_path, e))?;

        let seed_paths = write_seed_files(&consolidation.seed_files, &self.seed_dir())?;
        info!(
            "prepared {} and {} seed files",
            config_path.display(),
            seed_paths.len()
        );

        self.prepared = true;
        Ok(config_path)
    }

    fn require_prepared(&self, operation: &str) -> Result<&Consolidation> {
        match (&self.consolidation, self.prepared) {
            (Some(consolidation), true) => Ok(consolidation),
            _ => Err(PreconditionError::new(operation).into()),
        }
    }

    /// Check pools and gateways in the consolidated system config
    pub fn validate(&self) -> Result<()> {
        let consolidation = self.require_prepared("validate")?;
        let system_config = consolidation
            .config
            .application
            .seed_files
            .system_config
            .as_ref()
            .ok_or_else(|| ConfigurationError::MissingField("seed_files.system_config".to_string()))?;
        validate_system_config(system_config)?;
        info!("system configuration validated");
        Ok(())
    }

    /// Manifests for the current consolidation
    pub fn manifests(&self) -> Vec<Manifest> {
        let topology = self
            .consolidation
            .as_ref()
            .map(|c| &c.topology)
            .unwrap_or(&self.cluster.topology);
        node_manifests(&self.app.deploy, topology, &self.scripts_dir, &self.config_path())
    }

    /// An ssh executor reaching the hosts of the current topology snapshot
    pub fn ssh_executor(&self) -> SshExecutor {
        let topology = self
            .consolidation
            .as_ref()
            .map(|c| &c.topology)
            .unwrap_or(&self.cluster.topology);
        SshExecutor::new(topology, &self.app.deploy)
    }

    /// Ship the prepared configuration and run the deploy scripts: the node
    /// manifest first, then the blade manifest. The first failure aborts.
    pub async fn deploy(&self, executor: &dyn RemoteExecutor) -> Result<()> {
        self.require_prepared("deploy")?;

        let manifests = self.manifests();
        check_sources(&manifests)?;

        for manifest in manifests {
            let connection = executor.connect(manifest.kind, &manifest.class_names).await?;
            for file in &manifest.files {
                info!(
                    "copying '{}' to {}s of classes {:?} at '{}'",
                    file.source.display(),
                    manifest.kind,
                    manifest.class_names,
                    file.destination
                );
                connection
                    .copy_to(&file.source, &file.destination, &file.copy_logname(manifest.kind))
                    .await?;
                connection
                    .run_command(&file.restrict_command(), &file.restrict_logname(manifest.kind))
                    .await?;
            }

            let command = manifest.deploy_command();
            info!(
                "running '{}' on {}s of classes {:?}",
                command, manifest.kind, manifest.class_names
            );
            connection
                .run_command(&command, &manifest.deploy_logname())
                .await?;
        }

        info!("application deployed");
        Ok(())
    }

    /// Nothing is installed that needs tearing down
    pub fn remove(&self) -> Result<()> {
        self.require_prepared("remove")?;
        info!("nothing to remove for the application layer");
        Ok(())
    }
}

/// Every file a manifest ships must exist locally before any target is
/// touched
fn check_sources(manifests: &[Manifest]) -> Result<()> {
    for file in manifests.iter().flat_map(|m| &m.files) {
        if !file.source.is_file() {
            return Err(
                ConfigurationError::MissingDeployFile(file.source.display().to_string()).into(),
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::application::BmcConfig;

    fn application(dir: &Path) -> Application {
        Application::new(ApplicationConfig::default(), ClusterDescription::default(), dir)
    }

    #[test]
    fn test_prepare_requires_consolidation() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = application(dir.path());
        let err = app.prepare().unwrap_err();
        assert!(matches!(err, Error::Precondition(ref p) if p.step == "consolidate"));
        assert!(!app.is_prepared());
    }

    #[test]
    fn test_operations_require_prepare() {
        let dir = tempfile::tempdir().unwrap();
        let app = application(dir.path());
        for (result, operation) in [(app.validate(), "validate"), (app.remove(), "remove")] {
            match result {
                Err(Error::Precondition(p)) => assert_eq!(p.operation, operation),
                other => panic!("expected precondition error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_failed_consolidation_leaves_unprepared() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = application(dir.path());
        let creds = BmcCredentials::resolve(&BmcConfig::default(), Some("seed"));
        assert!(app.consolidate(&creds).is_err());
        assert!(app.consolidation().is_none());
        assert!(!app.is_prepared());
    }

    #[test]
    fn test_check_sources_names_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("present.py");
        fs::write(&present, "").unwrap();
        let manifest = Manifest {
            kind: TargetKind::Node,
            class_names: vec!["pit_node".to_string()],
            files: vec![
                FileTransfer::new(&present, "/root/present.py", "present"),
                FileTransfer::new(dir.path().join("absent.py"), "/root/absent.py", "absent"),
            ],
            script: "/root/present.py".to_string(),
            python: "python3".to_string(),
        };
        let err = check_sources(std::slice::from_ref(&manifest)).unwrap_err();
        assert!(matches!(
            err,
            Error::Configuration(ConfigurationError::MissingDeployFile(ref p)) if p.ends_with("absent.py")
        ));

        let mut complete = manifest;
        complete.files.truncate(1);
        assert!(check_sources(&[complete]).is_ok());
    }

    #[test]
    fn test_paths() {
        let app = application(Path::new("/tmp/vshasta-build"));
        assert_eq!(
            app.config_path(),
            PathBuf::from("/tmp/vshasta-build/application_core_config.yaml")
        );
        assert_eq!(app.seed_dir(), PathBuf::from("/tmp/vshasta-build/seed"));
    }
}
