// src/reconcile.rs

//! Reconciliation pipeline
//!
//! One run brings a workspace in line with a requirement set:
//!
//! ```text
//! lock -> probe -> effective requirements -> resolve -> diff -> plan
//!      -> prefetch gate -> apply (rollback on failure) -> commit
//! ```
//!
//! Every collaborator is passed in explicitly; [`reconcile_workspace`]
//! wires up the file-backed defaults.

use crate::cache::{ArtifactStorage, ArtifactStore, CacheGate, MirrorRemote, Remote};
use crate::error::{Error, Result};
use crate::filesystem::{Materializer, TreeMaterializer};
use crate::index::{AvailabilitySource, IndexFile};
use crate::query::{dependency_graph, diff, effective_requirements, Diff};
use crate::requirements::RequirementSet;
use crate::resolver::Resolver;
use crate::state::{Assignment, InstalledProbe, InstalledState, ManifestProbe};
use crate::transaction::{ApplyReport, Plan, Transaction, WorkspaceLock};
use crate::workspace::Workspace;
use std::fmt;
use tracing::{debug, info};

/// Options for a single run
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Compute the plan but do not prefetch or mutate anything
    pub dry_run: bool,
}

/// What a run did
#[derive(Debug)]
pub enum Outcome {
    /// The workspace already matches the requirements
    NothingToDo,
    /// Dry run: this is what would happen
    Planned(Plan),
    /// The plan was applied and committed
    Applied(ApplyReport),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::NothingToDo => write!(f, "Workspace is up to date"),
            Outcome::Planned(plan) => write!(f, "Would apply:\n{}", plan),
            Outcome::Applied(report) => write!(f, "{}", report),
        }
    }
}

/// Resolved state of a workspace, before anything is planned
#[derive(Debug, Clone)]
pub struct Resolution {
    pub installed: InstalledState,
    pub want: Assignment,
    pub diff: Diff,
}

/// The pipeline with all of its collaborators
pub struct Reconciler<'a> {
    ws: &'a Workspace,
    source: &'a dyn AvailabilitySource,
    probe: &'a dyn InstalledProbe,
    remote: &'a dyn Remote,
    storage: &'a dyn ArtifactStorage,
    materializer: &'a mut dyn Materializer,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        ws: &'a Workspace,
        source: &'a dyn AvailabilitySource,
        probe: &'a dyn InstalledProbe,
        remote: &'a dyn Remote,
        storage: &'a dyn ArtifactStorage,
        materializer: &'a mut dyn Materializer,
    ) -> Self {
        Self {
            ws,
            source,
            probe,
            remote,
            storage,
            materializer,
        }
    }

    /// Lock the workspace and bring it in line with `reqs`
    pub fn run(&mut self, reqs: &RequirementSet, options: RunOptions) -> Result<Outcome> {
        let _lock = WorkspaceLock::acquire(self.ws)?;

        let resolution = self.resolve(reqs)?;
        if resolution.diff.is_empty() {
            info!("Nothing to do");
            return Ok(Outcome::NothingToDo);
        }

        let plan = Plan::from_diff(&resolution.diff, self.source)?;
        if options.dry_run {
            return Ok(Outcome::Planned(plan));
        }

        let gate = CacheGate::new(self.remote, self.storage);
        let mut txn = Transaction::begin(plan);
        info!("Transaction {} applying {} actions", txn.id(), txn.plan().len());
        txn.prefetch(&gate, self.source)?;
        let report = txn.apply(self.ws, &mut *self.materializer)?;
        Ok(Outcome::Applied(report))
    }

    /// Probe, resolve and diff without taking the lock or planning
    pub fn resolve(&self, reqs: &RequirementSet) -> Result<Resolution> {
        let settings = self.ws.settings();
        let avail = self.source.available()?;

        if let Some(pin) = &settings.platform
            && avail.get(&pin.name, &pin.version).is_none()
        {
            return Err(Error::Config(format!(
                "platform {} {} is not in the index",
                pin.name, pin.version
            )));
        }
        if let Some(unknown) = reqs.keys().find(|p| !avail.contains_package(p)) {
            return Err(Error::UnknownPackage(unknown.clone()));
        }

        let installed = self.probe.probe(&avail, settings.platform.as_ref())?;
        debug!(
            "Installed: {} fixed, {} free, {} provided",
            installed.fixed.len(),
            installed.free.len(),
            installed.provided.len()
        );

        let pinned = installed.pinned();
        let effective = effective_requirements(reqs, &pinned)?;
        let deps = dependency_graph(&avail, &pinned);

        let have = installed.have();
        let mut want = Resolver::new(&deps)
            .with_max_steps(settings.max_resolver_steps)
            .prefer(&have)
            .resolve(&effective)?;
        // provided packages are never materialized
        want.retain(|package, _| !installed.provided.contains_key(package));

        if let Some(package) = want.keys().find(|p| installed.unrecognized.contains(*p)) {
            return Err(Error::Config(format!(
                "{} is materialized from an artifact the index does not list; \
                 remove {} or restore its recorded contents",
                package,
                self.ws.package_dir(package).display()
            )));
        }

        let diff = diff(&have, &want);
        Ok(Resolution { installed, want, diff })
    }
}

/// Run the pipeline with the file-backed collaborators of `ws`
pub fn reconcile_workspace(ws: &Workspace, reqs: &RequirementSet, options: RunOptions) -> Result<Outcome> {
    let index = IndexFile::load(ws.index_path())?;
    let store = ArtifactStore::new(ws.objects_dir())?;
    let remote = MirrorRemote::new(ws.mirror_path(), ws.manifest_path(), store.clone());
    let probe = ManifestProbe::new(ws, &remote);
    let mut materializer = TreeMaterializer::new(store.clone());

    Reconciler::new(ws, &index, &probe, &remote, &store, &mut materializer).run(reqs, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::Hash;
    use crate::index::{ArtifactDescriptor, AvailabilityIndex};
    use crate::version::{Version, VersionSet};
    use crate::workspace::{PlatformPin, Settings};
    use std::collections::{BTreeMap, BTreeSet};
    use std::io;
    use tempfile::TempDir;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn h(seed: u8) -> Hash {
        Hash::parse(&format!("{:02x}", seed).repeat(20)).unwrap()
    }

    /// Probe reporting a fixed partition
    struct StaticProbe(InstalledState);

    impl InstalledProbe for StaticProbe {
        fn installed(&self, _avail: &AvailabilityIndex) -> Result<Assignment> {
            Ok(self.0.have())
        }

        fn fixed(&self, _avail: &AvailabilityIndex, _installed: &Assignment) -> Result<Assignment> {
            Ok(self.0.fixed.clone())
        }

        fn unrecognized(&self, _avail: &AvailabilityIndex) -> Result<BTreeSet<String>> {
            Ok(self.0.unrecognized.clone())
        }
    }

    struct Local;

    impl ArtifactStorage for Local {
        fn contains(&self, _hash: &Hash) -> bool {
            true
        }
    }

    impl Remote for Local {
        fn fetch(&self, _source: &str, _hash: &Hash) -> Result<()> {
            Ok(())
        }
        fn head_hash(&self, _wc: &crate::cache::WorkingCopy) -> Result<Hash> {
            unreachable!()
        }
        fn is_dirty(&self, _wc: &crate::cache::WorkingCopy) -> Result<bool> {
            Ok(false)
        }
        fn is_detached(&self, _wc: &crate::cache::WorkingCopy) -> Result<bool> {
            Ok(false)
        }
    }

    #[derive(Default)]
    struct Recorder {
        tree: BTreeMap<String, Hash>,
    }

    impl Materializer for Recorder {
        fn materialize(&mut self, _ws: &Workspace, package: &str, hash: &Hash) -> io::Result<()> {
            self.tree.insert(package.to_string(), hash.clone());
            Ok(())
        }
        fn rematerialize(&mut self, _ws: &Workspace, package: &str, hash: &Hash) -> io::Result<()> {
            self.tree.insert(package.to_string(), hash.clone());
            Ok(())
        }
        fn dematerialize(&mut self, _ws: &Workspace, package: &str) -> io::Result<()> {
            self.tree.remove(package);
            Ok(())
        }
    }

    fn reqs(pairs: &[(&str, &str)]) -> RequirementSet {
        pairs
            .iter()
            .map(|(p, s)| (p.to_string(), VersionSet::parse(s).unwrap()))
            .collect()
    }

    #[test]
    fn test_fresh_install() {
        let temp = TempDir::new().unwrap();
        let ws = Workspace::new(temp.path(), Settings::default());
        let mut avail = AvailabilityIndex::new();
        avail.insert("a", v("1.0.0"), ArtifactDescriptor::new(h(1)));

        let probe = StaticProbe(InstalledState::new());
        let mut m = Recorder::default();
        let mut r = Reconciler::new(&ws, &avail, &probe, &Local, &Local, &mut m);

        let outcome = r.run(&reqs(&[("a", ">=1.0.0")]), RunOptions::default()).unwrap();
        let Outcome::Applied(report) = outcome else {
            panic!("expected an applied outcome");
        };
        assert_eq!(report.applied, vec!["install a 1.0.0"]);
        assert_eq!(m.tree.get("a"), Some(&h(1)));
    }

    #[test]
    fn test_up_to_date_and_dry_run() {
        let temp = TempDir::new().unwrap();
        let ws = Workspace::new(temp.path(), Settings::default());
        let mut avail = AvailabilityIndex::new();
        avail.insert("a", v("1.0.0"), ArtifactDescriptor::new(h(1)));
        avail.insert("a", v("1.1.0"), ArtifactDescriptor::new(h(2)));

        let mut state = InstalledState::new();
        state.free.insert("a".into(), v("1.0.0"));
        let probe = StaticProbe(state);
        let mut m = Recorder::default();
        let mut r = Reconciler::new(&ws, &avail, &probe, &Local, &Local, &mut m);

        // the installed version is kept while it satisfies the requirement
        assert!(matches!(
            r.run(&reqs(&[("a", "^1")]), RunOptions::default()).unwrap(),
            Outcome::NothingToDo
        ));

        let outcome = r.run(&reqs(&[("a", ">=1.1")]), RunOptions { dry_run: true }).unwrap();
        let Outcome::Planned(plan) = outcome else {
            panic!("expected a plan");
        };
        assert_eq!(plan.to_string(), "update a 1.0.0 -> 1.1.0");
        assert!(m.tree.is_empty());
    }

    #[test]
    fn test_unknown_requirement() {
        let temp = TempDir::new().unwrap();
        let ws = Workspace::new(temp.path(), Settings::default());
        let avail = AvailabilityIndex::new();
        let probe = StaticProbe(InstalledState::new());
        let mut m = Recorder::default();
        let mut r = Reconciler::new(&ws, &avail, &probe, &Local, &Local, &mut m);

        assert!(matches!(
            r.run(&reqs(&[("ghost", "*")]), RunOptions::default()),
            Err(Error::UnknownPackage(p)) if p == "ghost"
        ));
    }

    #[test]
    fn test_fixed_packages_never_move() {
        let temp = TempDir::new().unwrap();
        let ws = Workspace::new(temp.path(), Settings::default());
        let mut avail = AvailabilityIndex::new();
        avail.insert("lib", v("1.0.0"), ArtifactDescriptor::new(h(1)));
        avail.insert("lib", v("2.0.0"), ArtifactDescriptor::new(h(2)));
        avail.insert(
            "app",
            v("1.0.0"),
            ArtifactDescriptor::new(h(3)).with_dependency("lib", VersionSet::parse("^1").unwrap()),
        );
        avail.insert(
            "app",
            v("2.0.0"),
            ArtifactDescriptor::new(h(4)).with_dependency("lib", VersionSet::parse("^2").unwrap()),
        );

        let mut state = InstalledState::new();
        state.fixed.insert("lib".into(), v("1.0.0"));
        let probe = StaticProbe(state);
        let mut m = Recorder::default();
        let r = Reconciler::new(&ws, &avail, &probe, &Local, &Local, &mut m);

        // lib is not required any more but stays, and app must fit around it
        let resolution = r.resolve(&reqs(&[("app", "*")])).unwrap();
        assert_eq!(resolution.want["lib"], v("1.0.0"));
        assert_eq!(resolution.want["app"], v("1.0.0"));
        assert!(resolution.diff.to_remove.is_empty());

        assert!(matches!(
            r.resolve(&reqs(&[("lib", "^2")])),
            Err(Error::ConflictingFixedRequirement { .. })
        ));
    }

    #[test]
    fn test_platform_is_respected_but_not_materialized() {
        let temp = TempDir::new().unwrap();
        let settings = Settings {
            platform: Some(PlatformPin {
                name: "runtime".into(),
                version: v("8.0.0"),
            }),
            ..Settings::default()
        };
        let ws = Workspace::new(temp.path(), settings);

        let mut avail = AvailabilityIndex::new();
        avail.insert("runtime", v("7.0.0"), ArtifactDescriptor::new(h(1)));
        avail.insert("runtime", v("8.0.0"), ArtifactDescriptor::new(h(2)));
        avail.insert(
            "ext",
            v("1.0.0"),
            ArtifactDescriptor::new(h(3)).with_dependency("runtime", VersionSet::parse("^7").unwrap()),
        );
        avail.insert(
            "ext",
            v("0.9.0"),
            ArtifactDescriptor::new(h(4)).with_dependency("runtime", VersionSet::parse(">=8").unwrap()),
        );

        let probe = StaticProbe(InstalledState::new());
        let mut m = Recorder::default();
        let r = Reconciler::new(&ws, &avail, &probe, &Local, &Local, &mut m);

        let resolution = r.resolve(&reqs(&[("ext", "*")])).unwrap();
        assert_eq!(resolution.want.keys().collect::<Vec<_>>(), vec!["ext"]);
        assert_eq!(resolution.want["ext"], v("0.9.0"));
    }

    fn runtime_index() -> AvailabilityIndex {
        let mut avail = AvailabilityIndex::new();
        avail.insert("runtime", v("7.0.0"), ArtifactDescriptor::new(h(1)));
        avail.insert("runtime", v("8.0.0"), ArtifactDescriptor::new(h(2)));
        avail.insert(
            "ext",
            v("1.0.0"),
            ArtifactDescriptor::new(h(3)).with_dependency("runtime", VersionSet::parse("^7").unwrap()),
        );
        avail.insert(
            "ext",
            v("0.9.0"),
            ArtifactDescriptor::new(h(4)).with_dependency("runtime", VersionSet::parse(">=8").unwrap()),
        );
        avail
    }

    #[test]
    fn test_materialized_platform_is_kept() {
        let temp = TempDir::new().unwrap();
        let settings = Settings {
            platform: Some(PlatformPin {
                name: "runtime".into(),
                version: v("8.0.0"),
            }),
            ..Settings::default()
        };
        let ws = Workspace::new(temp.path(), settings);
        let avail = runtime_index();

        let mut state = InstalledState::new();
        state.free.insert("runtime".into(), v("8.0.0"));
        let probe = StaticProbe(state);
        let mut m = Recorder::default();
        let mut r = Reconciler::new(&ws, &avail, &probe, &Local, &Local, &mut m);

        let resolution = r.resolve(&reqs(&[("ext", "*")])).unwrap();
        assert_eq!(resolution.installed.fixed.get("runtime"), Some(&v("8.0.0")));
        assert_eq!(resolution.want["ext"], v("0.9.0"));
        assert_eq!(resolution.diff.to_string(), "install ext 0.9.0");

        // nothing requires it, but the platform copy is never removed
        assert!(matches!(
            r.run(&reqs(&[]), RunOptions::default()).unwrap(),
            Outcome::NothingToDo
        ));
    }

    #[test]
    fn test_unrecognized_package_is_refused_when_wanted() {
        let temp = TempDir::new().unwrap();
        let ws = Workspace::new(temp.path(), Settings::default());
        let mut avail = AvailabilityIndex::new();
        avail.insert("a", v("1.0.0"), ArtifactDescriptor::new(h(1)));
        avail.insert("b", v("1.0.0"), ArtifactDescriptor::new(h(2)));
        avail.insert(
            "c",
            v("1.0.0"),
            ArtifactDescriptor::new(h(3)).with_dependency("b", VersionSet::parse("*").unwrap()),
        );

        let mut state = InstalledState::new();
        state.free.insert("a".into(), v("1.0.0"));
        state.unrecognized.insert("b".into());
        let probe = StaticProbe(state);
        let mut m = Recorder::default();
        let mut r = Reconciler::new(&ws, &avail, &probe, &Local, &Local, &mut m);

        assert!(matches!(r.resolve(&reqs(&[("b", "*")])), Err(Error::Config(_))));
        assert!(matches!(r.resolve(&reqs(&[("c", "*")])), Err(Error::Config(_))));

        // left alone while nothing wants it
        assert!(matches!(
            r.run(&reqs(&[("a", "*")]), RunOptions::default()).unwrap(),
            Outcome::NothingToDo
        ));
        assert!(m.tree.is_empty());
    }
}
