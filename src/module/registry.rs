//! Module discovery, dependency ordering, and activation.

use super::host::{HostSnapshot, ModuleSummary};
use super::{ModuleDescriptor, Pipeline, ServiceCollection};
use crate::authz::{AuthorizationEngine, PolicyBuilder};
use crate::catalog::navigation::NavigationBuilder;
use crate::catalog::CatalogBuilder;
use crate::config::AuthorizationConfig;
use crate::error::RegistryError;
use crate::telemetry::metrics::record_activation;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;

/// Every module announces itself here exactly once before sorting.
#[derive(Clone, Default)]
pub struct ModuleRegistry {
    candidates: Vec<Arc<dyn ModuleDescriptor>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<M>(mut self, module: M) -> Self
    where
        M: ModuleDescriptor + 'static,
    {
        self.candidates.push(Arc::new(module));
        self
    }

    pub fn register_arc(mut self, module: Arc<dyn ModuleDescriptor>) -> Self {
        self.candidates.push(module);
        self
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Candidate ids in registration order
    pub fn ids(&self) -> Vec<&str> {
        self.candidates.iter().map(|m| m.id()).collect()
    }

    pub fn discover(&self) -> Result<OrderedModules, RegistryError> {
        discover(self.candidates.clone())
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("candidates", &self.ids())
            .finish()
    }
}

/// Modules in activation order: every module follows all its dependencies.
#[derive(Clone, Default)]
pub struct OrderedModules {
    modules: Vec<Arc<dyn ModuleDescriptor>>,
}

impl OrderedModules {
    pub fn ids(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.id()).collect()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Arc<dyn ModuleDescriptor>> {
        self.modules.iter()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl std::fmt::Debug for OrderedModules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.ids()).finish()
    }
}

/// Validate candidates and sort them with Kahn's algorithm.
///
/// When several modules are ready at once they are taken in input order, so
/// identical input always yields the identical order.
pub fn discover(candidates: Vec<Arc<dyn ModuleDescriptor>>) -> Result<OrderedModules, RegistryError> {
    let mut id_to_idx: HashMap<String, usize> = HashMap::with_capacity(candidates.len());
    for (idx, module) in candidates.iter().enumerate() {
        if id_to_idx.insert(module.id().to_string(), idx).is_some() {
            return Err(RegistryError::DuplicateModule(module.id().to_string()));
        }
    }

    // If A depends on B, B -> A: B must activate first.
    let mut in_degree: Vec<usize> = vec![0; candidates.len()];
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); candidates.len()];

    for (idx, module) in candidates.iter().enumerate() {
        let mut seen = HashSet::new();
        for dependency in module.dependencies() {
            let Some(&dep_idx) = id_to_idx.get(&dependency) else {
                return Err(RegistryError::UnknownDependency {
                    module: module.id().to_string(),
                    dependency,
                });
            };
            if seen.insert(dep_idx) {
                dependents[dep_idx].push(idx);
                in_degree[idx] += 1;
            }
        }
    }

    let mut queue: VecDeque<usize> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, &deg)| deg == 0)
        .map(|(i, _)| i)
        .collect();

    let mut sorted: Vec<usize> = Vec::with_capacity(candidates.len());
    while let Some(idx) = queue.pop_front() {
        sorted.push(idx);
        for &dependent in &dependents[idx] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                queue.push_back(dependent);
            }
        }
    }

    if sorted.len() != candidates.len() {
        let members = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &deg)| deg > 0)
            .map(|(i, _)| candidates[i].id().to_string())
            .collect();
        return Err(RegistryError::CyclicDependency { members });
    }

    let mut slots: Vec<Option<Arc<dyn ModuleDescriptor>>> =
        candidates.into_iter().map(Some).collect();
    let modules = sorted
        .into_iter()
        .filter_map(|idx| slots[idx].take())
        .collect();

    Ok(OrderedModules { modules })
}

/// Settings that shape an activation pass.
#[derive(Debug, Clone)]
pub struct ActivationOptions {
    pub full_access_permission: String,
}

impl Default for ActivationOptions {
    fn default() -> Self {
        Self::from(&AuthorizationConfig::default())
    }
}

impl From<&AuthorizationConfig> for ActivationOptions {
    fn from(config: &AuthorizationConfig) -> Self {
        Self {
            full_access_permission: config.full_access_permission.clone(),
        }
    }
}

/// Result of a successful activation.
#[derive(Debug)]
pub struct Activation {
    pub snapshot: HostSnapshot,
    pub pipeline: Pipeline,
}

fn hook_error(module: &dyn ModuleDescriptor, hook: &'static str, source: anyhow::Error) -> RegistryError {
    tracing::error!(module = module.id(), hook, error = %source, "Module hook failed");
    RegistryError::ModuleHook {
        module: module.id().to_string(),
        hook,
        source,
    }
}

/// Run every module's hooks in order and freeze the results.
///
/// Per module: services, pipeline, authorization, permissions, navigation.
/// Cross-module references are validated once all modules contributed, then
/// `on_started` runs in order. Nothing is returned unless every step passed.
pub fn activate(
    ordered: &OrderedModules,
    options: &ActivationOptions,
) -> Result<Activation, RegistryError> {
    let started = Instant::now();
    let mut services = ServiceCollection::new();
    let mut pipeline = Pipeline::new();
    let mut policies = PolicyBuilder::new();
    let mut catalog = CatalogBuilder::new();
    let mut navigation = NavigationBuilder::new();
    let mut summaries = Vec::with_capacity(ordered.len());

    for module in ordered.iter() {
        let module = module.as_ref();
        let id = module.id();

        module
            .register_services(&mut services)
            .map_err(|e| hook_error(module, "register_services", e))?;

        pipeline.begin_module(id);
        module
            .configure_pipeline(&mut pipeline)
            .map_err(|e| hook_error(module, "configure_pipeline", e))?;

        policies.begin_module(id);
        module
            .configure_authorization(&mut policies)
            .map_err(|e| hook_error(module, "configure_authorization", e))?;

        let permissions = module.permissions();
        let permission_count = permissions.len();
        for descriptor in permissions {
            catalog.add(id, descriptor)?;
        }

        let items = module.navigation_items();
        let item_count = items.len();
        for item in items {
            navigation.add(id, item)?;
        }

        tracing::info!(
            module = id,
            version = module.version(),
            permissions = permission_count,
            navigation_items = item_count,
            "Module activated"
        );

        summaries.push(ModuleSummary {
            id: id.to_string(),
            display_name: module.display_name().to_string(),
            version: module.version().to_string(),
            dependencies: module.dependencies(),
            permissions: permission_count,
            navigation_items: item_count,
        });
    }

    let catalog = catalog.finish();
    let navigation = navigation.finish(&catalog)?;
    let policies = policies.finish(&catalog, &options.full_access_permission)?;

    for module in ordered.iter() {
        module
            .on_started()
            .map_err(|e| hook_error(module.as_ref(), "on_started", e))?;
    }

    record_activation(ordered.len(), catalog.len(), started.elapsed().as_secs_f64());

    let snapshot = HostSnapshot {
        generation: 0,
        activated_at: chrono::Utc::now(),
        modules: summaries,
        ordered: ordered.clone(),
        engine: AuthorizationEngine::new(options.full_access_permission.clone(), policies),
        catalog,
        navigation,
        services: services.freeze(),
        pipeline_stages: pipeline.stages().to_vec(),
    };

    Ok(Activation { snapshot, pipeline })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{NavigationItem, PermissionDescriptor, UiContext};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixture {
        id: &'static str,
        deps: Vec<&'static str>,
    }

    impl ModuleDescriptor for Fixture {
        fn id(&self) -> &str {
            self.id
        }

        fn display_name(&self) -> &str {
            self.id
        }

        fn dependencies(&self) -> Vec<String> {
            self.deps.iter().map(|d| d.to_string()).collect()
        }
    }

    fn module(id: &'static str, deps: &[&'static str]) -> Arc<dyn ModuleDescriptor> {
        Arc::new(Fixture {
            id,
            deps: deps.to_vec(),
        })
    }

    #[test]
    fn test_dependencies_come_first() {
        let ordered = discover(vec![
            module("sales", &["business"]),
            module("business", &["identity"]),
            module("identity", &[]),
        ])
        .unwrap();
        assert_eq!(ordered.ids(), vec!["identity", "business", "sales"]);
    }

    #[test]
    fn test_ready_modules_keep_input_order() {
        let ordered = discover(vec![
            module("c", &[]),
            module("a", &[]),
            module("b", &["c"]),
        ])
        .unwrap();
        assert_eq!(ordered.ids(), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_repeated_dependency_is_counted_once() {
        let ordered = discover(vec![module("b", &["a", "a"]), module("a", &[])]).unwrap();
        assert_eq!(ordered.ids(), vec!["a", "b"]);
    }

    #[test]
    fn test_cycle_lists_only_cycle_members() {
        let err = discover(vec![
            module("root", &[]),
            module("a", &["b"]),
            module("b", &["a"]),
        ])
        .unwrap_err();
        match err {
            RegistryError::CyclicDependency { members } => assert_eq!(members, vec!["a", "b"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let err = discover(vec![module("a", &["a"])]).unwrap_err();
        assert!(matches!(err, RegistryError::CyclicDependency { .. }));
    }

    #[test]
    fn test_unknown_dependency() {
        let err = discover(vec![module("sales", &["billing"])]).unwrap_err();
        assert!(matches!(
            err,
            RegistryError::UnknownDependency { ref module, ref dependency }
                if module == "sales" && dependency == "billing"
        ));
    }

    #[test]
    fn test_duplicate_module() {
        let err = discover(vec![module("a", &[]), module("a", &[])]).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateModule(ref id) if id == "a"));
    }

    struct Contributing {
        started: Arc<AtomicUsize>,
        fail_services: bool,
    }

    impl ModuleDescriptor for Contributing {
        fn id(&self) -> &str {
            "sales"
        }

        fn display_name(&self) -> &str {
            "Sales"
        }

        fn register_services(&self, services: &mut ServiceCollection) -> anyhow::Result<()> {
            if self.fail_services {
                anyhow::bail!("store unavailable");
            }
            services.add(7_u8)?;
            Ok(())
        }

        fn permissions(&self) -> Vec<PermissionDescriptor> {
            vec![PermissionDescriptor::new("sales:invoices:read", "Read invoices", "sales")]
        }

        fn navigation_items(&self) -> Vec<NavigationItem> {
            vec![NavigationItem::link(
                "sales.invoices",
                "Invoices",
                "/sales/invoices",
                UiContext::Operation,
            )
            .requires("sales:invoices:read")]
        }

        fn on_started(&self) -> anyhow::Result<()> {
            self.started.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_activation_collects_contributions() {
        let started = Arc::new(AtomicUsize::new(0));
        let module: Arc<dyn ModuleDescriptor> = Arc::new(Contributing {
            started: started.clone(),
            fail_services: false,
        });
        let ordered = discover(vec![module]).unwrap();

        let activation = activate(&ordered, &ActivationOptions::default()).unwrap();
        let snapshot = activation.snapshot;

        assert!(snapshot.catalog.contains("sales:invoices:read"));
        assert_eq!(snapshot.navigation.len(), 1);
        assert_eq!(*snapshot.services.get::<u8>().unwrap(), 7);
        assert_eq!(snapshot.modules[0].permissions, 1);
        assert_eq!(started.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_hook_failure_is_fatal_and_nothing_starts() {
        let started = Arc::new(AtomicUsize::new(0));
        let module: Arc<dyn ModuleDescriptor> = Arc::new(Contributing {
            started: started.clone(),
            fail_services: true,
        });
        let ordered = discover(vec![module]).unwrap();

        let err = match activate(&ordered, &ActivationOptions::default()) {
            Ok(_) => panic!("activation should fail"),
            Err(err) => err,
        };
        assert!(matches!(
            err,
            RegistryError::ModuleHook { hook: "register_services", .. }
        ));
        assert_eq!(started.load(Ordering::SeqCst), 0);
    }

    type HookLog = Arc<std::sync::Mutex<Vec<String>>>;

    /// Records every hook call as `module:hook`.
    struct Recorder {
        id: &'static str,
        deps: &'static [&'static str],
        log: HookLog,
        fail_services: bool,
    }

    impl Recorder {
        fn record(&self, hook: &str) {
            self.log.lock().unwrap().push(format!("{}:{}", self.id, hook));
        }
    }

    impl ModuleDescriptor for Recorder {
        fn id(&self) -> &str {
            self.id
        }

        fn display_name(&self) -> &str {
            self.id
        }

        fn dependencies(&self) -> Vec<String> {
            self.deps.iter().map(|d| d.to_string()).collect()
        }

        fn register_services(&self, _services: &mut ServiceCollection) -> anyhow::Result<()> {
            self.record("register_services");
            if self.fail_services {
                anyhow::bail!("{} refused to register", self.id);
            }
            Ok(())
        }

        fn configure_pipeline(&self, _pipeline: &mut Pipeline) -> anyhow::Result<()> {
            self.record("configure_pipeline");
            Ok(())
        }

        fn configure_authorization(&self, _policies: &mut PolicyBuilder) -> anyhow::Result<()> {
            self.record("configure_authorization");
            Ok(())
        }

        fn permissions(&self) -> Vec<PermissionDescriptor> {
            self.record("permissions");
            Vec::new()
        }

        fn navigation_items(&self) -> Vec<NavigationItem> {
            self.record("navigation_items");
            Vec::new()
        }

        fn on_started(&self) -> anyhow::Result<()> {
            self.record("on_started");
            Ok(())
        }
    }

    fn recorded_chain(log: &HookLog, failing: Option<&'static str>) -> OrderedModules {
        let recorder = |id: &'static str, deps: &'static [&'static str]| -> Arc<dyn ModuleDescriptor> {
            Arc::new(Recorder {
                id,
                deps,
                log: log.clone(),
                fail_services: failing == Some(id),
            })
        };
        discover(vec![
            recorder("sales", &["business"]),
            recorder("business", &["identity"]),
            recorder("identity", &[]),
        ])
        .unwrap()
    }

    fn hooks_of(id: &str) -> Vec<String> {
        [
            "register_services",
            "configure_pipeline",
            "configure_authorization",
            "permissions",
            "navigation_items",
        ]
        .iter()
        .map(|hook| format!("{}:{}", id, hook))
        .collect()
    }

    #[test]
    fn test_hooks_run_module_by_module_in_sorted_order() {
        let log: HookLog = Arc::default();
        let ordered = recorded_chain(&log, None);

        activate(&ordered, &ActivationOptions::default()).unwrap();

        let mut expected = Vec::new();
        for id in ["identity", "business", "sales"] {
            expected.extend(hooks_of(id));
        }
        for id in ["identity", "business", "sales"] {
            expected.push(format!("{}:on_started", id));
        }
        assert_eq!(*log.lock().unwrap(), expected);
    }

    #[test]
    fn test_hook_failure_stops_later_modules() {
        let log: HookLog = Arc::default();
        let ordered = recorded_chain(&log, Some("business"));

        let err = match activate(&ordered, &ActivationOptions::default()) {
            Ok(_) => panic!("activation should fail"),
            Err(err) => err,
        };
        assert!(matches!(
            err,
            RegistryError::ModuleHook { ref module, hook: "register_services", .. } if module == "business"
        ));

        let mut expected = hooks_of("identity");
        expected.push("business:register_services".to_string());
        assert_eq!(*log.lock().unwrap(), expected);
    }
}
