//! Plugin registry: lazy singletons with factory-based reload.
//!
//! Plugins are registered as named factories. [`PluginRegistry::load`]
//! instantiates lazily and returns the existing singleton on repeat calls;
//! [`PluginRegistry::reload`] re-runs the factory and swaps the singleton
//! in place, leaving the previous working instance untouched when the
//! factory fails. On every (re)load the plugin's listeners are registered
//! into the [`EventBus`](crate::bus::EventBus).
//!
//! True module hot-reload does not exist in a statically compiled bot;
//! re-instantiation preserves the observable contract: fresh state, fresh
//! handler bindings picked up by a subsequent router re-merge.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use crate::bus::EventBus;
use crate::error::{FrameworkError, FrameworkResult};
use wyrm_core::BoxedPlugin;

/// Constructs a fresh plugin instance.
///
/// Must produce a plugin whose [`name`](wyrm_core::Plugin::name) matches
/// the name it was registered under; anything else is a definition error.
pub type PluginFactory = Arc<dyn Fn() -> FrameworkResult<BoxedPlugin> + Send + Sync>;

struct PluginEntry {
    name: String,
    plugin: BoxedPlugin,
}

/// Owner of all live plugin instances.
pub struct PluginRegistry {
    bus: Arc<EventBus>,
    factories: RwLock<Vec<(String, PluginFactory)>>,
    plugins: RwLock<Vec<PluginEntry>>,
}

impl PluginRegistry {
    /// Creates a registry wired to the given bus.
    pub fn new(bus: Arc<EventBus>) -> Self {
        Self {
            bus,
            factories: RwLock::new(Vec::new()),
            plugins: RwLock::new(Vec::new()),
        }
    }

    /// Registers a plugin factory under a module name.
    ///
    /// Replaces any previous factory for the name; live instances are not
    /// affected until the next `reload`.
    pub fn register_factory<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> FrameworkResult<BoxedPlugin> + Send + Sync + 'static,
    {
        let name = name.into();
        let mut factories = self.factories.write();
        if let Some(slot) = factories.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = Arc::new(factory);
        } else {
            factories.push((name, Arc::new(factory)));
        }
    }

    /// Installs an already-constructed plugin (used for built-ins).
    ///
    /// Registers its listeners and stores the instance under `name`,
    /// replacing any previous instance with that name.
    pub fn install(&self, name: &str, plugin: BoxedPlugin) {
        self.bus.unregister_module(name);
        for listener in plugin.listeners() {
            self.bus.register(name, listener);
        }
        let mut plugins = self.plugins.write();
        if let Some(entry) = plugins.iter_mut().find(|e| e.name == name) {
            entry.plugin = plugin;
        } else {
            plugins.push(PluginEntry {
                name: name.to_string(),
                plugin,
            });
        }
    }

    /// Returns the shared instance of a plugin, constructing it first if
    /// no instance currently exists. Idempotent.
    pub fn load(&self, name: &str) -> FrameworkResult<BoxedPlugin> {
        if let Some(existing) = self.get(name) {
            return Ok(existing);
        }
        info!(module = %name, "Loading plugin");
        let plugin = self.instantiate(name)?;
        self.install(name, Arc::clone(&plugin));
        Ok(plugin)
    }

    /// Discards the current singleton and constructs a fresh one.
    ///
    /// The previous instance stays in place when the factory fails, so a
    /// broken reload never takes a working plugin down. The caller is
    /// responsible for re-merging protocol command tables afterwards.
    pub fn reload(&self, name: &str) -> FrameworkResult<BoxedPlugin> {
        let fresh = self.instantiate(name)?;
        info!(module = %name, "Reloading plugin");
        self.install(name, Arc::clone(&fresh));
        Ok(fresh)
    }

    /// The live instance for `name`, if loaded.
    pub fn get(&self, name: &str) -> Option<BoxedPlugin> {
        self.plugins
            .read()
            .iter()
            .find(|e| e.name == name)
            .map(|e| Arc::clone(&e.plugin))
    }

    /// True when a live instance exists for `name`.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.plugins.read().iter().any(|e| e.name == name)
    }

    /// Names of all loaded plugins, in load order.
    pub fn names(&self) -> Vec<String> {
        self.plugins.read().iter().map(|e| e.name.clone()).collect()
    }

    fn instantiate(&self, name: &str) -> FrameworkResult<BoxedPlugin> {
        let factory = {
            let factories = self.factories.read();
            factories
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, f)| Arc::clone(f))
        }
        .ok_or_else(|| {
            FrameworkError::module_load(name, "no such module is registered with the framework")
        })?;

        let plugin = factory()?;
        if plugin.name() != name {
            return Err(FrameworkError::definition(
                name,
                format!("factory produced a plugin named '{}'", plugin.name()),
            ));
        }
        Ok(plugin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wyrm_core::{Command, CommandResult, EventKind, Listener, Plugin};

    struct TickPlugin {
        name: String,
        commands: Vec<Command>,
        listeners: Vec<Listener>,
    }

    impl Plugin for TickPlugin {
        fn name(&self) -> &str {
            &self.name
        }

        fn commands(&self) -> Vec<Command> {
            self.commands.clone()
        }

        fn listeners(&self) -> Vec<Listener> {
            self.listeners.clone()
        }
    }

    fn registry() -> PluginRegistry {
        PluginRegistry::new(Arc::new(EventBus::new()))
    }

    fn plugin_with_counter(name: &str, calls: &Arc<AtomicUsize>) -> BoxedPlugin {
        let counter = Arc::clone(calls);
        let cmd = Command::named("tick").level(1).usage("!tick").handler(
            move |_ctx, _args| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    CommandResult::Ok(())
                }
            },
        );
        Arc::new(TickPlugin {
            name: name.to_string(),
            commands: vec![cmd],
            listeners: Vec::new(),
        })
    }

    #[test]
    fn load_is_idempotent() {
        let reg = registry();
        let built = Arc::new(AtomicUsize::new(0));
        let builds = Arc::clone(&built);
        reg.register_factory("clock", move || {
            builds.fetch_add(1, Ordering::SeqCst);
            Ok(plugin_with_counter("clock", &Arc::new(AtomicUsize::new(0))))
        });

        let first = reg.load("clock").unwrap();
        let second = reg.load("clock").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unregistered_module_is_a_load_error() {
        let reg = registry();
        let err = reg.load("ghost").unwrap_err();
        assert!(matches!(err, FrameworkError::ModuleLoad { .. }));
    }

    #[test]
    fn mismatched_plugin_name_is_a_definition_error() {
        let reg = registry();
        reg.register_factory("clock", || {
            Ok(plugin_with_counter("not-clock", &Arc::new(AtomicUsize::new(0))))
        });
        let err = reg.load("clock").unwrap_err();
        assert!(matches!(err, FrameworkError::Definition { .. }));
    }

    #[test]
    fn reload_swaps_the_singleton() {
        let reg = registry();
        reg.register_factory("clock", || {
            Ok(plugin_with_counter("clock", &Arc::new(AtomicUsize::new(0))))
        });
        let old = reg.load("clock").unwrap();
        let new = reg.reload("clock").unwrap();
        assert!(!Arc::ptr_eq(&old, &new));
        assert!(Arc::ptr_eq(&reg.get("clock").unwrap(), &new));
        // Load order is preserved across a reload.
        assert_eq!(reg.names(), vec!["clock".to_string()]);
    }

    #[test]
    fn failed_reload_keeps_the_previous_instance() {
        let reg = registry();
        let healthy = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(AtomicUsize::new(0));
        let gate_in_factory = Arc::clone(&gate);
        let counter = Arc::clone(&healthy);
        reg.register_factory("clock", move || {
            if gate_in_factory.load(Ordering::SeqCst) > 0 {
                return Err(FrameworkError::module_load("clock", "syntax error"));
            }
            Ok(plugin_with_counter("clock", &counter))
        });

        let old = reg.load("clock").unwrap();
        gate.store(1, Ordering::SeqCst);
        let err = reg.reload("clock").unwrap_err();
        assert!(matches!(err, FrameworkError::ModuleLoad { .. }));
        assert!(Arc::ptr_eq(&reg.get("clock").unwrap(), &old));
    }

    #[test]
    fn reload_reregisters_listeners() {
        let bus = Arc::new(EventBus::new());
        let reg = PluginRegistry::new(Arc::clone(&bus));
        reg.register_factory("ears", || {
            Ok(Arc::new(TickPlugin {
                name: "ears".to_string(),
                commands: Vec::new(),
                listeners: vec![Listener::new(EventKind::Hear, |_ctx, _msg| async {
                    Ok(())
                })],
            }) as BoxedPlugin)
        });

        reg.load("ears").unwrap();
        assert_eq!(bus.listener_count(EventKind::Hear), 1);
        reg.reload("ears").unwrap();
        assert_eq!(bus.listener_count(EventKind::Hear), 1);
    }
}
