//! Component options
//!
//! The declarative description a component instance is built from: data
//! factory, prop declarations, computed getters, methods, watch entries,
//! the render function, lifecycle hooks, provide/inject and the local
//! component registry. Options merge across a mixin chain with one
//! strategy per key: hook lists concatenate (mixin first), maps merge
//! child-wins, watch entries accumulate, data factories compose.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use vireo_core::{Record, RuntimeError, Value};

use crate::component::Component;
use crate::lifecycle::LifecycleHook;
use crate::render::RenderScope;

/// Produces a fresh data record per instance.
pub type DataFn = Rc<dyn Fn() -> Record>;

/// Render function: a typed closure over the render scope.
pub type RenderFn = Rc<dyn Fn(&RenderScope) -> Result<vireo_dom::VNode, RuntimeError>>;

/// Computed getter, evaluated with the instance as receiver.
pub type ComputedGetter = Rc<dyn Fn(&Component) -> Result<Value, RuntimeError>>;

/// Instance method callable through the render scope.
pub type MethodFn = Rc<dyn Fn(&Component, &[Value]) -> Value>;

/// Lifecycle hook body.
pub type HookFn = Rc<dyn Fn(&Component) -> Result<(), RuntimeError>>;

/// Watch handler: `(instance, new_value, old_value)`.
pub type WatchHandler = Rc<dyn Fn(&Component, &Value, &Value) -> Result<(), RuntimeError>>;

/// Provide factory: entries published to descendants.
pub type ProvideFn = Rc<dyn Fn(&Component) -> Vec<(Rc<str>, Value)>>;

/// A declared prop.
#[derive(Clone)]
pub struct PropSpec {
    pub name: Rc<str>,
    pub default: Option<Rc<dyn Fn() -> Value>>,
    pub required: bool,
}

/// A declared watcher.
#[derive(Clone)]
pub struct WatchSpec {
    pub path: Rc<str>,
    pub handler: WatchHandler,
    pub deep: bool,
    pub immediate: bool,
    pub sync: bool,
}

/// A declared injection.
#[derive(Clone)]
pub struct InjectSpec {
    pub name: Rc<str>,
    pub default: Option<Value>,
}

/// Everything a component is made of.
#[derive(Clone, Default)]
pub struct ComponentOptions {
    pub name: Option<Rc<str>>,
    pub data: Option<DataFn>,
    pub props: Vec<PropSpec>,
    pub computed: Vec<(Rc<str>, ComputedGetter)>,
    pub methods: Vec<(Rc<str>, MethodFn)>,
    pub watch: Vec<WatchSpec>,
    pub render: Option<RenderFn>,
    pub hooks: FxHashMap<LifecycleHook, Vec<HookFn>>,
    pub provide: Option<ProvideFn>,
    pub inject: Vec<InjectSpec>,
    pub components: Vec<(Rc<str>, Rc<ComponentOptions>)>,
    pub mixins: Vec<Rc<ComponentOptions>>,
}

impl ComponentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<Rc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn data(mut self, f: impl Fn() -> Record + 'static) -> Self {
        self.data = Some(Rc::new(f));
        self
    }

    pub fn prop(mut self, name: impl Into<Rc<str>>) -> Self {
        self.props.push(PropSpec {
            name: name.into(),
            default: None,
            required: false,
        });
        self
    }

    pub fn prop_with_default(
        mut self,
        name: impl Into<Rc<str>>,
        default: impl Fn() -> Value + 'static,
    ) -> Self {
        self.props.push(PropSpec {
            name: name.into(),
            default: Some(Rc::new(default)),
            required: false,
        });
        self
    }

    pub fn required_prop(mut self, name: impl Into<Rc<str>>) -> Self {
        self.props.push(PropSpec {
            name: name.into(),
            default: None,
            required: true,
        });
        self
    }

    pub fn computed(
        mut self,
        name: impl Into<Rc<str>>,
        getter: impl Fn(&Component) -> Result<Value, RuntimeError> + 'static,
    ) -> Self {
        self.computed.push((name.into(), Rc::new(getter)));
        self
    }

    pub fn method(
        mut self,
        name: impl Into<Rc<str>>,
        f: impl Fn(&Component, &[Value]) -> Value + 'static,
    ) -> Self {
        self.methods.push((name.into(), Rc::new(f)));
        self
    }

    pub fn watch(
        mut self,
        path: impl Into<Rc<str>>,
        handler: impl Fn(&Component, &Value, &Value) -> Result<(), RuntimeError> + 'static,
    ) -> Self {
        self.watch.push(WatchSpec {
            path: path.into(),
            handler: Rc::new(handler),
            deep: false,
            immediate: false,
            sync: false,
        });
        self
    }

    pub fn watch_spec(mut self, spec: WatchSpec) -> Self {
        self.watch.push(spec);
        self
    }

    pub fn render(
        mut self,
        f: impl Fn(&RenderScope) -> Result<vireo_dom::VNode, RuntimeError> + 'static,
    ) -> Self {
        self.render = Some(Rc::new(f));
        self
    }

    /// Register a fallible lifecycle hook.
    pub fn hook(
        mut self,
        at: LifecycleHook,
        f: impl Fn(&Component) -> Result<(), RuntimeError> + 'static,
    ) -> Self {
        self.hooks.entry(at).or_default().push(Rc::new(f));
        self
    }

    /// Register an infallible lifecycle hook.
    pub fn on_hook(self, at: LifecycleHook, f: impl Fn(&Component) + 'static) -> Self {
        self.hook(at, move |vm| {
            f(vm);
            Ok(())
        })
    }

    pub fn on_created(self, f: impl Fn(&Component) + 'static) -> Self {
        self.on_hook(LifecycleHook::Created, f)
    }

    pub fn on_mounted(self, f: impl Fn(&Component) + 'static) -> Self {
        self.on_hook(LifecycleHook::Mounted, f)
    }

    pub fn on_updated(self, f: impl Fn(&Component) + 'static) -> Self {
        self.on_hook(LifecycleHook::Updated, f)
    }

    pub fn on_destroyed(self, f: impl Fn(&Component) + 'static) -> Self {
        self.on_hook(LifecycleHook::Destroyed, f)
    }

    pub fn provide(mut self, f: impl Fn(&Component) -> Vec<(Rc<str>, Value)> + 'static) -> Self {
        self.provide = Some(Rc::new(f));
        self
    }

    pub fn inject(mut self, name: impl Into<Rc<str>>) -> Self {
        self.inject.push(InjectSpec {
            name: name.into(),
            default: None,
        });
        self
    }

    pub fn inject_with_default(
        mut self,
        name: impl Into<Rc<str>>,
        default: impl Into<Value>,
    ) -> Self {
        self.inject.push(InjectSpec {
            name: name.into(),
            default: Some(default.into()),
        });
        self
    }

    pub fn component(
        mut self,
        name: impl Into<Rc<str>>,
        options: Rc<ComponentOptions>,
    ) -> Self {
        self.components.push((name.into(), options));
        self
    }

    pub fn mixin(mut self, options: Rc<ComponentOptions>) -> Self {
        self.mixins.push(options);
        self
    }

    pub fn find_component(&self, name: &str) -> Option<Rc<ComponentOptions>> {
        self.components
            .iter()
            .find(|(n, _)| &**n == name)
            .map(|(_, o)| o.clone())
    }

    pub fn find_method(&self, name: &str) -> Option<MethodFn> {
        self.methods
            .iter()
            .find(|(n, _)| &**n == name)
            .map(|(_, m)| m.clone())
    }
}

/// Flatten a mixin chain into one options record. Mixins apply in
/// declaration order, the component's own options last.
pub fn resolve_options(options: &Rc<ComponentOptions>) -> Rc<ComponentOptions> {
    if options.mixins.is_empty() {
        return options.clone();
    }
    let mut merged = ComponentOptions::new();
    for mixin in &options.mixins {
        merged = merge_options(&merged, &resolve_options(mixin));
    }
    let mut own = (**options).clone();
    own.mixins = Vec::new();
    Rc::new(merge_options(&merged, &own))
}

/// Merge two option records: `child` wins wherever both define a value,
/// except hook lists and watch entries, which accumulate parent-first.
pub fn merge_options(parent: &ComponentOptions, child: &ComponentOptions) -> ComponentOptions {
    let mut merged = ComponentOptions::new();
    merged.name = child.name.clone().or_else(|| parent.name.clone());
    merged.render = child.render.clone().or_else(|| parent.render.clone());
    merged.provide = merge_provide(parent.provide.clone(), child.provide.clone());
    merged.data = merge_data(parent.data.clone(), child.data.clone());

    merged.props = merge_by_name(&parent.props, &child.props, |p| p.name.clone());
    merged.computed = merge_by_name(&parent.computed, &child.computed, |(n, _)| n.clone());
    merged.methods = merge_by_name(&parent.methods, &child.methods, |(n, _)| n.clone());
    merged.components = merge_by_name(&parent.components, &child.components, |(n, _)| n.clone());
    merged.inject = merge_by_name(&parent.inject, &child.inject, |i| i.name.clone());

    // Watch entries accumulate: every declared watcher runs.
    merged.watch = parent.watch.iter().chain(&child.watch).cloned().collect();

    for at in LifecycleHook::ALL {
        let parent_hooks = parent.hooks.get(&at).into_iter().flatten();
        let child_hooks = child.hooks.get(&at).into_iter().flatten();
        let combined: Vec<HookFn> = parent_hooks.chain(child_hooks).cloned().collect();
        if !combined.is_empty() {
            merged.hooks.insert(at, combined);
        }
    }
    merged
}

fn merge_by_name<T: Clone>(
    parent: &[T],
    child: &[T],
    name_of: impl Fn(&T) -> Rc<str>,
) -> Vec<T> {
    let mut merged: Vec<T> = Vec::with_capacity(parent.len() + child.len());
    for item in parent {
        let name = name_of(item);
        if !child.iter().any(|c| name_of(c) == name) {
            merged.push(item.clone());
        }
    }
    merged.extend(child.iter().cloned());
    merged
}

fn merge_data(parent: Option<DataFn>, child: Option<DataFn>) -> Option<DataFn> {
    match (parent, child) {
        (None, child) => child,
        (parent, None) => parent,
        (Some(parent), Some(child)) => Some(Rc::new(move || {
            // Child keys overwrite parent keys.
            let merged = parent();
            let overlay = child();
            for key in overlay.keys() {
                merged.insert_raw(key.clone(), overlay.peek(&key));
            }
            merged
        })),
    }
}

fn merge_provide(parent: Option<ProvideFn>, child: Option<ProvideFn>) -> Option<ProvideFn> {
    match (parent, child) {
        (None, child) => child,
        (parent, None) => parent,
        (Some(parent), Some(child)) => Some(Rc::new(move |vm| {
            let mut entries = parent(vm);
            entries.extend(child(vm));
            entries
        })),
    }
}
