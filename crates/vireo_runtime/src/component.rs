//! Component instances
//!
//! A `Component` owns its reactive state, its watchers (computed, user,
//! and the render watcher) and its place in the instance tree. Parent
//! links are weak; parents own their children, and a child's placeholder
//! vnode in the parent tree keeps the instance reachable from the host
//! side as well.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;

use vireo_core::config::dev_warn;
use vireo_core::{
    define_reactive, handle_error, has_active_watcher, observe, parse_path, without_observation,
    Record, RuntimeError, Value, Watcher, WatcherOptions,
};
use vireo_dom::{NodeId, PatchTarget, Patcher, SharedDom, VNode};

use crate::events::{BusHandler, EventBus};
use crate::lifecycle::LifecycleHook;
use crate::options::{resolve_options, ComponentOptions};
use crate::render::RenderScope;

thread_local! {
    static NEXT_INSTANCE_ID: Cell<u64> = const { Cell::new(1) };
}

/// What a template ref resolved to.
#[derive(Clone)]
pub enum RefTarget {
    Node(NodeId),
    Component(Component),
}

pub(crate) struct ComponentInner {
    id: u64,
    options: Rc<ComponentOptions>,
    dom: SharedDom,
    patcher: Rc<Patcher>,

    parent: RefCell<Weak<ComponentInner>>,
    children: RefCell<Vec<Component>>,

    data: RefCell<Option<Record>>,
    props: Record,
    computed: RefCell<FxHashMap<Rc<str>, Rc<Watcher>>>,
    watchers: RefCell<Vec<Rc<Watcher>>>,
    render_watcher: RefCell<Option<Rc<Watcher>>>,
    injected: RefCell<FxHashMap<Rc<str>, Value>>,
    provided: RefCell<FxHashMap<Rc<str>, Value>>,
    bus: RefCell<EventBus>,
    refs: RefCell<FxHashMap<Rc<str>, RefTarget>>,

    /// Default-slot content passed down by the parent's render.
    slot_children: RefCell<Vec<VNode>>,
    /// Listeners the parent bound on the placeholder, so an update can
    /// replace exactly these and leave `$on` subscribers alone.
    placeholder_listeners: RefCell<Vec<(Rc<str>, BusHandler)>>,

    /// The currently mounted tree.
    tree: RefCell<Option<VNode>>,
    el: Cell<Option<NodeId>>,

    has_placeholder: Cell<bool>,
    is_mounted: Cell<bool>,
    is_destroyed: Cell<bool>,
    is_being_destroyed: Cell<bool>,
    inactive: Cell<bool>,
}

/// Cheap cloneable handle to a component instance.
#[derive(Clone)]
pub struct Component {
    inner: Rc<ComponentInner>,
}

/// Non-owning component handle.
#[derive(Clone)]
pub struct WeakComponent(Weak<ComponentInner>);

impl WeakComponent {
    pub fn upgrade(&self) -> Option<Component> {
        self.0.upgrade().map(|inner| Component { inner })
    }
}

/// Options for [`Component::watch`].
#[derive(Clone, Copy, Default)]
pub struct WatchOptions {
    pub deep: bool,
    pub immediate: bool,
    pub sync: bool,
}

/// Handle returned by [`Component::watch`]; dropping it does not stop
/// the watcher, calling [`WatchHandle::unwatch`] does.
pub struct WatchHandle {
    vm: WeakComponent,
    watcher: Rc<Watcher>,
}

impl WatchHandle {
    pub fn unwatch(&self) {
        self.watcher.teardown();
        if let Some(vm) = self.vm.upgrade() {
            if !vm.inner.is_being_destroyed.get() {
                let id = self.watcher.id();
                vm.inner
                    .watchers
                    .borrow_mut()
                    .retain(|w| w.id() != id);
            }
        }
    }
}

impl Component {
    // ---------------------------------------------------------------------
    // Construction
    // ---------------------------------------------------------------------

    /// Create a root instance. Mounting is a separate step.
    pub fn new_root(
        options: Rc<ComponentOptions>,
        dom: SharedDom,
        patcher: Rc<Patcher>,
    ) -> Component {
        Self::new_internal(options, None, Vec::new(), Vec::new(), Vec::new(), dom, patcher, false)
    }

    /// Create a child instance behind a placeholder vnode.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new_child(
        options: Rc<ComponentOptions>,
        parent: &Component,
        props_data: Vec<(Rc<str>, Value)>,
        listeners: Vec<(Rc<str>, BusHandler)>,
        slot_children: Vec<VNode>,
    ) -> Component {
        Self::new_internal(
            options,
            Some(parent),
            props_data,
            listeners,
            slot_children,
            parent.inner.dom.clone(),
            parent.inner.patcher.clone(),
            true,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn new_internal(
        options: Rc<ComponentOptions>,
        parent: Option<&Component>,
        props_data: Vec<(Rc<str>, Value)>,
        listeners: Vec<(Rc<str>, BusHandler)>,
        slot_children: Vec<VNode>,
        dom: SharedDom,
        patcher: Rc<Patcher>,
        has_placeholder: bool,
    ) -> Component {
        let id = NEXT_INSTANCE_ID.with(|n| {
            let id = n.get();
            n.set(id + 1);
            id
        });
        let options = resolve_options(&options);
        let vm = Component {
            inner: Rc::new(ComponentInner {
                id,
                options,
                dom,
                patcher,
                parent: RefCell::new(Weak::new()),
                children: RefCell::new(Vec::new()),
                data: RefCell::new(None),
                props: Record::new(),
                computed: RefCell::new(FxHashMap::default()),
                watchers: RefCell::new(Vec::new()),
                render_watcher: RefCell::new(None),
                injected: RefCell::new(FxHashMap::default()),
                provided: RefCell::new(FxHashMap::default()),
                bus: RefCell::new(EventBus::new()),
                refs: RefCell::new(FxHashMap::default()),
                slot_children: RefCell::new(slot_children),
                placeholder_listeners: RefCell::new(Vec::new()),
                tree: RefCell::new(None),
                el: Cell::new(None),
                has_placeholder: Cell::new(has_placeholder),
                is_mounted: Cell::new(false),
                is_destroyed: Cell::new(false),
                is_being_destroyed: Cell::new(false),
                inactive: Cell::new(false),
            }),
        };

        if let Some(parent) = parent {
            *vm.inner.parent.borrow_mut() = Rc::downgrade(&parent.inner);
            parent.inner.children.borrow_mut().push(vm.clone());
        }

        vm.replace_placeholder_listeners(listeners);
        vm.call_hook(LifecycleHook::BeforeCreate);
        vm.init_injections();
        vm.init_props(props_data);
        vm.init_data();
        vm.init_computed();
        vm.init_watchers();
        vm.init_provide();
        vm.call_hook(LifecycleHook::Created);
        vm
    }

    /// Bare instance for option-merge tests.
    #[cfg(test)]
    pub(crate) fn detached_for_tests() -> Component {
        use vireo_dom::{shared_dom, MemoryDom};
        Component::new_root(
            Rc::new(ComponentOptions::new()),
            shared_dom(MemoryDom::new()),
            Rc::new(Patcher::with_platform_modules()),
        )
    }

    // ---------------------------------------------------------------------
    // State initialization
    // ---------------------------------------------------------------------

    fn init_injections(&self) {
        let specs = self.inner.options.inject.clone();
        for spec in &specs {
            let mut resolved = None;
            let mut cursor = self.parent();
            while let Some(vm) = cursor {
                if let Some(value) = vm.inner.provided.borrow().get(&spec.name) {
                    resolved = Some(value.clone());
                    break;
                }
                cursor = vm.parent();
            }
            let value = match (resolved, &spec.default) {
                (Some(value), _) => value,
                (None, Some(default)) => default.clone(),
                (None, None) => {
                    dev_warn(&format!(
                        "injection `{}` not found and has no default",
                        spec.name
                    ));
                    Value::Null
                }
            };
            self.inner.injected.borrow_mut().insert(spec.name.clone(), value);
        }
    }

    fn init_props(&self, mut props_data: Vec<(Rc<str>, Value)>) {
        // The parent already observes these values; binding must not
        // re-observe or deepen them.
        without_observation(|| {
            for spec in &self.inner.options.props {
                let given = props_data
                    .iter()
                    .position(|(name, _)| *name == spec.name)
                    .map(|i| props_data.remove(i).1);
                let value = match (given, &spec.default) {
                    (Some(value), _) => value,
                    (None, Some(default)) => default(),
                    (None, None) => {
                        if spec.required {
                            dev_warn(&format!("missing required prop `{}`", spec.name));
                        }
                        Value::Null
                    }
                };
                define_reactive(&self.inner.props, &spec.name, value);
            }
        });
        for (name, _) in props_data {
            dev_warn(&format!("unknown prop `{name}` passed to component"));
        }
    }

    fn init_data(&self) {
        let record = match &self.inner.options.data {
            Some(data_fn) => data_fn(),
            None => Record::new(),
        };
        for key in record.keys() {
            if self.inner.props.contains_key(&key) {
                dev_warn(&format!("data key `{key}` shadows a declared prop"));
            }
            if self.inner.options.find_method(&key).is_some() {
                dev_warn(&format!("data key `{key}` shadows a method"));
            }
        }
        if let Some(ob) = observe(&Value::Record(record.clone())) {
            ob.retain_as_root();
        }
        *self.inner.data.borrow_mut() = Some(record);
    }

    fn init_computed(&self) {
        let entries = self.inner.options.computed.clone();
        for (name, getter) in &entries {
            if self.data_record().map(|d| d.contains_key(name)).unwrap_or(false)
                || self.inner.props.contains_key(name)
            {
                dev_warn(&format!("computed `{name}` shadows data or a prop"));
            }
            let weak = self.downgrade();
            let getter = getter.clone();
            let watcher = Watcher::new(
                Box::new(move || match weak.upgrade() {
                    Some(vm) => getter(&vm),
                    None => Ok(Value::Null),
                }),
                None,
                WatcherOptions {
                    lazy: true,
                    ..Default::default()
                },
            );
            self.inner.computed.borrow_mut().insert(name.clone(), watcher);
        }
    }

    fn init_watchers(&self) {
        let specs = self.inner.options.watch.clone();
        for spec in &specs {
            let handler = spec.handler.clone();
            let path: Rc<str> = spec.path.clone();
            self.watch(
                &path,
                move |vm, new, old| handler(vm, new, old),
                WatchOptions {
                    deep: spec.deep,
                    immediate: spec.immediate,
                    sync: spec.sync,
                },
            );
        }
    }

    fn init_provide(&self) {
        if let Some(provide) = self.inner.options.provide.clone() {
            let entries = provide(self);
            let mut provided = self.inner.provided.borrow_mut();
            for (name, value) in entries {
                provided.insert(name, value);
            }
        }
    }

    // ---------------------------------------------------------------------
    // State access
    // ---------------------------------------------------------------------

    /// Resolve a name against the instance: data, then props, then
    /// computed, then methods, then injections. A computed read inside
    /// another watcher forwards its deps, so the outer watcher
    /// transitively tracks the computed's inputs. A declared method
    /// name reads as null without a warning (values cannot hold a
    /// closure; invoke it with [`Component::call`] instead). Unknown
    /// names warn and read as null.
    pub fn get(&self, name: &str) -> Value {
        if let Some(data) = self.data_record() {
            if data.contains_key(name) {
                return data.get(name);
            }
        }
        if self.inner.props.contains_key(name) {
            return self.inner.props.get(name);
        }
        let computed = self.inner.computed.borrow().get(name).cloned();
        if let Some(watcher) = computed {
            if watcher.is_dirty() {
                watcher.evaluate();
            }
            if has_active_watcher() {
                watcher.depend();
            }
            return watcher.value();
        }
        if self.inner.options.find_method(name).is_some() {
            return Value::Null;
        }
        if let Some(value) = self.inner.injected.borrow().get(name) {
            return value.clone();
        }
        dev_warn(&format!(
            "`{name}` was read during render but is not declared in data, \
             props, computed, methods or inject"
        ));
        Value::Null
    }

    /// Write a data entry. Prop writes are allowed but warn: the parent
    /// owns prop values and will clobber them on its next render.
    pub fn set_value(&self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        if let Some(data) = self.data_record() {
            if data.contains_key(name) {
                data.assign(name, value);
                return;
            }
        }
        if self.inner.props.contains_key(name) {
            dev_warn(&format!(
                "avoid mutating prop `{name}` directly; use a data entry \
                 or an emitted event instead"
            ));
            self.inner.props.assign(name, value);
            return;
        }
        dev_warn(&format!("cannot set undeclared state `{name}`"));
    }

    /// Invoke a declared method.
    pub fn call(&self, name: &str, args: &[Value]) -> Value {
        match self.inner.options.find_method(name) {
            Some(method) => method(self, args),
            None => {
                dev_warn(&format!("unknown method `{name}`"));
                Value::Null
            }
        }
    }

    pub fn data_record(&self) -> Option<Record> {
        self.inner.data.borrow().clone()
    }

    pub fn props_record(&self) -> Record {
        self.inner.props.clone()
    }

    pub fn ref_target(&self, name: &str) -> Option<RefTarget> {
        self.inner.refs.borrow().get(name).cloned()
    }

    pub(crate) fn slot_children(&self) -> Vec<VNode> {
        self.inner.slot_children.borrow().clone()
    }

    pub(crate) fn options(&self) -> &Rc<ComponentOptions> {
        &self.inner.options
    }

    // ---------------------------------------------------------------------
    // Tree links
    // ---------------------------------------------------------------------

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn downgrade(&self) -> WeakComponent {
        WeakComponent(Rc::downgrade(&self.inner))
    }

    pub fn parent(&self) -> Option<Component> {
        self.inner
            .parent
            .borrow()
            .upgrade()
            .map(|inner| Component { inner })
    }

    pub fn root(&self) -> Component {
        match self.parent() {
            Some(parent) => parent.root(),
            None => self.clone(),
        }
    }

    pub fn children(&self) -> Vec<Component> {
        self.inner.children.borrow().clone()
    }

    pub fn el(&self) -> Option<NodeId> {
        self.inner.el.get()
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.is_mounted.get()
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.is_destroyed.get()
    }

    pub fn is_inactive(&self) -> bool {
        self.inner.inactive.get()
    }

    // ---------------------------------------------------------------------
    // Mount / update / destroy
    // ---------------------------------------------------------------------

    /// Create the render watcher; its construction runs the first render
    /// and patches it against `el` (or mounts detached when `None`).
    pub fn mount(&self, el: Option<NodeId>, hydrating: bool) -> Option<NodeId> {
        if self.inner.render_watcher.borrow().is_some() {
            dev_warn("component is already mounted");
            return self.el();
        }
        self.inner.el.set(el);
        self.call_hook(LifecycleHook::BeforeMount);

        let weak = self.downgrade();
        let before: Box<dyn Fn()> = {
            let weak = weak.clone();
            Box::new(move || {
                if let Some(vm) = weak.upgrade() {
                    if vm.is_mounted() && !vm.is_destroyed() {
                        vm.call_hook(LifecycleHook::BeforeUpdate);
                    }
                }
            })
        };
        let after: Box<dyn Fn()> = {
            let weak = weak.clone();
            Box::new(move || {
                if let Some(vm) = weak.upgrade() {
                    if vm.is_mounted() && !vm.is_destroyed() {
                        vm.call_hook(LifecycleHook::Updated);
                    }
                }
            })
        };
        let first_hydrate = Cell::new(hydrating);
        let getter: vireo_core::Getter = Box::new(move || {
            let Some(vm) = weak.upgrade() else {
                return Ok(Value::Null);
            };
            let vnode = vm.render_vnode();
            vm.update_tree(vnode, first_hydrate.replace(false));
            Ok(Value::Null)
        });

        let watcher = Watcher::new(
            getter,
            None,
            WatcherOptions {
                before: Some(before),
                after: Some(after),
                ..Default::default()
            },
        );
        *self.inner.render_watcher.borrow_mut() = Some(watcher);

        if !self.inner.has_placeholder.get() {
            self.set_mounted();
        }
        self.el()
    }

    /// Run the render function, falling back to the previous tree when
    /// it fails so the view never goes blank.
    fn render_vnode(&self) -> VNode {
        let result = match &self.inner.options.render {
            Some(render) => {
                let scope = RenderScope::new(self);
                render(&scope)
            }
            None => Ok(VNode::empty()),
        };
        match result {
            Ok(vnode) => vnode,
            Err(err) => {
                handle_error(&err, "render function");
                self.inner
                    .tree
                    .borrow()
                    .clone()
                    .unwrap_or_else(VNode::empty)
            }
        }
    }

    /// Patch the freshly rendered tree against the previous one.
    fn update_tree(&self, vnode: VNode, hydrating: bool) {
        let mut vnode = vnode;
        let prev = self.inner.tree.borrow_mut().take();
        let target = match prev {
            Some(prev_tree) => PatchTarget::Tree(prev_tree),
            None => match self.inner.el.get() {
                Some(el) => PatchTarget::HostNode(el),
                None => PatchTarget::Empty,
            },
        };
        let new_el = self
            .inner
            .patcher
            .patch(&self.inner.dom, target, &mut vnode, hydrating);
        self.inner.el.set(new_el);
        self.collect_refs(&vnode);
        *self.inner.tree.borrow_mut() = Some(vnode);
    }

    fn collect_refs(&self, vnode: &VNode) {
        let mut refs = self.inner.refs.borrow_mut();
        refs.clear();
        fn walk(vnode: &VNode, refs: &mut FxHashMap<Rc<str>, RefTarget>) {
            if let Some(name) = vnode.data.as_ref().and_then(|d| d.ref_name.clone()) {
                let target = vnode
                    .component_instance
                    .as_ref()
                    .and_then(|i| i.downcast_ref::<Component>().cloned())
                    .map(RefTarget::Component)
                    .or(vnode.elm.map(RefTarget::Node));
                if let Some(target) = target {
                    refs.insert(name, target);
                }
            }
            for child in &vnode.children {
                walk(child, refs);
            }
        }
        walk(vnode, &mut refs);
    }

    /// Re-render regardless of what changed.
    pub fn force_update(&self) {
        if let Some(watcher) = self.inner.render_watcher.borrow().as_ref() {
            watcher.update();
        }
    }

    /// Run `cb` after the pending flush, once the host tree reflects
    /// every mutation made so far.
    pub fn next_tick(&self, cb: impl FnOnce() + 'static) {
        vireo_core::next_tick(cb);
    }

    pub(crate) fn set_mounted(&self) {
        if !self.inner.is_mounted.get() {
            self.inner.is_mounted.set(true);
            self.call_hook(LifecycleHook::Mounted);
        }
    }

    /// Tear the instance down: watchers, reactive roots, the rendered
    /// tree and its host nodes, and all event subscribers.
    pub fn destroy(&self) {
        if self.inner.is_being_destroyed.get() {
            return;
        }
        self.call_hook(LifecycleHook::BeforeDestroy);
        self.inner.is_being_destroyed.set(true);

        if let Some(parent) = self.parent() {
            if !parent.inner.is_being_destroyed.get() {
                parent
                    .inner
                    .children
                    .borrow_mut()
                    .retain(|c| c.inner.id != self.inner.id);
            }
        }

        if let Some(watcher) = self.inner.render_watcher.borrow_mut().take() {
            watcher.teardown();
        }
        for watcher in self.inner.watchers.borrow_mut().drain(..) {
            watcher.teardown();
        }
        for (_, watcher) in self.inner.computed.borrow_mut().drain() {
            watcher.teardown();
        }
        if let Some(data) = self.data_record() {
            if let Some(ob) = data.observer() {
                ob.release_as_root();
            }
        }

        self.inner.is_destroyed.set(true);
        if let Some(tree) = self.inner.tree.borrow_mut().take() {
            self.inner.patcher.teardown(&self.inner.dom, &tree);
        }
        self.call_hook(LifecycleHook::Destroyed);
        self.inner.bus.borrow_mut().off_all();
        self.inner.refs.borrow_mut().clear();
        self.inner.el.set(None);
        self.inner.children.borrow_mut().clear();
    }

    // ---------------------------------------------------------------------
    // Keep-alive plumbing
    // ---------------------------------------------------------------------

    pub fn deactivate(&self) {
        if !self.inner.inactive.replace(true) {
            for child in self.children() {
                child.deactivate();
            }
            self.call_hook(LifecycleHook::Deactivated);
        }
    }

    pub fn activate(&self) {
        if self.inner.inactive.replace(false) {
            for child in self.children() {
                child.activate();
            }
            self.call_hook(LifecycleHook::Activated);
        }
    }

    // ---------------------------------------------------------------------
    // Watching
    // ---------------------------------------------------------------------

    /// Watch a dotted path rooted at this instance. The first segment
    /// resolves like any render read (data, props, computed), the rest
    /// walk records. Returns a handle that can stop the watcher.
    pub fn watch(
        &self,
        path: &str,
        handler: impl Fn(&Component, &Value, &Value) -> Result<(), RuntimeError> + 'static,
        options: WatchOptions,
    ) -> WatchHandle {
        let weak = self.downgrade();
        let getter: vireo_core::Getter = match parse_path(path) {
            Some(segments) => {
                let weak = weak.clone();
                Box::new(move || {
                    let Some(vm) = weak.upgrade() else {
                        return Ok(Value::Null);
                    };
                    let mut current = vm.get(&segments[0]);
                    for segment in &segments[1..] {
                        match &current {
                            Value::Record(record) => current = record.get(segment),
                            _ => return Ok(Value::Null),
                        }
                    }
                    Ok(current)
                })
            }
            None => {
                dev_warn(&format!(
                    "watch path `{path}` is not a dotted identifier chain"
                ));
                vireo_core::noop_getter()
            }
        };
        self.watch_with_getter(getter, handler, options)
    }

    /// Watch an arbitrary getter over the instance.
    pub fn watch_getter(
        &self,
        getter: impl Fn(&Component) -> Result<Value, RuntimeError> + 'static,
        handler: impl Fn(&Component, &Value, &Value) -> Result<(), RuntimeError> + 'static,
        options: WatchOptions,
    ) -> WatchHandle {
        let weak = self.downgrade();
        let boxed: vireo_core::Getter = Box::new(move || match weak.upgrade() {
            Some(vm) => getter(&vm),
            None => Ok(Value::Null),
        });
        self.watch_with_getter(boxed, handler, options)
    }

    fn watch_with_getter(
        &self,
        getter: vireo_core::Getter,
        handler: impl Fn(&Component, &Value, &Value) -> Result<(), RuntimeError> + 'static,
        options: WatchOptions,
    ) -> WatchHandle {
        let weak = self.downgrade();
        let handler = Rc::new(handler);
        let cb: vireo_core::WatchCallback = {
            let weak = weak.clone();
            let handler = handler.clone();
            Box::new(move |new: &Value, old: &Value| match weak.upgrade() {
                Some(vm) => handler(&vm, new, old),
                None => Ok(()),
            })
        };
        let watcher = Watcher::new(
            getter,
            Some(cb),
            WatcherOptions {
                deep: options.deep,
                user: true,
                sync: options.sync,
                ..Default::default()
            },
        );
        self.inner.watchers.borrow_mut().push(watcher.clone());
        if options.immediate {
            if let Err(err) = handler(self, &watcher.value(), &Value::Null) {
                handle_error(&err, "immediate watcher callback");
            }
        }
        WatchHandle {
            vm: weak,
            watcher,
        }
    }

    // ---------------------------------------------------------------------
    // Events
    // ---------------------------------------------------------------------

    pub fn on(&self, event: impl Into<Rc<str>>, handler: impl Fn(&Value) + 'static) {
        self.inner.bus.borrow_mut().on(event, Rc::new(handler));
    }

    pub fn once(&self, event: impl Into<Rc<str>>, handler: impl Fn(&Value) + 'static) {
        self.inner.bus.borrow_mut().once(event, Rc::new(handler));
    }

    pub fn off(&self, event: &str) {
        self.inner.bus.borrow_mut().off_event(event);
    }

    pub fn emit(&self, event: &str, payload: &Value) {
        let handlers = self.inner.bus.borrow_mut().take_handlers(event);
        for handler in handlers {
            handler(payload);
        }
    }

    /// Swap the listeners the parent bound on this instance's
    /// placeholder, leaving `$on` subscribers untouched.
    pub(crate) fn replace_placeholder_listeners(
        &self,
        listeners: Vec<(Rc<str>, BusHandler)>,
    ) {
        let mut bus = self.inner.bus.borrow_mut();
        for (event, handler) in self.inner.placeholder_listeners.borrow().iter() {
            bus.off_handler(event, handler);
        }
        for (event, handler) in &listeners {
            bus.on(event.clone(), handler.clone());
        }
        *self.inner.placeholder_listeners.borrow_mut() = listeners;
    }

    // ---------------------------------------------------------------------
    // Parent-driven updates
    // ---------------------------------------------------------------------

    /// Push re-rendered placeholder bindings into this instance: new
    /// prop values (their deps schedule the render watcher), fresh
    /// listeners, and new slot content.
    pub(crate) fn update_from_parent(
        &self,
        props: &[(Rc<str>, Value)],
        listeners: Vec<(Rc<str>, BusHandler)>,
        slot_children: Vec<VNode>,
    ) {
        without_observation(|| {
            for (name, value) in props {
                if self.inner.props.contains_key(name) {
                    self.inner.props.assign(name, value.clone());
                }
            }
        });
        self.replace_placeholder_listeners(listeners);
        let had_slots = !self.inner.slot_children.borrow().is_empty();
        let has_slots = !slot_children.is_empty();
        *self.inner.slot_children.borrow_mut() = slot_children;
        if had_slots || has_slots {
            self.force_update();
        }
    }

    // ---------------------------------------------------------------------
    // Hooks
    // ---------------------------------------------------------------------

    pub fn call_hook(&self, at: LifecycleHook) {
        let hooks = self.inner.options.hooks.get(&at).cloned().unwrap_or_default();
        for hook in hooks {
            if let Err(err) = hook(self) {
                handle_error(&err, at.as_str());
            }
        }
    }

    /// Resolve a provided value visible to this instance's descendants.
    pub fn provided(&self, name: &str) -> Option<Value> {
        self.inner.provided.borrow().get(name).cloned()
    }
}
