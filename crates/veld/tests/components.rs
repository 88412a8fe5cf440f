//! Component lifecycle, state batching and the external handle.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use veld::{
    Component, ComponentHandle, Context, Error, FnComponent, FnHooks, Options, Props, Ref,
    Result, Runtime, State, Updater, VNode, Value, component_type,
};
use veld_dom::NodeId;

type HandleSlot = Rc<RefCell<Option<ComponentHandle>>>;

fn capture_handle() -> (HandleSlot, Ref) {
    let slot: HandleSlot = Rc::new(RefCell::new(None));
    let writer = slot.clone();
    let r = Ref::Instance(Rc::new(move |h| *writer.borrow_mut() = h));
    (slot, r)
}

fn int(state: &State, name: &str) -> i64 {
    state.get(name).and_then(Value::as_int).unwrap_or(0)
}

fn str_prop<'a>(props: &'a Props, name: &'a str) -> &'a str {
    props.get(name).and_then(Value::as_str).unwrap_or("-")
}

struct Counter {
    renders: Rc<Cell<usize>>,
}

impl Component for Counter {
    fn initial_state(&mut self, _props: &Props) -> State {
        State::new().set("count", 0i64)
    }

    fn render(&mut self, _props: &Props, state: &State, _cx: &Context) -> Result<Option<VNode>> {
        self.renders.set(self.renders.get() + 1);
        let count = int(state, "count");
        Ok(Some(
            VNode::element("span").child(count.to_string()).build()?,
        ))
    }
}

#[test]
fn test_mounts_with_initial_state() {
    let rt = Runtime::new();
    let container = rt.create_container("div").unwrap();
    let renders = Rc::new(Cell::new(0));
    let r = renders.clone();
    let ty = component_type(move |_: &Props, _: &Context| Counter { renders: r.clone() });
    rt.render(Some(VNode::component(&ty).build().unwrap()), container)
        .unwrap();
    assert_eq!(rt.container_html(container), "<span>0</span>");
    assert_eq!(renders.get(), 1);
}

#[test]
fn test_handle_set_state_rerenders() {
    let rt = Runtime::new();
    let container = rt.create_container("div").unwrap();
    let renders = Rc::new(Cell::new(0));
    let r = renders.clone();
    let ty = component_type(move |_: &Props, _: &Context| Counter { renders: r.clone() });
    let (slot, instance_ref) = capture_handle();
    rt.render(
        Some(VNode::component(&ty).node_ref(instance_ref).build().unwrap()),
        container,
    )
    .unwrap();
    let handle = slot.borrow().clone().unwrap();
    assert!(handle.is_mounted());

    handle.set_state(State::new().set("count", 3i64)).unwrap();
    assert_eq!(rt.container_html(container), "<span>3</span>");
    assert_eq!(renders.get(), 2);
    assert_eq!(int(&handle.state().unwrap(), "count"), 3);
}

#[test]
fn test_set_state_with_callback_runs_after_flush() {
    let rt = Runtime::new();
    let container = rt.create_container("div").unwrap();
    let renders = Rc::new(Cell::new(0));
    let r = renders.clone();
    let ty = component_type(move |_: &Props, _: &Context| Counter { renders: r.clone() });
    let (slot, instance_ref) = capture_handle();
    rt.render(
        Some(VNode::component(&ty).node_ref(instance_ref).build().unwrap()),
        container,
    )
    .unwrap();
    let handle = slot.borrow().clone().unwrap();

    let called = Rc::new(Cell::new(false));
    let flag = called.clone();
    handle
        .set_state_with(State::new().set("count", 9i64), move || flag.set(true))
        .unwrap();
    assert!(called.get());
    assert_eq!(rt.container_html(container), "<span>9</span>");
}

struct Clicker {
    handle: HandleSlot,
    renders: Rc<Cell<usize>>,
}

impl Component for Clicker {
    fn initial_state(&mut self, _props: &Props) -> State {
        State::new().set("n", 0i64).set("m", 0i64)
    }

    fn render(&mut self, _props: &Props, state: &State, _cx: &Context) -> Result<Option<VNode>> {
        self.renders.set(self.renders.get() + 1);
        let label = format!("{}:{}", int(state, "n"), int(state, "m"));
        let handle = self.handle.clone();
        Ok(Some(
            VNode::element("button")
                .on("click", move || {
                    let h = handle.borrow().clone().unwrap();
                    h.set_state(State::new().set("n", 1i64)).unwrap();
                    h.set_state(State::new().set("m", 2i64)).unwrap();
                })
                .child(label)
                .build()?,
        ))
    }
}

#[test]
fn test_set_state_batches_inside_event_handler() {
    let rt = Runtime::new();
    let container = rt.create_container("div").unwrap();
    let renders = Rc::new(Cell::new(0));
    let (slot, instance_ref) = capture_handle();
    let r = renders.clone();
    let s = slot.clone();
    let ty = component_type(move |_: &Props, _: &Context| Clicker {
        handle: s.clone(),
        renders: r.clone(),
    });
    rt.render(
        Some(VNode::component(&ty).node_ref(instance_ref).build().unwrap()),
        container,
    )
    .unwrap();
    assert_eq!(renders.get(), 1);

    let button = rt.document().first_child(container).unwrap();
    assert!(rt.dispatch_event(button, "click").unwrap());
    assert_eq!(renders.get(), 2, "two writes in one handler flush as one render");
    assert_eq!(rt.container_html(container), "<button>1:2</button>");
}

struct Gated {
    allow: Rc<Cell<bool>>,
    renders: Rc<Cell<usize>>,
}

impl Component for Gated {
    fn render(&mut self, props: &Props, _state: &State, _cx: &Context) -> Result<Option<VNode>> {
        self.renders.set(self.renders.get() + 1);
        Ok(Some(
            VNode::element("span").child(str_prop(props, "label")).build()?,
        ))
    }

    fn should_component_update(
        &mut self,
        _next_props: &Props,
        _next_state: &State,
        _next_context: &Context,
    ) -> bool {
        self.allow.get()
    }
}

#[test]
fn test_should_component_update_skips_render_but_commits() {
    let rt = Runtime::new();
    let container = rt.create_container("div").unwrap();
    let allow = Rc::new(Cell::new(true));
    let renders = Rc::new(Cell::new(0));
    let (a, r) = (allow.clone(), renders.clone());
    let ty = component_type(move |_: &Props, _: &Context| Gated {
        allow: a.clone(),
        renders: r.clone(),
    });
    let view = |label: &str| {
        VNode::component(&ty).prop("label", label).build().unwrap()
    };

    rt.render(Some(view("a")), container).unwrap();
    assert_eq!(rt.container_html(container), "<span>a</span>");

    allow.set(false);
    rt.render(Some(view("b")), container).unwrap();
    assert_eq!(rt.container_html(container), "<span>a</span>");
    assert_eq!(renders.get(), 1);

    // The skipped props were still committed; allowing updates again
    // renders from the latest values.
    allow.set(true);
    rt.render(Some(view("c")), container).unwrap();
    assert_eq!(rt.container_html(container), "<span>c</span>");
    assert_eq!(renders.get(), 2);
}

#[test]
fn test_force_update_bypasses_gate() {
    let rt = Runtime::new();
    let container = rt.create_container("div").unwrap();
    let allow = Rc::new(Cell::new(false));
    let renders = Rc::new(Cell::new(0));
    let (slot, instance_ref) = capture_handle();
    let (a, r) = (allow.clone(), renders.clone());
    let ty = component_type(move |_: &Props, _: &Context| Gated {
        allow: a.clone(),
        renders: r.clone(),
    });
    rt.render(
        Some(
            VNode::component(&ty)
                .prop("label", "a")
                .node_ref(instance_ref)
                .build()
                .unwrap(),
        ),
        container,
    )
    .unwrap();

    rt.render(
        Some(VNode::component(&ty).prop("label", "b").build().unwrap()),
        container,
    )
    .unwrap();
    assert_eq!(rt.container_html(container), "<span>a</span>");

    let handle = slot.borrow().clone().unwrap();
    handle.force_update().unwrap();
    assert_eq!(rt.container_html(container), "<span>b</span>");
    assert_eq!(renders.get(), 2);
}

struct Lifecycle {
    log: Rc<RefCell<Vec<String>>>,
}

impl Lifecycle {
    fn push(&self, entry: &str) {
        self.log.borrow_mut().push(entry.to_string());
    }
}

impl Component for Lifecycle {
    fn render(&mut self, _props: &Props, _state: &State, _cx: &Context) -> Result<Option<VNode>> {
        self.push("render");
        Ok(Some(VNode::element("div").build()?))
    }

    fn component_will_mount(&mut self, _cx: &mut Updater<'_>) -> Result<()> {
        self.push("will_mount");
        Ok(())
    }

    fn component_did_mount(&mut self, dom: Option<NodeId>, _cx: &mut Updater<'_>) {
        self.push(&format!("did_mount attached={}", dom.is_some()));
    }

    fn component_will_unmount(&mut self) {
        self.push("will_unmount");
    }
}

#[test]
fn test_mount_lifecycle_order() {
    let rt = Runtime::new();
    let container = rt.create_container("div").unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));
    let l = log.clone();
    let ty = component_type(move |_: &Props, _: &Context| Lifecycle { log: l.clone() });
    rt.render(Some(VNode::component(&ty).build().unwrap()), container)
        .unwrap();
    assert_eq!(
        *log.borrow(),
        vec!["will_mount", "render", "did_mount attached=true"]
    );

    rt.render(None, container).unwrap();
    assert_eq!(log.borrow().last().unwrap(), "will_unmount");
}

#[test]
fn test_instance_ref_cleared_on_unmount() {
    let rt = Runtime::new();
    let container = rt.create_container("div").unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));
    let l = log.clone();
    let ty = component_type(move |_: &Props, _: &Context| Lifecycle { log: l.clone() });
    let (slot, instance_ref) = capture_handle();
    rt.render(
        Some(VNode::component(&ty).node_ref(instance_ref).build().unwrap()),
        container,
    )
    .unwrap();
    let handle = slot.borrow().clone().unwrap();
    assert!(handle.is_mounted());

    rt.render(None, container).unwrap();
    assert!(slot.borrow().is_none(), "ref fires with None on unmount");
    assert!(!handle.is_mounted());
    // Writes to a dead handle are silently dropped.
    handle.set_state(State::new().set("count", 1i64)).unwrap();
}

struct EagerState;

impl Component for EagerState {
    fn render(&mut self, _props: &Props, state: &State, _cx: &Context) -> Result<Option<VNode>> {
        Ok(Some(
            VNode::element("span")
                .child(int(state, "count").to_string())
                .build()?,
        ))
    }

    fn component_will_mount(&mut self, cx: &mut Updater<'_>) -> Result<()> {
        cx.set_state(State::new().set("count", 7i64))
    }
}

#[test]
fn test_will_mount_state_folds_into_first_render() {
    let rt = Runtime::new();
    let container = rt.create_container("div").unwrap();
    let ty = component_type(|_: &Props, _: &Context| EagerState);
    rt.render(Some(VNode::component(&ty).build().unwrap()), container)
        .unwrap();
    assert_eq!(rt.container_html(container), "<span>7</span>");
}

struct MountWriter {
    renders: Rc<Cell<usize>>,
}

impl Component for MountWriter {
    fn render(&mut self, _props: &Props, state: &State, _cx: &Context) -> Result<Option<VNode>> {
        self.renders.set(self.renders.get() + 1);
        Ok(Some(
            VNode::element("span")
                .child(int(state, "count").to_string())
                .build()?,
        ))
    }

    fn component_did_mount(&mut self, _dom: Option<NodeId>, cx: &mut Updater<'_>) {
        cx.set_state(State::new().set("count", 5i64)).unwrap();
    }
}

#[test]
fn test_did_mount_set_state_flushes_in_same_pass() {
    let rt = Runtime::new();
    let container = rt.create_container("div").unwrap();
    let renders = Rc::new(Cell::new(0));
    let r = renders.clone();
    let ty = component_type(move |_: &Props, _: &Context| MountWriter { renders: r.clone() });
    rt.render(Some(VNode::component(&ty).build().unwrap()), container)
        .unwrap();
    assert_eq!(rt.container_html(container), "<span>5</span>");
    assert_eq!(renders.get(), 2);
}

struct Derive;

impl Component for Derive {
    fn render(&mut self, _props: &Props, state: &State, _cx: &Context) -> Result<Option<VNode>> {
        Ok(Some(
            VNode::element("span")
                .child(state.get("derived").and_then(Value::as_str).unwrap_or("-"))
                .build()?,
        ))
    }

    fn component_will_receive_props(
        &mut self,
        next_props: &Props,
        _next_context: &Context,
        cx: &mut Updater<'_>,
    ) -> Result<()> {
        if next_props.contains("boom") {
            return Err(Error::hook("refused"));
        }
        let label = str_prop(next_props, "label").to_string();
        cx.set_state(State::new().set("derived", label))
    }
}

#[test]
fn test_will_receive_props_state_visible_in_same_render() {
    let rt = Runtime::new();
    let container = rt.create_container("div").unwrap();
    let ty = component_type(|_: &Props, _: &Context| Derive);
    rt.render(
        Some(VNode::component(&ty).prop("label", "a").build().unwrap()),
        container,
    )
    .unwrap();
    // The hook does not run for the mount.
    assert_eq!(rt.container_html(container), "<span>-</span>");

    rt.render(
        Some(VNode::component(&ty).prop("label", "b").build().unwrap()),
        container,
    )
    .unwrap();
    assert_eq!(rt.container_html(container), "<span>b</span>");
}

#[test]
fn test_will_receive_props_error_aborts_pass() {
    let rt = Runtime::new();
    let container = rt.create_container("div").unwrap();
    let ty = component_type(|_: &Props, _: &Context| Derive);
    rt.render(
        Some(VNode::component(&ty).prop("label", "a").build().unwrap()),
        container,
    )
    .unwrap();

    let result = rt.render(
        Some(
            VNode::component(&ty)
                .prop("label", "b")
                .prop("boom", true)
                .build()
                .unwrap(),
        ),
        container,
    );
    assert!(matches!(result, Err(Error::Hook(_))));
    assert_eq!(rt.container_html(container), "<span>-</span>", "host untouched");
}

struct Toggle;

impl Component for Toggle {
    fn initial_state(&mut self, _props: &Props) -> State {
        State::new().set("show", true)
    }

    fn render(&mut self, _props: &Props, state: &State, _cx: &Context) -> Result<Option<VNode>> {
        if state.get("show").is_some_and(|v| *v == Value::Bool(true)) {
            Ok(Some(VNode::element("span").child("on").build()?))
        } else {
            Ok(None)
        }
    }
}

#[test]
fn test_render_none_tears_down_and_remounts() {
    let rt = Runtime::new();
    let container = rt.create_container("div").unwrap();
    let ty = component_type(|_: &Props, _: &Context| Toggle);
    let (slot, instance_ref) = capture_handle();
    rt.render(
        Some(VNode::component(&ty).node_ref(instance_ref).build().unwrap()),
        container,
    )
    .unwrap();
    assert_eq!(rt.container_html(container), "<span>on</span>");
    let handle = slot.borrow().clone().unwrap();

    handle.set_state(State::new().set("show", false)).unwrap();
    assert_eq!(rt.container_html(container), "");
    assert_eq!(rt.document().child_count(container), 0);

    handle.set_state(State::new().set("show", true)).unwrap();
    assert_eq!(rt.container_html(container), "<span>on</span>");
}

struct Provider {
    child: FnComponent,
}

impl Component for Provider {
    fn render(&mut self, _props: &Props, _state: &State, _cx: &Context) -> Result<Option<VNode>> {
        Ok(Some(
            VNode::element("div")
                .child(VNode::component_fn(&self.child).build()?)
                .build()?,
        ))
    }

    fn get_child_context(
        &mut self,
        _props: &Props,
        _state: &State,
        _context: &Context,
    ) -> Option<Props> {
        Some(Props::new().set("theme", "dark"))
    }
}

#[test]
fn test_child_context_reaches_descendants() {
    let rt = Runtime::new();
    let container = rt.create_container("div").unwrap();
    let show_theme = FnComponent::new(|_props, cx| {
        Ok(Some(
            VNode::element("em")
                .child(cx.get("theme").and_then(Value::as_str).unwrap_or("none"))
                .build()?,
        ))
    });
    let ty = component_type(move |_: &Props, _: &Context| Provider {
        child: show_theme.clone(),
    });
    rt.render(Some(VNode::component(&ty).build().unwrap()), container)
        .unwrap();
    assert_eq!(rt.container_html(container), "<div><em>dark</em></div>");
}

#[test]
fn test_fn_component_renders_and_patches() {
    let rt = Runtime::new();
    let container = rt.create_container("div").unwrap();
    let comp = FnComponent::new(|props, _cx| {
        Ok(Some(
            VNode::element("span").child(str_prop(props, "label")).build()?,
        ))
    });
    let view = |label: &str| {
        VNode::component_fn(&comp)
            .prop("label", label)
            .build()
            .unwrap()
    };
    rt.render(Some(view("x")), container).unwrap();
    assert_eq!(rt.container_html(container), "<span>x</span>");
    rt.render(Some(view("y")), container).unwrap();
    assert_eq!(rt.container_html(container), "<span>y</span>");
}

#[test]
fn test_fn_component_hooks() {
    let rt = Runtime::new();
    let container = rt.create_container("div").unwrap();
    let allow = Rc::new(Cell::new(false));
    let log: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let mounted = Rc::new(Cell::new(None));

    let gate = allow.clone();
    let updates = log.clone();
    let dom_slot = mounted.clone();
    let hooks = Rc::new(FnHooks {
        on_did_mount: Some(Box::new(move |dom| dom_slot.set(dom))),
        on_should_update: Some(Box::new(move |_last, _next| gate.get())),
        on_did_update: Some(Box::new(move |last, next| {
            updates.borrow_mut().push(format!(
                "{}->{}",
                str_prop(last, "label"),
                str_prop(next, "label")
            ));
        })),
        ..FnHooks::default()
    });
    let comp = FnComponent::new(|props, _cx| {
        Ok(Some(
            VNode::element("span").child(str_prop(props, "label")).build()?,
        ))
    });
    let view = |label: &str| {
        VNode::component_fn(&comp)
            .prop("label", label)
            .node_ref(Ref::Hooks(hooks.clone()))
            .build()
            .unwrap()
    };

    rt.render(Some(view("a")), container).unwrap();
    assert_eq!(mounted.get(), rt.document().first_child(container));

    rt.render(Some(view("b")), container).unwrap();
    assert_eq!(rt.container_html(container), "<span>a</span>", "gate blocks");
    assert!(log.borrow().is_empty());

    allow.set(true);
    rt.render(Some(view("c")), container).unwrap();
    assert_eq!(rt.container_html(container), "<span>c</span>");
    assert_eq!(*log.borrow(), vec!["b->c"]);
}

struct Inner {
    log: Rc<RefCell<Vec<String>>>,
}

impl Component for Inner {
    fn render(&mut self, _props: &Props, _state: &State, _cx: &Context) -> Result<Option<VNode>> {
        Ok(Some(VNode::element("i").build()?))
    }

    fn component_did_mount(&mut self, _dom: Option<NodeId>, _cx: &mut Updater<'_>) {
        self.log.borrow_mut().push("inner".into());
    }
}

struct Outer {
    log: Rc<RefCell<Vec<String>>>,
}

impl Component for Outer {
    fn render(&mut self, _props: &Props, _state: &State, _cx: &Context) -> Result<Option<VNode>> {
        let l = self.log.clone();
        let ty = component_type(move |_: &Props, _: &Context| Inner { log: l.clone() });
        Ok(Some(
            VNode::element("div")
                .child(VNode::component(&ty).build()?)
                .build()?,
        ))
    }

    fn component_did_mount(&mut self, _dom: Option<NodeId>, _cx: &mut Updater<'_>) {
        self.log.borrow_mut().push("outer".into());
    }
}

#[test]
fn test_nested_did_mount_is_bottom_up() {
    let rt = Runtime::new();
    let container = rt.create_container("div").unwrap();
    let log: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let l = log.clone();
    let ty = component_type(move |_: &Props, _: &Context| Outer { log: l.clone() });
    rt.render(Some(VNode::component(&ty).build().unwrap()), container)
        .unwrap();
    assert_eq!(*log.borrow(), vec!["inner", "outer"]);
}

#[test]
fn test_component_type_change_replaces() {
    let rt = Runtime::new();
    let container = rt.create_container("div").unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));
    let l = log.clone();
    let lifecycle = component_type(move |_: &Props, _: &Context| Lifecycle { log: l.clone() });
    let toggle = component_type(|_: &Props, _: &Context| Toggle);

    rt.render(Some(VNode::component(&lifecycle).build().unwrap()), container)
        .unwrap();
    rt.render(Some(VNode::component(&toggle).build().unwrap()), container)
        .unwrap();
    assert_eq!(log.borrow().last().unwrap(), "will_unmount");
    assert_eq!(rt.container_html(container), "<span>on</span>");
}

#[test]
fn test_find_dom_node() {
    let rt = Runtime::with_options(Options {
        find_dom_node_enabled: true,
        ..Options::default()
    });
    let container = rt.create_container("div").unwrap();
    let ty = component_type(|_: &Props, _: &Context| Toggle);
    let (slot, instance_ref) = capture_handle();
    rt.render(
        Some(VNode::component(&ty).node_ref(instance_ref).build().unwrap()),
        container,
    )
    .unwrap();
    let handle = slot.borrow().clone().unwrap();
    assert_eq!(rt.find_dom_node(&handle), rt.document().first_child(container));

    handle.set_state(State::new().set("show", false)).unwrap();
    assert_eq!(rt.find_dom_node(&handle), None);
}

#[test]
fn test_find_dom_node_disabled_by_default() {
    let rt = Runtime::new();
    let container = rt.create_container("div").unwrap();
    let ty = component_type(|_: &Props, _: &Context| Toggle);
    let (slot, instance_ref) = capture_handle();
    rt.render(
        Some(VNode::component(&ty).node_ref(instance_ref).build().unwrap()),
        container,
    )
    .unwrap();
    let handle = slot.borrow().clone().unwrap();
    assert_eq!(rt.find_dom_node(&handle), None);
}

struct Defaulted;

impl Component for Defaulted {
    fn render(&mut self, props: &Props, _state: &State, _cx: &Context) -> Result<Option<VNode>> {
        Ok(Some(
            VNode::element("span").child(str_prop(props, "label")).build()?,
        ))
    }

    fn default_props() -> Option<Props> {
        Some(Props::new().set("label", "fallback"))
    }
}

#[test]
fn test_default_props_fill_missing_entries() {
    let rt = Runtime::new();
    let container = rt.create_container("div").unwrap();
    let ty = component_type(|_: &Props, _: &Context| Defaulted);
    rt.render(Some(VNode::component(&ty).build().unwrap()), container)
        .unwrap();
    assert_eq!(rt.container_html(container), "<span>fallback</span>");

    rt.render(
        Some(VNode::component(&ty).prop("label", "given").build().unwrap()),
        container,
    )
    .unwrap();
    assert_eq!(rt.container_html(container), "<span>given</span>");
}

struct History {
    log: Rc<RefCell<Vec<String>>>,
}

impl Component for History {
    fn initial_state(&mut self, _props: &Props) -> State {
        State::new().set("count", 0i64)
    }

    fn render(&mut self, _props: &Props, state: &State, _cx: &Context) -> Result<Option<VNode>> {
        Ok(Some(
            VNode::element("span")
                .child(int(state, "count").to_string())
                .build()?,
        ))
    }

    fn component_did_update(
        &mut self,
        _prev_props: &Props,
        prev_state: &State,
        cx: &mut Updater<'_>,
    ) {
        self.log.borrow_mut().push(format!(
            "{}->{}",
            int(prev_state, "count"),
            int(cx.state(), "count")
        ));
    }
}

#[test]
fn test_did_update_sees_previous_state() {
    let rt = Runtime::new();
    let container = rt.create_container("div").unwrap();
    let log: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let l = log.clone();
    let ty = component_type(move |_: &Props, _: &Context| History { log: l.clone() });
    let (slot, instance_ref) = capture_handle();
    rt.render(
        Some(VNode::component(&ty).node_ref(instance_ref).build().unwrap()),
        container,
    )
    .unwrap();
    let handle = slot.borrow().clone().unwrap();
    handle.set_state(State::new().set("count", 1i64)).unwrap();
    handle.set_state(State::new().set("count", 2i64)).unwrap();
    assert_eq!(*log.borrow(), vec!["0->1", "1->2"]);
}

#[test]
fn test_after_mount_and_before_unmount_hooks() {
    let mounts = Rc::new(Cell::new(0));
    let unmounts = Rc::new(Cell::new(0));
    let (m, u) = (mounts.clone(), unmounts.clone());
    let rt = Runtime::with_options(Options {
        after_mount: Some(Rc::new(move |_| m.set(m.get() + 1))),
        before_unmount: Some(Rc::new(move |_| u.set(u.get() + 1))),
        ..Options::default()
    });
    let container = rt.create_container("div").unwrap();
    let ty = component_type(|_: &Props, _: &Context| Toggle);
    rt.render(Some(VNode::component(&ty).build().unwrap()), container)
        .unwrap();
    assert_eq!((mounts.get(), unmounts.get()), (1, 0));
    rt.render(None, container).unwrap();
    assert_eq!((mounts.get(), unmounts.get()), (1, 1));
}

struct Refresher {
    handle: HandleSlot,
    renders: Rc<Cell<usize>>,
}

impl Component for Refresher {
    fn initial_state(&mut self, _props: &Props) -> State {
        State::new().set("n", 0i64)
    }

    fn render(&mut self, _props: &Props, state: &State, _cx: &Context) -> Result<Option<VNode>> {
        self.renders.set(self.renders.get() + 1);
        Ok(Some(
            VNode::element("span").child(int(state, "n").to_string()).build()?,
        ))
    }

    fn component_did_update(&mut self, _pp: &Props, _ps: &State, _cx: &mut Updater<'_>) {
        if let Some(handle) = self.handle.borrow().clone() {
            handle.force_update().unwrap();
        }
    }
}

#[test]
fn test_force_update_during_did_update_is_a_no_op() {
    let rt = Runtime::new();
    let container = rt.create_container("div").unwrap();
    let renders = Rc::new(Cell::new(0));
    let (slot, instance_ref) = capture_handle();
    let (s, r) = (slot.clone(), renders.clone());
    let ty = component_type(move |_: &Props, _: &Context| Refresher {
        handle: s.clone(),
        renders: r.clone(),
    });
    rt.render(
        Some(VNode::component(&ty).node_ref(instance_ref).build().unwrap()),
        container,
    )
    .unwrap();
    let handle = slot.borrow().clone().unwrap();

    // did_update fires mid-update and forces again; the forced update
    // must collapse into the one in flight instead of recursing.
    handle.set_state(State::new().set("n", 1i64)).unwrap();
    assert_eq!(renders.get(), 2);
    assert_eq!(rt.container_html(container), "<span>1</span>");
}

struct MountPoker {
    handle: HandleSlot,
    renders: Rc<Cell<usize>>,
}

impl Component for MountPoker {
    fn initial_state(&mut self, _props: &Props) -> State {
        State::new().set("n", 0i64)
    }

    fn render(&mut self, _props: &Props, state: &State, _cx: &Context) -> Result<Option<VNode>> {
        self.renders.set(self.renders.get() + 1);
        Ok(Some(
            VNode::element("span").child(int(state, "n").to_string()).build()?,
        ))
    }

    fn component_did_mount(&mut self, _dom: Option<NodeId>, _cx: &mut Updater<'_>) {
        if let Some(handle) = self.handle.borrow().clone() {
            handle.set_state(State::new().set("n", 5i64)).unwrap();
        }
    }
}

#[test]
fn test_handle_set_state_during_did_mount_applies_after_the_pass() {
    let rt = Runtime::new();
    let container = rt.create_container("div").unwrap();
    let renders = Rc::new(Cell::new(0));
    let (slot, instance_ref) = capture_handle();
    let (s, r) = (slot.clone(), renders.clone());
    let ty = component_type(move |_: &Props, _: &Context| MountPoker {
        handle: s.clone(),
        renders: r.clone(),
    });
    rt.render(
        Some(VNode::component(&ty).node_ref(instance_ref).build().unwrap()),
        container,
    )
    .unwrap();
    assert_eq!(rt.container_html(container), "<span>5</span>");
    assert_eq!(renders.get(), 2);
}

struct Accumulator {
    renders: Rc<Cell<usize>>,
    seen: Rc<RefCell<Vec<i64>>>,
}

impl Component for Accumulator {
    fn initial_state(&mut self, _props: &Props) -> State {
        State::new().set("a", 0i64).set("b", 0i64)
    }

    fn render(&mut self, _props: &Props, state: &State, _cx: &Context) -> Result<Option<VNode>> {
        self.renders.set(self.renders.get() + 1);
        Ok(Some(
            VNode::element("span")
                .child(format!("{}:{}", int(state, "a"), int(state, "b")))
                .build()?,
        ))
    }

    fn component_did_mount(&mut self, _dom: Option<NodeId>, cx: &mut Updater<'_>) {
        cx.set_state(State::new().set("a", 1i64)).unwrap();
        self.seen.borrow_mut().push(int(cx.state(), "a"));
        cx.set_state(State::new().set("b", 2i64)).unwrap();
        self.seen.borrow_mut().push(int(cx.state(), "b"));
    }
}

#[test]
fn test_state_writes_accumulate_until_flush() {
    let rt = Runtime::new();
    let container = rt.create_container("div").unwrap();
    let renders = Rc::new(Cell::new(0));
    let seen: Rc<RefCell<Vec<i64>>> = Rc::new(RefCell::new(Vec::new()));
    let (r, v) = (renders.clone(), seen.clone());
    let ty = component_type(move |_: &Props, _: &Context| Accumulator {
        renders: r.clone(),
        seen: v.clone(),
    });
    rt.render(Some(VNode::component(&ty).build().unwrap()), container)
        .unwrap();
    // Committed state stays untouched between the two writes; both
    // land together in one re-render.
    assert_eq!(*seen.borrow(), vec![0, 0]);
    assert_eq!(rt.container_html(container), "<span>1:2</span>");
    assert_eq!(renders.get(), 2);
}
